#![allow(dead_code)]

use candle_viewer_wasm::application::{FetchOutcome, FetchTask, InfiniteCandleSource};
use candle_viewer_wasm::config::SourceConfig;
use candle_viewer_wasm::domain::errors::{AppError, AppResult};
use candle_viewer_wasm::domain::events::SourceEvent;
use candle_viewer_wasm::domain::market_data::{
    Candle, CandlePage, InstrumentKey, MarketType, OHLCV, PageFetcher, PageRequest, Price, Timestamp, Volume,
};
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

pub fn bar(ts: i64) -> Candle {
    let base = 100.0 + ts as f64 / 1000.0;
    Candle::new(
        Timestamp::from_millis(ts),
        OHLCV::new(
            Price::from(base),
            Price::from(base + 2.0),
            Price::from(base - 2.0),
            Price::from(base + 1.0),
            Volume::from(10.0),
        ),
    )
}

pub fn page(ts: &[i64]) -> CandlePage {
    CandlePage::from_candles(ts.iter().copied().map(bar).collect())
}

pub fn timestamps(candles: &[Candle]) -> Vec<i64> {
    candles.iter().map(|c| c.timestamp.value()).collect()
}

pub fn key(symbol: &str) -> InstrumentKey {
    InstrumentKey::new("binance", MarketType::Spot, symbol, "1h")
}

#[derive(Default)]
struct Script {
    requests: Vec<PageRequest>,
    pending: VecDeque<oneshot::Sender<AppResult<CandlePage>>>,
}

/// Fetcher whose responses are released one by one by the test.
#[derive(Clone, Default)]
pub struct ScriptedFetcher {
    script: Rc<RefCell<Script>>,
}

impl ScriptedFetcher {
    pub fn requests(&self) -> Vec<PageRequest> {
        self.script.borrow().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.script.borrow().requests.len()
    }

    pub fn pending(&self) -> usize {
        self.script.borrow().pending.len()
    }

    /// Answers the oldest unanswered request.
    pub fn respond(&self, result: AppResult<CandlePage>) {
        let sender = self.script.borrow_mut().pending.pop_front().expect("no request is waiting");
        let _ = sender.send(result);
    }
}

impl PageFetcher for ScriptedFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CandlePage, AppError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut script = self.script.borrow_mut();
            script.requests.push(request.clone());
            script.pending.push_back(tx);
        }
        rx.await.unwrap_or_else(|_| Err(AppError::NetworkError("request abandoned".into())))
    }
}

/// Result slot of a spawned fetch task.
#[derive(Clone, Default)]
pub struct Pending(Rc<RefCell<Option<AppResult<FetchOutcome>>>>);

impl Pending {
    pub fn is_done(&self) -> bool {
        self.0.borrow().is_some()
    }

    pub fn take(&self) -> AppResult<FetchOutcome> {
        self.0.borrow_mut().take().expect("task has not finished")
    }
}

/// Single-threaded driver around a source backed by [`ScriptedFetcher`].
pub struct Harness {
    pub pool: LocalPool,
    pub fetcher: ScriptedFetcher,
    pub source: InfiniteCandleSource<ScriptedFetcher>,
    pub events: Rc<RefCell<Vec<SourceEvent>>>,
}

impl Harness {
    pub fn new(page_size: u32) -> Self {
        Self::with_config(SourceConfig { page_size, ..SourceConfig::default() })
    }

    pub fn with_config(config: SourceConfig) -> Self {
        let fetcher = ScriptedFetcher::default();
        let source = InfiniteCandleSource::new(fetcher.clone(), &config).expect("valid config");
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        source.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        Self { pool: LocalPool::new(), fetcher, source, events }
    }

    /// Spawns `task` and runs it until it waits on the fetcher.
    pub fn spawn(&mut self, task: FetchTask) -> Pending {
        let pending = Pending::default();
        let slot = pending.clone();
        self.pool
            .spawner()
            .spawn_local(async move {
                let outcome = task.await;
                *slot.0.borrow_mut() = Some(outcome);
            })
            .expect("spawn");
        self.pool.run_until_stalled();
        pending
    }

    /// Spawns `task` and returns its result, which must be immediate.
    pub fn run_now(&mut self, task: FetchTask) -> AppResult<FetchOutcome> {
        let pending = self.spawn(task);
        pending.take()
    }

    pub fn respond(&mut self, result: AppResult<CandlePage>) {
        self.fetcher.respond(result);
        self.pool.run_until_stalled();
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        use candle_viewer_wasm::domain::events::DomainEvent;
        self.events.borrow().iter().map(|e| e.event_type()).collect()
    }

    pub fn clear_events(&self) {
        self.events.borrow_mut().clear();
    }
}

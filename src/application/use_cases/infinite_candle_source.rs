use crate::config::SourceConfig;
use crate::domain::{
    errors::{AppError, AppResult},
    events::{DomainEvent, SourceEvent, SourceEventDispatcher},
    logging::LogComponent,
    market_data::{
        Candle, CandlePage, CandleSeriesAssembler, FetchKind, InstrumentKey, PageBoundary, PageChain,
        PageFetcher, PageRequest, Timestamp, next_boundary, next_boundary_after,
    },
};
use crate::{log_debug, log_error, log_info, log_warn};
use futures::future::{self, FutureExt, LocalBoxFuture};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

/// Pending fetch returned by every mutating operation. The state transition
/// has already happened when the task is handed out; awaiting it performs the
/// request and applies the page.
pub type FetchTask = LocalBoxFuture<'static, AppResult<FetchOutcome>>;

/// Externally observable state of the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourcePhase {
    /// No key, or nothing loaded and nothing in flight.
    Idle,
    /// Page 0 in flight over an empty chain.
    Loading,
    /// Chain non-empty, nothing in flight.
    Ready,
    /// Next older page in flight.
    FetchingMore,
    /// Page 0 re-fetch in flight over a non-empty chain.
    Refreshing,
}

/// Why an operation did not issue a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    NoKey,
    /// Key and page size are what the source already holds.
    SameKey,
    AlreadyFetching,
    /// No page loaded yet to continue from.
    NotReady,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FetchOutcome {
    Applied { kind: FetchKind, page_index: usize, candle_count: usize },
    Skipped(SkipReason),
    /// The key changed while the request was out; its result was ignored.
    Discarded,
}

/// Read-only view of the source for UI bindings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnapshot {
    pub key: Option<InstrumentKey>,
    pub phase: SourcePhase,
    pub candle_count: usize,
    pub page_count: usize,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub has_more: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: u64,
    generation: u64,
    kind: FetchKind,
    to: Option<Timestamp>,
}

#[derive(Debug)]
struct SourceState {
    key: Option<InstrumentKey>,
    page_size: u32,
    include_partial_latest: bool,
    chain: PageChain,
    merged: Vec<Candle>,
    boundary: PageBoundary,
    /// Bumped whenever the cache identity changes; results from an older
    /// generation are stale.
    generation: u64,
    fetch_seq: u64,
    in_flight: Option<InFlight>,
    last_error: Option<AppError>,
}

impl SourceState {
    fn reset(&mut self) {
        self.generation += 1;
        self.chain.clear();
        self.merged.clear();
        self.boundary = PageBoundary::NoMore;
        self.in_flight = None;
        self.last_error = None;
    }

    fn phase(&self) -> SourcePhase {
        if self.key.is_none() {
            return SourcePhase::Idle;
        }
        match (self.in_flight, self.chain.is_empty()) {
            (None, true) => SourcePhase::Idle,
            (None, false) => SourcePhase::Ready,
            (Some(_), true) => SourcePhase::Loading,
            (Some(flight), false) if flight.kind == FetchKind::Trailing => SourcePhase::FetchingMore,
            (Some(_), false) => SourcePhase::Refreshing,
        }
    }

    /// Marks a fetch as in flight and builds its request.
    fn begin(
        &mut self,
        key: InstrumentKey,
        kind: FetchKind,
        to: Option<Timestamp>,
        events: &mut Vec<SourceEvent>,
    ) -> (InFlight, PageRequest) {
        self.fetch_seq += 1;
        let flight = InFlight { id: self.fetch_seq, generation: self.generation, kind, to };
        self.in_flight = Some(flight);

        let request = match to {
            Some(to) => PageRequest::before(key.clone(), self.page_size, to),
            None => PageRequest::latest(key.clone(), self.page_size, self.include_partial_latest),
        };
        events.push(SourceEvent::FetchStarted { key, kind, to });
        (flight, request)
    }
}

/// Releases the single-flight slot if the task is dropped before it finishes.
struct InFlightGuard {
    state: Rc<RefCell<SourceState>>,
    id: u64,
    armed: bool,
}

impl InFlightGuard {
    /// The task finished; `apply` decides what happens to `in_flight`.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Ok(mut state) = self.state.try_borrow_mut() {
            if state.in_flight.is_some_and(|flight| flight.id == self.id) {
                state.in_flight = None;
                log_debug!(LogComponent::Application("CandleSource"), "Fetch #{} abandoned", self.id);
            }
        }
    }
}

/// Paginated, backwards-in-time candle source for one instrument at a time.
///
/// Page 0 is requested without an upper bound; every further page is
/// requested strictly older than the oldest bar held. At most one fetch is in
/// flight, and results that arrive after the key changed are dropped.
pub struct InfiniteCandleSource<F> {
    state: Rc<RefCell<SourceState>>,
    fetcher: Rc<F>,
    assembler: CandleSeriesAssembler,
    events: Rc<SourceEventDispatcher>,
}

impl<F> Clone for InfiniteCandleSource<F> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
            fetcher: Rc::clone(&self.fetcher),
            assembler: self.assembler,
            events: Rc::clone(&self.events),
        }
    }
}

fn skipped(reason: SkipReason) -> FetchTask {
    future::ready(Ok(FetchOutcome::Skipped(reason))).boxed_local()
}

impl<F: PageFetcher + 'static> InfiniteCandleSource<F> {
    pub fn new(fetcher: F, config: &SourceConfig) -> AppResult<Self> {
        if config.page_size == 0 {
            return Err(AppError::ValidationError("page size must be positive".into()));
        }
        let state = SourceState {
            key: None,
            page_size: config.page_size,
            include_partial_latest: config.include_partial_latest,
            chain: PageChain::new(),
            merged: Vec::new(),
            boundary: PageBoundary::NoMore,
            generation: 0,
            fetch_seq: 0,
            in_flight: None,
            last_error: None,
        };
        Ok(Self {
            state: Rc::new(RefCell::new(state)),
            fetcher: Rc::new(fetcher),
            assembler: CandleSeriesAssembler::new(config.merge_policy),
            events: Rc::new(SourceEventDispatcher::new()),
        })
    }

    /// Switches to `key`. A different key empties the series immediately and
    /// loads page 0; the same key is a no-op.
    pub fn set_key(&self, key: InstrumentKey) -> FetchTask {
        let mut events = Vec::new();
        let started = {
            let mut state = self.state.borrow_mut();
            if state.key.as_ref() == Some(&key) {
                return skipped(SkipReason::SameKey);
            }
            log_info!(LogComponent::Application("CandleSource"), "🔄 Switching to {}", key);
            state.reset();
            state.key = Some(key.clone());
            events.push(SourceEvent::KeyChanged { key: key.clone() });
            state.begin(key, FetchKind::Initial, None, &mut events)
        };
        self.publish(events);
        self.run(started)
    }

    /// Changes the page size. The chain is reset like a key switch.
    pub fn set_page_size(&self, page_size: u32) -> FetchTask {
        if page_size == 0 {
            return future::ready(Err(AppError::ValidationError("page size must be positive".into())))
                .boxed_local();
        }
        let mut events = Vec::new();
        let started = {
            let mut state = self.state.borrow_mut();
            if state.page_size == page_size {
                return skipped(SkipReason::SameKey);
            }
            state.page_size = page_size;
            state.reset();
            let Some(key) = state.key.clone() else {
                return skipped(SkipReason::NoKey);
            };
            state.begin(key, FetchKind::Initial, None, &mut events)
        };
        self.publish(events);
        self.run(started)
    }

    /// Requests the next older page. Safe to call on every viewport change:
    /// it only fetches when ready, not exhausted and nothing is in flight.
    pub fn load_more(&self) -> FetchTask {
        let mut events = Vec::new();
        let started = {
            let mut state = self.state.borrow_mut();
            let Some(key) = state.key.clone() else {
                return skipped(SkipReason::NoKey);
            };
            if state.in_flight.is_some() {
                return skipped(SkipReason::AlreadyFetching);
            }
            if state.chain.is_empty() {
                return skipped(SkipReason::NotReady);
            }
            let PageBoundary::Before(to) = state.boundary else {
                return skipped(SkipReason::Exhausted);
            };
            state.begin(key, FetchKind::Trailing, Some(to), &mut events)
        };
        self.publish(events);
        self.run(started)
    }

    /// Re-requests page 0 for the current key. Older pages are kept.
    pub fn refetch(&self) -> FetchTask {
        let mut events = Vec::new();
        let started = {
            let mut state = self.state.borrow_mut();
            let Some(key) = state.key.clone() else {
                return skipped(SkipReason::NoKey);
            };
            if state.in_flight.is_some() {
                return skipped(SkipReason::AlreadyFetching);
            }
            let kind = if state.chain.is_empty() { FetchKind::Initial } else { FetchKind::Refresh };
            state.begin(key, kind, None, &mut events)
        };
        self.publish(events);
        self.run(started)
    }

    /// Drops the key and every page. Results still in flight are discarded.
    pub fn clear(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.reset();
            state.key = None;
        }
        log_debug!(LogComponent::Application("CandleSource"), "Source cleared");
        self.publish(vec![SourceEvent::Cleared]);
    }

    fn run(&self, (flight, request): (InFlight, PageRequest)) -> FetchTask {
        let mut guard = InFlightGuard { state: Rc::clone(&self.state), id: flight.id, armed: true };
        let source = self.clone();

        log_debug!(
            LogComponent::Application("CandleSource"),
            "📡 Fetch #{} {} {} limit={} to={:?}",
            flight.id,
            flight.kind,
            request.key,
            request.limit,
            request.to
        );

        async move {
            let result = source.fetcher.fetch_page(&request).await;
            guard.disarm();
            source.apply(flight, request, result)
        }
        .boxed_local()
    }

    fn apply(
        &self,
        flight: InFlight,
        request: PageRequest,
        result: AppResult<CandlePage>,
    ) -> AppResult<FetchOutcome> {
        let mut events = Vec::new();
        let outcome = {
            let mut state = self.state.borrow_mut();
            let current = state.in_flight.is_some_and(|f| f.id == flight.id);

            if flight.generation != state.generation || !current {
                log_debug!(
                    LogComponent::Application("CandleSource"),
                    "Discarding stale {} page for {}",
                    flight.kind,
                    request.key
                );
                events.push(SourceEvent::StaleResponseDiscarded { key: request.key, kind: flight.kind });
                Ok(FetchOutcome::Discarded)
            } else {
                state.in_flight = None;
                match result {
                    Ok(page) => Ok(self.apply_page(&mut state, flight, request.key, page, &mut events)),
                    Err(error) => {
                        if flight.kind == FetchKind::Initial {
                            log_error!(
                                LogComponent::Application("CandleSource"),
                                "❌ Initial load of {} failed: {}",
                                request.key,
                                error
                            );
                        } else {
                            log_warn!(
                                LogComponent::Application("CandleSource"),
                                "{} fetch for {} failed: {}",
                                flight.kind,
                                request.key,
                                error
                            );
                        }
                        state.last_error = Some(error.clone());
                        events.push(SourceEvent::FetchFailed { key: request.key, kind: flight.kind, error: error.clone() });
                        Err(error)
                    }
                }
            }
        };
        self.publish(events);
        outcome
    }

    fn apply_page(
        &self,
        state: &mut SourceState,
        flight: InFlight,
        key: InstrumentKey,
        page: CandlePage,
        events: &mut Vec<SourceEvent>,
    ) -> FetchOutcome {
        let candle_count = page.len();
        let page_index = match flight.kind {
            FetchKind::Initial | FetchKind::Trailing => {
                state.boundary = next_boundary_after(&page, flight.to);
                state.chain.push_older(page)
            }
            FetchKind::Refresh => {
                if state.chain.refresh_head(page) {
                    log_info!(
                        LogComponent::Application("CandleSource"),
                        "Refresh for {} no longer reaches the loaded history; restarting from page 0",
                        key
                    );
                }
                if state.chain.len() == 1 {
                    if let Some(head) = state.chain.head() {
                        state.boundary = next_boundary(head);
                    }
                }
                0
            }
        };

        state.merged = self.assembler.merge(state.chain.display_order()).candles;
        state.last_error = None;

        log_info!(
            LogComponent::Application("CandleSource"),
            "✅ {} page #{} for {}: {} bars, {} total",
            flight.kind,
            page_index,
            key,
            candle_count,
            state.merged.len()
        );

        events.push(SourceEvent::PageApplied { key: key.clone(), kind: flight.kind, page_index, candle_count });
        if !state.boundary.has_more() {
            log_info!(LogComponent::Application("CandleSource"), "No older history for {}", key);
            events.push(SourceEvent::Exhausted { key });
        }

        FetchOutcome::Applied { kind: flight.kind, page_index, candle_count }
    }

    fn publish(&self, events: Vec<SourceEvent>) {
        for event in &events {
            log_debug!(LogComponent::Application("CandleSource"), "Event {}", event.event_type());
            self.events.publish(event);
        }
    }
}

impl<F> InfiniteCandleSource<F> {
    pub fn subscribe<H>(&self, handler: H)
    where
        H: Fn(&SourceEvent) + 'static,
    {
        self.events.subscribe(handler);
    }

    pub fn key(&self) -> Option<InstrumentKey> {
        self.state.borrow().key.clone()
    }

    pub fn page_size(&self) -> u32 {
        self.state.borrow().page_size
    }

    /// Merged ascending series.
    pub fn candles(&self) -> Vec<Candle> {
        self.state.borrow().merged.clone()
    }

    /// Borrows the merged series without copying it.
    pub fn with_candles<R>(&self, f: impl FnOnce(&[Candle]) -> R) -> R {
        f(&self.state.borrow().merged)
    }

    pub fn phase(&self) -> SourcePhase {
        self.state.borrow().phase()
    }

    /// True only while page 0 of a fresh chain is in flight.
    pub fn is_loading(&self) -> bool {
        self.phase() == SourcePhase::Loading
    }

    /// True while any fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        self.state.borrow().in_flight.is_some()
    }

    pub fn has_more(&self) -> bool {
        let state = self.state.borrow();
        !state.chain.is_empty() && state.boundary.has_more()
    }

    pub fn page_count(&self) -> usize {
        self.state.borrow().chain.len()
    }

    pub fn last_error(&self) -> Option<AppError> {
        self.state.borrow().last_error.clone()
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        let state = self.state.borrow();
        let phase = state.phase();
        SourceSnapshot {
            key: state.key.clone(),
            phase,
            candle_count: state.merged.len(),
            page_count: state.chain.len(),
            is_loading: phase == SourcePhase::Loading,
            is_fetching: state.in_flight.is_some(),
            has_more: !state.chain.is_empty() && state.boundary.has_more(),
            error: state.last_error.as_ref().map(ToString::to_string),
        }
    }
}

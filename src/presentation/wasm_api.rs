use crate::application::{FetchOutcome, FetchTask, InfiniteCandleSource, ViewportEdgeTrigger};
use crate::config::AppConfig;
use crate::domain::{
    errors::{AppError, AppResult},
    events::DomainEvent,
    logging::LogComponent,
    market_data::MarketType,
    selection::SelectionStore,
};
use crate::infrastructure::{CandlesApiClient, LocalStoragePreferences, RetryingFetcher};
use crate::{log_info, log_warn};
use crate::presentation::chart_mapping::ChartData;
use gloo::utils::format::JsValueSerdeExt;
use js_sys::Promise;
use serde::Serialize;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, spawn_local};

pub type ApiFetcher = RetryingFetcher<CandlesApiClient>;

fn js_error(error: AppError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    JsValue::from_serde(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

/// Resolves with the serialized outcome, rejects with the error message.
fn drive(task: FetchTask) -> Promise {
    future_to_promise(async move {
        let outcome: AppResult<FetchOutcome> = task.await;
        match outcome {
            Ok(outcome) => to_js(&outcome),
            Err(e) => Err(js_error(e)),
        }
    })
}

/// Runs a task in the background; failures are already logged and published.
fn detach(task: FetchTask) {
    spawn_local(async move {
        let _ = task.await;
    });
}

/// JS-facing candle data source: selection, paging and chart-ready output.
#[wasm_bindgen]
pub struct CandleDataSource {
    client: CandlesApiClient,
    source: InfiniteCandleSource<ApiFetcher>,
    selection: Rc<SelectionStore<LocalStoragePreferences>>,
    trigger: ViewportEdgeTrigger,
}

#[wasm_bindgen]
impl CandleDataSource {
    /// `config` is a partial `AppConfig` object, or `undefined` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<CandleDataSource, JsValue> {
        let config: AppConfig = if config.is_undefined() || config.is_null() {
            AppConfig::default()
        } else {
            config
                .into_serde()
                .map_err(|e| js_error(AppError::ConfigurationError(e.to_string())))?
        };
        config.validate().map_err(js_error)?;

        let client = CandlesApiClient::new(&config.api);
        let fetcher = RetryingFetcher::from_config(client.clone(), &config.api);
        let source = InfiniteCandleSource::new(fetcher, &config.source).map_err(js_error)?;
        let selection = Rc::new(SelectionStore::load(LocalStoragePreferences));

        log_info!(
            LogComponent::Presentation("CandleDataSource"),
            "🚀 Data source ready for {} ({})",
            selection.current(),
            config.api.base_url
        );

        Ok(Self { client, source, selection, trigger: ViewportEdgeTrigger::new(&config.edge) })
    }

    /// Loads page 0 for the persisted selection.
    pub fn start(&self) -> Promise {
        drive(self.source.set_key(self.selection.current()))
    }

    #[wasm_bindgen(js_name = setInstrument)]
    pub fn set_instrument(&self, exchange: String, market_type: String, symbol: String) -> Promise {
        let market_type = match market_type.parse::<MarketType>() {
            Ok(market_type) => market_type,
            Err(_) => {
                let error = AppError::ValidationError(format!("unknown market type '{}'", market_type));
                return Promise::reject(&js_error(error));
            }
        };
        self.selection.set_instrument(&exchange, market_type, &symbol);
        drive(self.source.set_key(self.selection.current()))
    }

    #[wasm_bindgen(js_name = setTimeframe)]
    pub fn set_timeframe(&self, timeframe: String) -> Promise {
        self.selection.set_timeframe(&timeframe);
        drive(self.source.set_key(self.selection.current()))
    }

    #[wasm_bindgen(js_name = loadMore)]
    pub fn load_more(&self) -> Promise {
        drive(self.source.load_more())
    }

    pub fn refetch(&self) -> Promise {
        drive(self.source.refetch())
    }

    /// Feed of the chart's visible left edge. Returns whether a page was requested.
    #[wasm_bindgen(js_name = onVisibleRangeChange)]
    pub fn on_visible_range_change(&self, from: f64) -> bool {
        match self.trigger.on_visible_range_change(from, &self.source) {
            Some(task) => {
                detach(task);
                true
            }
            None => false,
        }
    }

    /// `{ candles, volumes }` ready for the chart widget.
    #[wasm_bindgen(js_name = chartData)]
    pub fn chart_data(&self) -> Result<JsValue, JsValue> {
        to_js(&self.source.with_candles(ChartData::from_candles))
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&self.source.snapshot())
    }

    pub fn selection(&self) -> Result<JsValue, JsValue> {
        to_js(&self.selection.current())
    }

    /// Calls `callback(eventType)` after every source change.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: js_sys::Function) {
        self.source.subscribe(move |event| {
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(event.event_type())) {
                log_warn!(LogComponent::Presentation("CandleDataSource"), "onChange callback threw: {:?}", e);
            }
        });
    }

    #[wasm_bindgen(js_name = fetchExchanges)]
    pub fn fetch_exchanges(&self) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move { to_js(&client.fetch_exchanges().await.map_err(js_error)?) })
    }

    #[wasm_bindgen(js_name = fetchTimeframes)]
    pub fn fetch_timeframes(&self) -> Promise {
        let client = self.client.clone();
        future_to_promise(async move { to_js(&client.fetch_timeframes().await.map_err(js_error)?) })
    }

    /// Lists symbols for the current exchange and market type. If the
    /// selection is not among them it moves to the first one and reloads.
    #[wasm_bindgen(js_name = fetchSymbols)]
    pub fn fetch_symbols(&self) -> Promise {
        let client = self.client.clone();
        let selection = Rc::clone(&self.selection);
        let source = self.source.clone();
        future_to_promise(async move {
            let key = selection.current();
            let rows = client.fetch_symbols(&key.exchange, key.market_type, None).await.map_err(js_error)?;
            let rows = selection.reconcile_symbols(&rows);
            detach(source.set_key(selection.current()));
            to_js(&rows)
        })
    }
}

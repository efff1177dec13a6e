use leptos::*;
use std::rc::Rc;
use strum::IntoEnumIterator;
use wasm_bindgen::prelude::*;

use crate::{
    application::{FetchTask, InfiniteCandleSource, SourceSnapshot},
    config::AppConfig,
    domain::{
        logging::LogComponent,
        market_data::{Candle, InstrumentKey, MarketType, PageFetcher, SymbolRow},
        selection::SelectionStore,
    },
    infrastructure::{CandlesApiClient, LocalStoragePreferences, RetryingFetcher},
    log_debug, log_warn,
    time_utils::format_bar_time,
};

const FALLBACK_TIMEFRAMES: [&str; 6] = ["1m", "5m", "15m", "1h", "4h", "1d"];
const TAIL_ROWS: usize = 20;

/// 🌉 Reactive mirror of the data source's public state
#[derive(Clone, Copy)]
pub struct CandleSignals {
    pub candles: RwSignal<Vec<Candle>>,
    pub snapshot: RwSignal<SourceSnapshot>,
    revision: RwSignal<u64>,
}

impl CandleSignals {
    /// Re-reads the source after every event it publishes.
    pub fn bind<F: PageFetcher + 'static>(source: &InfiniteCandleSource<F>) -> Self {
        let signals = Self {
            candles: create_rw_signal(source.candles()),
            snapshot: create_rw_signal(source.snapshot()),
            revision: create_rw_signal(0),
        };

        let revision = signals.revision;
        source.subscribe(move |_| revision.update(|r| *r += 1));

        let source = source.clone();
        create_effect(move |_| {
            let _ = signals.revision.get();
            signals.candles.set(source.candles());
            signals.snapshot.set(source.snapshot());
        });

        signals
    }
}

fn spawn_task(task: FetchTask) {
    spawn_local(async move {
        if let Err(e) = task.await {
            log_debug!(LogComponent::Presentation("App"), "Fetch ended with error: {}", e);
        }
    });
}

fn key_identity(key: &InstrumentKey) -> String {
    format!("{}|{}|{}", key.exchange, key.market_type, key.symbol)
}

/// 🦀 Candle viewer shell
#[component]
pub fn App() -> impl IntoView {
    let config = AppConfig::default();
    let client = CandlesApiClient::new(&config.api);
    let fetcher = RetryingFetcher::from_config(client.clone(), &config.api);
    let source = match InfiniteCandleSource::new(fetcher, &config.source) {
        Ok(source) => source,
        Err(e) => return view! { <div class="status error">{e.to_string()}</div> }.into_view(),
    };

    let signals = CandleSignals::bind(&source);
    let selection = Rc::new(SelectionStore::load(LocalStoragePreferences));
    let selected = create_rw_signal(selection.current());

    {
        let source = source.clone();
        selection.subscribe(move |key| {
            selected.set(key.clone());
            spawn_task(source.set_key(key.clone()));
        });
    }
    spawn_task(source.set_key(selection.current()));

    let timeframes = create_rw_signal(FALLBACK_TIMEFRAMES.iter().map(ToString::to_string).collect::<Vec<_>>());
    {
        let client = client.clone();
        spawn_local(async move {
            match client.fetch_timeframes().await {
                Ok(list) if !list.is_empty() => timeframes.set(list),
                Ok(_) => {}
                Err(e) => log_warn!(LogComponent::Presentation("App"), "Timeframes unavailable, using defaults: {}", e),
            }
        });
    }

    // Symbols depend only on exchange and market type.
    let symbols = create_rw_signal(Vec::<SymbolRow>::new());
    let venue = create_memo(move |_| selected.with(|k| (k.exchange.clone(), k.market_type)));
    {
        let selection = Rc::clone(&selection);
        create_effect(move |_| {
            let (exchange, market_type) = venue.get();
            let client = client.clone();
            let selection = Rc::clone(&selection);
            spawn_local(async move {
                match client.fetch_symbols(&exchange, market_type, None).await {
                    Ok(rows) => symbols.set(selection.reconcile_symbols(&rows)),
                    Err(e) => log_warn!(
                        LogComponent::Presentation("App"),
                        "Symbols for {} {} unavailable: {}",
                        exchange,
                        market_type,
                        e
                    ),
                }
            });
        });
    }

    let on_market_type = {
        let selection = Rc::clone(&selection);
        move |ev: ev::Event| {
            if let Ok(market_type) = event_target_value(&ev).parse::<MarketType>() {
                selection.set_market_type(market_type);
            }
        }
    };
    let on_symbol = {
        let selection = Rc::clone(&selection);
        move |ev: ev::Event| {
            let value = event_target_value(&ev);
            let mut parts = value.splitn(3, '|');
            if let (Some(exchange), Some(market_type), Some(symbol)) = (parts.next(), parts.next(), parts.next()) {
                if let Ok(market_type) = market_type.parse::<MarketType>() {
                    selection.set_instrument(exchange, market_type, symbol);
                }
            }
        }
    };
    let on_timeframe = {
        let selection = Rc::clone(&selection);
        move |ev: ev::Event| {
            selection.set_timeframe(&event_target_value(&ev));
        }
    };
    let load_older = {
        let source = source.clone();
        move |_: ev::MouseEvent| spawn_task(source.load_more())
    };
    let refresh = {
        let source = source.clone();
        move |_: ev::MouseEvent| spawn_task(source.refetch())
    };

    let status = move || {
        let snapshot = signals.snapshot.get();
        let timeframe = selected.with(|k| k.timeframe.to_string());
        let oldest = signals
            .candles
            .with(|c| c.first().map(|c| format!(" • oldest {}", format_bar_time(c.timestamp.value(), &timeframe))))
            .unwrap_or_default();
        let more = if snapshot.has_more { "" } else { " • start of history" };
        format!(
            "{:?} • {} bars in {} pages{}{}",
            snapshot.phase, snapshot.candle_count, snapshot.page_count, oldest, more
        )
    };

    view! {
        <style>
            {r#"
            .candle-viewer-app { font-family: -apple-system, BlinkMacSystemFont, sans-serif; background: #131722; color: #d1d4dc; min-height: 100vh; padding: 20px; }
            .controls { display: flex; gap: 10px; margin-bottom: 15px; }
            .controls select, .controls button { background: #1e222d; color: #d1d4dc; border: 1px solid #363a45; border-radius: 4px; padding: 6px 10px; }
            .controls button:disabled { opacity: 0.4; }
            .status { margin: 10px 0; font-size: 13px; color: #a0a0a0; }
            .status.error { color: #ef5350; }
            .bars td { padding: 2px 10px; font-family: 'Courier New', monospace; font-size: 12px; }
            .bars tr.up { color: #26a69a; }
            .bars tr.down { color: #ef5350; }
            "#}
        </style>
        <div class="candle-viewer-app">
            <div class="controls">
                <select on:change=on_market_type aria-label="Market type">
                    {MarketType::iter()
                        .map(|mt| {
                            view! {
                                <option value=mt.to_string() selected=move || selected.with(|k| k.market_type == mt)>
                                    {mt.to_string()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
                <select on:change=on_symbol aria-label="Instrument">
                    <For
                        each=move || symbols.get()
                        key=|row: &SymbolRow| row.identity()
                        children=move |row: SymbolRow| {
                            let value = row.identity();
                            let label = format!("{} • {} • {}", row.exchange, row.market_type, row.name);
                            let current = value.clone();
                            view! {
                                <option value=value selected=move || selected.with(|k| key_identity(k) == current)>
                                    {label}
                                </option>
                            }
                        }
                    />
                </select>
                <select on:change=on_timeframe aria-label="Timeframe">
                    <For
                        each=move || timeframes.get()
                        key=|tf: &String| tf.clone()
                        children=move |tf: String| {
                            let current = tf.clone();
                            view! {
                                <option value=tf.clone() selected=move || selected.with(|k| k.timeframe.value() == current)>
                                    {tf}
                                </option>
                            }
                        }
                    />
                </select>
                <button
                    on:click=load_older
                    disabled=move || signals.snapshot.with(|s| !s.has_more || s.is_fetching)
                >
                    "⬅️ Load older"
                </button>
                <button on:click=refresh disabled=move || signals.snapshot.with(|s| s.is_fetching)>
                    "🔄 Refresh"
                </button>
            </div>
            <div class="status">{status}</div>
            <div class="status error">
                {move || signals.snapshot.with(|s| s.error.clone().unwrap_or_default())}
            </div>
            <table class="bars">
                <For
                    each=move || signals.candles.with(|c| c.iter().rev().take(TAIL_ROWS).cloned().collect::<Vec<_>>())
                    key=|c: &Candle| c.timestamp.value()
                    children=move |c: Candle| {
                        let timeframe = selected.with_untracked(|k| k.timeframe.to_string());
                        let row_class = if c.is_bullish() { "up" } else { "down" };
                        view! {
                            <tr class=row_class>
                                <td>{format_bar_time(c.timestamp.value(), &timeframe)}</td>
                                <td>{format!("{:.2}", c.ohlcv.open.value())}</td>
                                <td>{format!("{:.2}", c.ohlcv.high.value())}</td>
                                <td>{format!("{:.2}", c.ohlcv.low.value())}</td>
                                <td>{format!("{:.2}", c.ohlcv.close.value())}</td>
                                <td>{format!("{:.4}", c.ohlcv.volume.value())}</td>
                            </tr>
                        }
                    }
                />
            </table>
        </div>
    }
    .into_view()
}

/// Mounts the viewer shell on `<body>`.
#[wasm_bindgen(js_name = mountApp)]
pub fn mount_app() {
    mount_to_body(|| view! { <App/> })
}

use candle_viewer_wasm::config::SELECTION_STORAGE_KEY;
use candle_viewer_wasm::domain::market_data::{InstrumentKey, MarketType, PreferenceStore, SymbolRow};
use candle_viewer_wasm::domain::selection::SelectionStore;
use candle_viewer_wasm::infrastructure::MemoryPreferences;
use std::cell::RefCell;
use std::rc::Rc;

fn symbol(id: u32, exchange: &str, market_type: &str, name: &str) -> SymbolRow {
    SymbolRow { id, name: name.into(), market_type: market_type.into(), exchange: exchange.into() }
}

fn recorded(store: &SelectionStore<MemoryPreferences>) -> Rc<RefCell<Vec<InstrumentKey>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    store.subscribe(move |key| sink.borrow_mut().push(key.clone()));
    seen
}

#[test]
fn starts_from_defaults() {
    let store = SelectionStore::load(MemoryPreferences::new());
    assert_eq!(store.current(), InstrumentKey::new("binance", MarketType::Spot, "BTCUSDT", "1h"));
}

#[test]
fn restores_stored_selection() {
    let stored = r#"{"state":{"exchange":"bybit","marketType":"futures","symbol":"ETHUSDT","timeframe":"4h"},"version":1}"#;
    let store = SelectionStore::load(MemoryPreferences::with_entry(SELECTION_STORAGE_KEY, stored));
    assert_eq!(store.current(), InstrumentKey::new("bybit", MarketType::Futures, "ETHUSDT", "4h"));
}

#[test]
fn ignores_unusable_records() {
    let other_version =
        r#"{"state":{"exchange":"bybit","marketType":"futures","symbol":"ETHUSDT","timeframe":"4h"},"version":2}"#;
    for stored in [other_version, "{", r#"{"state":{"exchange":"bybit"},"version":1}"#] {
        let store = SelectionStore::load(MemoryPreferences::with_entry(SELECTION_STORAGE_KEY, stored));
        assert_eq!(store.current(), InstrumentKey::default());
    }
}

#[test]
fn changes_are_persisted_in_versioned_record() {
    let prefs = MemoryPreferences::new();
    let store = SelectionStore::load(prefs.clone());
    assert!(store.set_timeframe("15m"));

    let raw = prefs.get(SELECTION_STORAGE_KEY).expect("persisted");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(value["version"], 1);
    assert_eq!(value["state"]["timeframe"], "15m");
    assert_eq!(value["state"]["marketType"], "spot");

    let reloaded = SelectionStore::load(prefs);
    assert_eq!(reloaded.current().timeframe.value(), "15m");
}

#[test]
fn listeners_hear_each_effective_change_once() {
    let store = SelectionStore::load(MemoryPreferences::new());
    let seen = recorded(&store);

    assert!(!store.set_symbol(" BTCUSDT "));
    assert!(store.set_symbol("ETHUSDT"));
    assert!(store.set_instrument("okx", MarketType::Futures, "SOLUSDT"));
    assert!(!store.set_instrument("okx", MarketType::Futures, "SOLUSDT"));
    assert!(store.set_market_type(MarketType::Spot));
    assert!(store.set_exchange("binance"));

    let seen = seen.borrow();
    assert_eq!(seen.len(), 4);
    assert_eq!(seen[1], InstrumentKey::new("okx", MarketType::Futures, "SOLUSDT", "1h"));
    assert_eq!(seen[3], InstrumentKey::new("binance", MarketType::Spot, "SOLUSDT", "1h"));
}

#[test]
fn reconcile_cleans_and_keeps_a_listed_selection() {
    let store = SelectionStore::load(MemoryPreferences::new());
    let seen = recorded(&store);

    let rows = vec![
        symbol(1, "binance", "spot", "ETHUSDT"),
        symbol(2, "binance", "spot", "BTCUSDT"),
        symbol(3, "binance", "spot", "ETHUSDT"),
        symbol(4, "binance", "options", "BTC-C"),
        symbol(5, "", "spot", "XRPUSDT"),
    ];
    let cleaned = store.reconcile_symbols(&rows);

    assert_eq!(cleaned.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(seen.borrow().is_empty());
}

#[test]
fn reconcile_moves_to_first_listed_symbol() {
    let store = SelectionStore::load(MemoryPreferences::new());
    store.set_timeframe("5m");
    let seen = recorded(&store);

    store.reconcile_symbols(&[symbol(7, "binance", "spot", "SOLUSDT"), symbol(8, "binance", "spot", "ADAUSDT")]);
    assert_eq!(store.current(), InstrumentKey::new("binance", MarketType::Spot, "SOLUSDT", "5m"));
    assert_eq!(seen.borrow().len(), 1);

    // empty listing leaves the selection alone
    assert!(store.reconcile_symbols(&[]).is_empty());
    assert_eq!(store.current().symbol.value(), "SOLUSDT");
}

#[test]
fn mixed_case_symbols_are_matched_as_listed() {
    let store = SelectionStore::load(MemoryPreferences::new());
    store.set_instrument("bybit", MarketType::Futures, "1000pepeUSDC");
    assert_eq!(store.current().symbol.value(), "1000pepeUSDC");
    let seen = recorded(&store);

    store.reconcile_symbols(&[symbol(1, "bybit", "futures", "BTCUSDT"), symbol(2, "bybit", "futures", "1000pepeUSDC")]);

    assert_eq!(store.current().symbol.value(), "1000pepeUSDC");
    assert!(seen.borrow().is_empty());
}

use crate::config::SELECTION_STORAGE_KEY;
use crate::domain::logging::LogComponent;
use crate::domain::market_data::{InstrumentKey, MarketType, PreferenceStore, Symbol, SymbolRow, Timeframe};
use crate::{log_debug, log_warn};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashSet;

const SELECTION_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSelection {
    state: InstrumentKey,
    version: u32,
}

type KeyListener = Box<dyn Fn(&InstrumentKey)>;

/// Current instrument selection, persisted across sessions.
///
/// Listeners receive the new key once per effective change; setting a field
/// to the value it already has is silent.
pub struct SelectionStore<P: PreferenceStore> {
    storage: P,
    current: RefCell<InstrumentKey>,
    listeners: RefCell<Vec<KeyListener>>,
}

impl<P: PreferenceStore> SelectionStore<P> {
    /// Restores the last selection, or the defaults when nothing usable is stored.
    pub fn load(storage: P) -> Self {
        let current = Self::restore(&storage).unwrap_or_default();
        Self { storage, current: RefCell::new(current), listeners: RefCell::new(Vec::new()) }
    }

    fn restore(storage: &P) -> Option<InstrumentKey> {
        let raw = storage.get(SELECTION_STORAGE_KEY)?;
        match serde_json::from_str::<PersistedSelection>(&raw) {
            Ok(record) if record.version == SELECTION_VERSION => Some(record.state),
            Ok(record) => {
                log_warn!(
                    LogComponent::Domain("Selection"),
                    "Ignoring stored selection with version {}",
                    record.version
                );
                None
            }
            Err(e) => {
                log_warn!(LogComponent::Domain("Selection"), "Unreadable stored selection: {}", e);
                None
            }
        }
    }

    pub fn current(&self) -> InstrumentKey {
        self.current.borrow().clone()
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&InstrumentKey) + 'static,
    {
        self.listeners.borrow_mut().push(Box::new(listener));
    }

    pub fn set_exchange(&self, exchange: &str) -> bool {
        let exchange = exchange.trim().to_string();
        self.update(|key| key.exchange = exchange)
    }

    pub fn set_market_type(&self, market_type: MarketType) -> bool {
        self.update(|key| key.market_type = market_type)
    }

    pub fn set_symbol(&self, symbol: &str) -> bool {
        let symbol = Symbol::from(symbol);
        self.update(|key| key.symbol = symbol)
    }

    pub fn set_timeframe(&self, timeframe: &str) -> bool {
        let timeframe = Timeframe::from(timeframe);
        self.update(|key| key.timeframe = timeframe)
    }

    /// Switches exchange, market type and symbol with a single notification.
    pub fn set_instrument(&self, exchange: &str, market_type: MarketType, symbol: &str) -> bool {
        let target = InstrumentKey::new(exchange, market_type, symbol, "");
        self.update(|key| {
            key.exchange = target.exchange;
            key.market_type = target.market_type;
            key.symbol = target.symbol;
        })
    }

    /// Cleans a symbol listing and makes sure the selection points into it.
    ///
    /// Invalid rows are dropped and duplicates by `exchange|type|name` keep
    /// their first occurrence. When the list is non-empty and lacks the
    /// current instrument, the first row becomes the selection.
    pub fn reconcile_symbols(&self, rows: &[SymbolRow]) -> Vec<SymbolRow> {
        let mut seen = HashSet::new();
        let symbols: Vec<SymbolRow> = rows
            .iter()
            .filter(|row| row.is_valid())
            .filter(|row| seen.insert(row.identity()))
            .cloned()
            .collect();

        log_debug!(LogComponent::Domain("Selection"), "Normalized {} symbols", symbols.len());

        let current = self.current();
        let exists = symbols.iter().any(|row| {
            row.exchange == current.exchange
                && row.parsed_market_type() == Some(current.market_type)
                && row.name == current.symbol.value()
        });

        if !exists {
            if let Some(first) = symbols.first() {
                if let Some(market_type) = first.parsed_market_type() {
                    self.set_instrument(&first.exchange, market_type, &first.name);
                }
            }
        }

        symbols
    }

    fn update<F>(&self, mutate: F) -> bool
    where
        F: FnOnce(&mut InstrumentKey),
    {
        let changed = {
            let mut current = self.current.borrow_mut();
            let before = current.clone();
            mutate(&mut current);
            (*current != before).then(|| current.clone())
        };

        let Some(key) = changed else {
            return false;
        };

        self.persist(&key);
        for listener in self.listeners.borrow().iter() {
            listener(&key);
        }
        true
    }

    fn persist(&self, key: &InstrumentKey) {
        let record = PersistedSelection { state: key.clone(), version: SELECTION_VERSION };
        let result = serde_json::to_string(&record)
            .map_err(|e| e.to_string())
            .and_then(|json| self.storage.set(SELECTION_STORAGE_KEY, &json).map_err(|e| e.to_string()));
        if let Err(e) = result {
            log_warn!(LogComponent::Domain("Selection"), "Failed to persist selection: {}", e);
        }
    }
}

use derive_more::{Constructor, Deref, Display, From, Into};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use strum::{AsRefStr, Display as StrumDisplay, EnumIter, EnumString};

/// Value Object - price
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Serialize, Deserialize)]
pub struct Price(f64);

impl Price {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

/// Value Object - traded volume
#[derive(Debug, Clone, Copy, PartialEq, From, Into, Deref, Constructor, Serialize, Deserialize)]
pub struct Volume(f64);

impl Volume {
    pub fn value(&self) -> f64 {
        self.0
    }
}

/// Value Object - UTC milliseconds since the epoch.
///
/// Signed so that `oldest - 1` never underflows near the epoch.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into, Deref, Constructor, Display,
    Serialize, Deserialize,
)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_millis(value: i64) -> Self {
        Self(value)
    }

    /// The instant one millisecond earlier.
    pub fn pred(&self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

/// Value Object - OHLCV data
#[derive(Debug, Clone, Copy, PartialEq, Constructor, Serialize, Deserialize)]
pub struct OHLCV {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Volume,
}

impl OHLCV {
    /// `low <= min(open, close) <= max(open, close) <= high` and a
    /// non-negative volume. Upstream bars may violate this; nothing here
    /// rejects them.
    pub fn is_valid(&self) -> bool {
        self.high >= self.open
            && self.high >= self.close
            && self.high >= self.low
            && self.low <= self.open
            && self.low <= self.close
            && self.volume.value() >= 0.0
    }
}

/// Value Object - trading symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(symbol: String) -> Result<Self, String> {
        if symbol.trim().is_empty() {
            return Err("Symbol cannot be empty".to_string());
        }
        Ok(Self(symbol.trim().to_string()))
    }

    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

/// Value Object - market type of an instrument
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumIter, EnumString, AsRefStr, Serialize,
    Deserialize,
)]
pub enum MarketType {
    #[strum(serialize = "spot")]
    #[serde(rename = "spot")]
    Spot,

    #[strum(serialize = "futures")]
    #[serde(rename = "futures")]
    Futures,
}

/// Value Object - bar timeframe as the backend names it (`1m`, `1h`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deref, Display, Serialize, Deserialize)]
#[display(fmt = "{}", _0)]
pub struct Timeframe(String);

impl Timeframe {
    pub fn value(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Timeframe {
    fn from(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

/// Identity of a viewed series. Any field change means a different series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[display(fmt = "{}:{}:{}@{}", exchange, market_type, symbol, timeframe)]
pub struct InstrumentKey {
    pub exchange: String,
    pub market_type: MarketType,
    pub symbol: Symbol,
    pub timeframe: Timeframe,
}

impl InstrumentKey {
    pub fn new(exchange: &str, market_type: MarketType, symbol: &str, timeframe: &str) -> Self {
        Self {
            exchange: exchange.trim().to_string(),
            market_type,
            symbol: Symbol::from(symbol),
            timeframe: Timeframe::from(timeframe),
        }
    }
}

impl Default for InstrumentKey {
    fn default() -> Self {
        Self::new("binance", MarketType::Spot, "BTCUSDT", "1h")
    }
}

/// One tradable instrument as listed by the metadata endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRow {
    pub id: u32,
    pub name: String,
    #[serde(rename = "type", alias = "marketType")]
    pub market_type: String,
    pub exchange: String,
}

impl SymbolRow {
    /// `exchange|type|name`, the identity used for de-duplication.
    pub fn identity(&self) -> String {
        format!("{}|{}|{}", self.exchange, self.market_type, self.name)
    }

    pub fn parsed_market_type(&self) -> Option<MarketType> {
        self.market_type.parse().ok()
    }

    pub fn is_valid(&self) -> bool {
        !self.exchange.is_empty() && !self.name.is_empty() && self.parsed_market_type().is_some()
    }
}

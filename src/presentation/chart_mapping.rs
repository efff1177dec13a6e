use crate::domain::market_data::Candle;
use crate::time_utils::ms_to_chart_seconds;
use serde::Serialize;

pub const UP_COLOR: &str = "#26a69a";
pub const DOWN_COLOR: &str = "#ef5350";

/// Candlestick point in the chart widget's format
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartCandle {
    pub time: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Volume histogram bar, coloured by candle direction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartVolume {
    pub time: f64,
    pub value: f64,
    pub color: &'static str,
}

impl From<&Candle> for ChartCandle {
    fn from(candle: &Candle) -> Self {
        Self {
            time: ms_to_chart_seconds(candle.timestamp.value()),
            open: candle.ohlcv.open.value(),
            high: candle.ohlcv.high.value(),
            low: candle.ohlcv.low.value(),
            close: candle.ohlcv.close.value(),
        }
    }
}

impl From<&Candle> for ChartVolume {
    fn from(candle: &Candle) -> Self {
        Self {
            time: ms_to_chart_seconds(candle.timestamp.value()),
            value: candle.ohlcv.volume.value(),
            color: if candle.is_bullish() { UP_COLOR } else { DOWN_COLOR },
        }
    }
}

/// Both series for one render, ascending.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ChartData {
    pub candles: Vec<ChartCandle>,
    pub volumes: Vec<ChartVolume>,
}

impl ChartData {
    pub fn from_candles(candles: &[Candle]) -> Self {
        Self {
            candles: candles.iter().map(ChartCandle::from).collect(),
            volumes: candles.iter().map(ChartVolume::from).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Visible range covering every bar, in chart seconds.
    pub fn full_range(&self) -> Option<(f64, f64)> {
        Some((self.candles.first()?.time, self.candles.last()?.time))
    }
}

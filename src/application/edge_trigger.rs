use crate::application::use_cases::{FetchTask, InfiniteCandleSource};
use crate::config::{ChartTimeUnit, EdgeConfig};
use crate::domain::{
    logging::LogComponent,
    market_data::{Candle, PageFetcher},
};
use crate::log_debug;

/// Decides when the chart has scrolled close enough to the oldest loaded bar
/// to ask for the next older page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportEdgeTrigger {
    lookahead_bars: u32,
    default_step: i64,
    unit: ChartTimeUnit,
}

impl Default for ViewportEdgeTrigger {
    fn default() -> Self {
        Self::new(&EdgeConfig::default())
    }
}

impl ViewportEdgeTrigger {
    pub fn new(config: &EdgeConfig) -> Self {
        Self {
            lookahead_bars: config.lookahead_bars,
            default_step: config.default_step.max(1),
            unit: config.time_unit,
        }
    }

    fn to_chart_time(&self, ms: i64) -> i64 {
        match self.unit {
            ChartTimeUnit::Seconds => ms.div_euclid(1000),
            ChartTimeUnit::Milliseconds => ms,
        }
    }

    /// Spacing of the two oldest bars in chart units, at least 1.
    pub fn step(&self, candles: &[Candle]) -> i64 {
        match candles {
            [first, second, ..] => {
                let delta = second.timestamp.value().saturating_sub(first.timestamp.value());
                let step = match self.unit {
                    ChartTimeUnit::Seconds => (delta as f64 / 1000.0).round() as i64,
                    ChartTimeUnit::Milliseconds => delta,
                };
                step.max(1)
            }
            _ => self.default_step,
        }
    }

    /// Left-edge position at or below which the next page is wanted.
    /// `None` when nothing is loaded.
    pub fn threshold(&self, candles: &[Candle]) -> Option<i64> {
        let first = candles.first()?;
        let first = self.to_chart_time(first.timestamp.value());
        let span = self.step(candles).saturating_mul(i64::from(self.lookahead_bars));
        Some(first.saturating_add(span))
    }

    pub fn should_load_more(&self, visible_left: f64, candles: &[Candle], has_more: bool, is_fetching: bool) -> bool {
        if !has_more || is_fetching {
            return false;
        }
        self.threshold(candles).is_some_and(|threshold| visible_left <= threshold as f64)
    }

    /// Handles one visible-range notification. Returns the fetch to drive
    /// when the edge is near; `None` otherwise.
    pub fn on_visible_range_change<F>(&self, visible_left: f64, source: &InfiniteCandleSource<F>) -> Option<FetchTask>
    where
        F: PageFetcher + 'static,
    {
        let near = source.with_candles(|candles| {
            self.should_load_more(visible_left, candles, source.has_more(), source.is_fetching())
        });
        if !near {
            return None;
        }
        log_debug!(
            LogComponent::Application("EdgeTrigger"),
            "Near left edge at {} → load more",
            visible_left
        );
        Some(source.load_more())
    }
}

use crate::domain::logging::{LogEntry, LogLevel, Logger, TimeProvider};
use chrono::DateTime;

/// Logger writing to the browser console
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    /// Debug output when `verbose`, info otherwise.
    pub fn for_verbosity(verbose: bool) -> Self {
        Self::new(if verbose { LogLevel::Debug } else { LogLevel::Info })
    }
}

impl Logger for ConsoleLogger {
    fn min_level(&self) -> LogLevel {
        self.min_level
    }

    fn write(&self, entry: &LogEntry) {
        let line = entry.format_line();
        match entry.level {
            LogLevel::Trace | LogLevel::Debug => gloo::console::debug!(line),
            LogLevel::Info => gloo::console::info!(line),
            LogLevel::Warn => gloo::console::warn!(line),
            LogLevel::Error => gloo::console::error!(line),
        }
    }
}

/// Wall clock backed by `Date.now()`
#[derive(Default)]
pub struct BrowserTimeProvider;

impl BrowserTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for BrowserTimeProvider {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }

    fn format_ms(&self, ms: u64) -> String {
        i64::try_from(ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .map(|dt| dt.format("%H:%M:%S%.3f").to_string())
            .unwrap_or_else(|| ms.to_string())
    }
}

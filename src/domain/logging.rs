//! Process-wide log sink.
//!
//! Call sites go through the `log_*!` macros. Arguments are captured with
//! `format_args!` and only rendered when the installed sink accepts the
//! level, so per-page debug lines cost nothing under the production sink.

use derive_more::Display;
use std::fmt;
use std::sync::OnceLock;
use strum::AsRefStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Layer and unit a record comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LogComponent {
    #[display(fmt = "DOM:{}", _0)]
    Domain(&'static str),
    #[display(fmt = "APP:{}", _0)]
    Application(&'static str),
    #[display(fmt = "INF:{}", _0)]
    Infrastructure(&'static str),
    #[display(fmt = "PRE:{}", _0)]
    Presentation(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Milliseconds from the installed [`TimeProvider`].
    pub timestamp: u64,
    pub level: LogLevel,
    pub component: LogComponent,
    pub message: String,
}

impl LogEntry {
    /// `[time] LEVEL COMPONENT | message`
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {:>5} {} | {}",
            time_provider().format_ms(self.timestamp),
            self.level.as_ref(),
            self.component,
            self.message
        )
    }
}

/// Destination of log records.
pub trait Logger: Send + Sync {
    /// Records below this level are dropped before formatting.
    fn min_level(&self) -> LogLevel {
        LogLevel::Trace
    }

    fn write(&self, entry: &LogEntry);
}

pub trait TimeProvider: Send + Sync {
    fn now_ms(&self) -> u64;
    fn format_ms(&self, ms: u64) -> String;
}

static LOGGER: OnceLock<Box<dyn Logger>> = OnceLock::new();
static TIME_PROVIDER: OnceLock<Box<dyn TimeProvider>> = OnceLock::new();

/// Installs the sink. Returns `false` if one was already installed.
pub fn init_logger(logger: impl Logger + 'static) -> bool {
    LOGGER.set(Box::new(logger)).is_ok()
}

/// Installs the clock. Returns `false` if one was already installed.
pub fn init_time_provider(provider: impl TimeProvider + 'static) -> bool {
    TIME_PROVIDER.set(Box::new(provider)).is_ok()
}

/// Installed sink, or one that discards everything.
pub fn logger() -> &'static dyn Logger {
    LOGGER.get().map(|sink| &**sink).unwrap_or(&Discard)
}

/// Installed clock, or a counter until one is installed.
pub fn time_provider() -> &'static dyn TimeProvider {
    TIME_PROVIDER.get().map(|clock| &**clock).unwrap_or(&Sequence)
}

/// Writes one record to `sink` if it accepts `level`.
pub fn log_to(sink: &dyn Logger, level: LogLevel, component: LogComponent, args: fmt::Arguments<'_>) {
    if level < sink.min_level() {
        return;
    }
    sink.write(&LogEntry { timestamp: time_provider().now_ms(), level, component, message: args.to_string() });
}

/// Writes one record to the installed sink.
pub fn log(level: LogLevel, component: LogComponent, args: fmt::Arguments<'_>) {
    log_to(logger(), level, component, args);
}

struct Discard;

impl Logger for Discard {
    fn min_level(&self) -> LogLevel {
        LogLevel::Error
    }

    fn write(&self, _entry: &LogEntry) {}
}

struct Sequence;

impl TimeProvider for Sequence {
    fn now_ms(&self) -> u64 {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NEXT.fetch_add(1, Ordering::Relaxed)
    }

    fn format_ms(&self, ms: u64) -> String {
        format!("{:06}", ms)
    }
}

#[macro_export]
macro_rules! log_at {
    ($level:ident, $component:expr, $($arg:tt)*) => {
        $crate::domain::logging::log(
            $crate::domain::logging::LogLevel::$level,
            $component,
            format_args!($($arg)*),
        )
    };
}

/// Debug builds only.
#[macro_export]
macro_rules! log_trace {
    ($component:expr, $($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::log_at!(Trace, $component, $($arg)*);
        }
    };
}

/// Debug builds only.
#[macro_export]
macro_rules! log_debug {
    ($component:expr, $($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::log_at!(Debug, $component, $($arg)*);
        }
    };
}

/// Debug builds only.
#[macro_export]
macro_rules! log_info {
    ($component:expr, $($arg:tt)*) => {
        #[cfg(debug_assertions)]
        {
            $crate::log_at!(Info, $component, $($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_warn {
    ($component:expr, $($arg:tt)*) => {
        $crate::log_at!(Warn, $component, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($component:expr, $($arg:tt)*) => {
        $crate::log_at!(Error, $component, $($arg)*)
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::Mutex;

    struct Capture {
        min: LogLevel,
        entries: Mutex<Vec<LogEntry>>,
    }

    impl Capture {
        fn new(min: LogLevel) -> Self {
            Self { min, entries: Mutex::new(Vec::new()) }
        }

        fn messages(&self) -> Vec<String> {
            self.entries.lock().unwrap().iter().map(|e| e.message.clone()).collect()
        }
    }

    impl Logger for Capture {
        fn min_level(&self) -> LogLevel {
            self.min
        }

        fn write(&self, entry: &LogEntry) {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }

    struct Counted<'a>(&'a Cell<u32>);

    impl fmt::Display for Counted<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.set(self.0.get() + 1);
            f.write_str("bars")
        }
    }

    #[test]
    fn line_layout() {
        let entry = LogEntry {
            timestamp: 42,
            level: LogLevel::Info,
            component: LogComponent::Application("CandleSource"),
            message: "page applied".into(),
        };
        assert_eq!(entry.format_line(), "[000042]  INFO APP:CandleSource | page applied");

        let entry = LogEntry { level: LogLevel::Error, ..entry };
        assert_eq!(entry.format_line(), "[000042] ERROR APP:CandleSource | page applied");
    }

    #[test]
    fn records_below_sink_level_are_not_formatted() {
        let sink = Capture::new(LogLevel::Info);
        let formatted = Cell::new(0);
        let component = LogComponent::Infrastructure("HTTP");

        log_to(&sink, LogLevel::Debug, component, format_args!("{}", Counted(&formatted)));
        assert_eq!(formatted.get(), 0);

        log_to(&sink, LogLevel::Warn, component, format_args!("3 {}", Counted(&formatted)));
        assert_eq!(formatted.get(), 1);
        assert_eq!(sink.messages(), vec!["3 bars"]);
        assert_eq!(sink.entries.lock().unwrap()[0].level, LogLevel::Warn);
    }

    #[test]
    fn discard_sink_is_the_default() {
        assert_eq!(logger().min_level(), LogLevel::Error);
    }
}

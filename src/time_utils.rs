use chrono::{DateTime, Utc};

/// Chart widgets take UTC seconds; bars carry milliseconds.
pub fn ms_to_chart_seconds(ms: i64) -> f64 {
    ms as f64 / 1000.0
}

/// Whether a timeframe label (`1m`, `4h`, `1d`, `1w`, `1M`) is below one day.
pub fn is_intraday(timeframe: &str) -> bool {
    timeframe.ends_with(['s', 'm', 'h'])
}

/// Format a bar time for labels using UTC components.
///
/// - intraday timeframes -> `DD.MM HH:MM`
/// - daily and above -> `DD.MM.YYYY`
pub fn format_bar_time(ms: i64, timeframe: &str) -> String {
    let Some(time) = DateTime::<Utc>::from_timestamp_millis(ms) else {
        return ms.to_string();
    };
    if is_intraday(timeframe) {
        time.format("%d.%m %H:%M").to_string()
    } else {
        time.format("%d.%m.%Y").to_string()
    }
}

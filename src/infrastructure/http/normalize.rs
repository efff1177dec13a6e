//! Response normalization for `GET /candles`.
//!
//! The backend is loose about shape and field names. Everything permissive
//! lives here; what leaves this module is a sanitized [`CandlePage`].

use crate::domain::{
    errors::{AppError, AppResult},
    logging::LogComponent,
    market_data::{Candle, CandlePage, OHLCV, Price, Timestamp, Volume},
};
use crate::log_debug;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Accepted top-level shapes. Anything else is a decode error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CandleEnvelope {
    Bare(Vec<Value>),
    Candles { candles: Vec<Value> },
    Rows { rows: Vec<Value> },
}

impl CandleEnvelope {
    fn into_rows(self) -> Vec<Value> {
        match self {
            CandleEnvelope::Bare(rows) | CandleEnvelope::Candles { candles: rows } | CandleEnvelope::Rows { rows } => rows,
        }
    }
}

const TIME_FIELDS: [&str; 3] = ["timestamp", "time", "ts"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parses a raw response body.
pub fn normalize_body(body: &str) -> AppResult<CandlePage> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| AppError::DecodeError(format!("response is not JSON: {}", e)))?;
    normalize_value(value)
}

/// Turns a decoded response into an ascending, de-duplicated page.
pub fn normalize_value(value: Value) -> AppResult<CandlePage> {
    let rows = serde_json::from_value::<CandleEnvelope>(value)
        .map_err(|_| {
            AppError::DecodeError("expected an array, {candles: [...]} or {rows: [...]}".to_string())
        })?
        .into_rows();

    let total = rows.len();
    let mut candles: Vec<Candle> = rows.iter().filter_map(parse_row).collect();
    let dropped = total - candles.len();

    candles.sort_by_key(|c| c.timestamp);
    candles.dedup_by_key(|c| c.timestamp);

    let inconsistent = candles.iter().filter(|c| !c.ohlcv.is_valid()).count();
    log_debug!(
        LogComponent::Infrastructure("Normalize"),
        "{} rows → {} candles ({} dropped, {} with inconsistent OHLC)",
        total,
        candles.len(),
        dropped,
        inconsistent
    );

    Ok(CandlePage::from_candles(candles))
}

fn parse_row(row: &Value) -> Option<Candle> {
    let fields = row.as_object()?;
    let time = TIME_FIELDS
        .iter()
        .filter_map(|name| fields.get(*name))
        .find(|v| !v.is_null())?;
    let timestamp = parse_time(time)?;

    let ohlcv = OHLCV::new(
        Price::from(number_field(fields, "open")?),
        Price::from(number_field(fields, "high")?),
        Price::from(number_field(fields, "low")?),
        Price::from(number_field(fields, "close")?),
        Volume::from(number_field(fields, "volume")?),
    );
    Some(Candle::new(Timestamp::from_millis(timestamp), ohlcv))
}

fn number_field(fields: &Map<String, Value>, name: &str) -> Option<f64> {
    parse_number(fields.get(name)?)
}

/// Finite number from a JSON number or a numeric string.
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Milliseconds from a number, a digit string or an ISO-8601 string.
///
/// Strings without an offset are read as UTC.
pub fn parse_time(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => parse_time_str(s.trim()),
        _ => None,
    }
}

fn parse_time_str(s: &str) -> Option<i64> {
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse().ok();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn time_parsing_variants() {
        assert_eq!(parse_time(&json!(1_700_000_000_000_i64)), Some(1_700_000_000_000));
        assert_eq!(parse_time(&json!("1700000000000")), Some(1_700_000_000_000));
        assert_eq!(parse_time(&json!("2024-01-01T00:00:00Z")), Some(1_704_067_200_000));
        assert_eq!(parse_time(&json!("2024-01-01T01:00:00+01:00")), Some(1_704_067_200_000));
        assert_eq!(parse_time(&json!("2024-01-01T00:00:00.500")), Some(1_704_067_200_500));
        assert_eq!(parse_time(&json!("2024-01-01")), Some(1_704_067_200_000));
        assert_eq!(parse_time(&json!("yesterday")), None);
        assert_eq!(parse_time(&json!(true)), None);
    }

    #[test]
    fn numbers_from_strings() {
        assert_eq!(parse_number(&json!("42.5")), Some(42.5));
        assert_eq!(parse_number(&json!(" 7 ")), Some(7.0));
        assert_eq!(parse_number(&json!("NaN")), None);
        assert_eq!(parse_number(&json!("inf")), None);
        assert_eq!(parse_number(&json!(null)), None);
    }
}

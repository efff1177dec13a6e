//! Shape handling for the metadata endpoints (`/exchanges`, `/timeframes`, `/symbols`).

use crate::domain::market_data::{MarketType, SymbolRow};
use serde_json::Value;

/// Page size used when listing symbols.
pub const SYMBOLS_LIMIT: u32 = 1000;

/// `["binance", ...]` or `[{ "code": "binance", ... }, ...]`.
pub fn parse_exchanges(data: &Value) -> Vec<String> {
    let Some(items) = data.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(code) => Some(code.clone()),
            Value::Object(fields) => fields.get("code").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .collect()
}

pub fn parse_timeframes(data: &Value) -> Vec<String> {
    data.as_array()
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

/// `{ "items": [...] }` or a bare array of names. Rows take exchange and
/// market type from the request and their position as id.
pub fn parse_symbols(data: &Value, exchange: &str, market_type: MarketType) -> Vec<SymbolRow> {
    let items = data.get("items").unwrap_or(data);
    let Some(items) = items.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(name.as_str()),
            Value::Object(fields) => fields.get("name").and_then(Value::as_str),
            _ => None,
        })
        .enumerate()
        .map(|(id, name)| SymbolRow {
            id: id as u32,
            name: name.to_string(),
            market_type: market_type.to_string(),
            exchange: exchange.to_string(),
        })
        .collect()
}

use crate::domain::errors::AppError;
use crate::domain::market_data::{CandlePage, PageRequest};

/// Source of candle pages.
///
/// Implementations return candles ascending and sanitized, with page bounds
/// derived from them. An empty page means nothing older exists.
#[allow(async_fn_in_trait)]
pub trait PageFetcher {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CandlePage, AppError>;
}

/// Opaque key-value store for user preferences
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
}

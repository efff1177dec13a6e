pub mod meta;
pub mod normalize;

use crate::config::ApiConfig;
use crate::domain::{
    errors::{AppError, AppResult},
    logging::LogComponent,
    market_data::{CandlePage, MarketType, PageFetcher, PageRequest, SymbolRow},
};
use crate::{log_debug, log_error, log_warn};
use futures::future::{self, Either};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use std::future::Future;
use std::time::Duration;

/// HTTP client for the candle backend
#[derive(Debug, Clone)]
pub struct CandlesApiClient {
    base_url: String,
    timeout_ms: u32,
}

impl Default for CandlesApiClient {
    fn default() -> Self {
        Self::new(&ApiConfig::default())
    }
}

impl CandlesApiClient {
    pub fn new(config: &ApiConfig) -> Self {
        Self { base_url: config.base_url.trim_end_matches('/').to_string(), timeout_ms: config.timeout_ms }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /candles` URL for one page request.
    pub fn candles_url(&self, request: &PageRequest) -> String {
        let key = &request.key;
        let mut params = vec![
            ("exchange", key.exchange.clone()),
            ("marketType", key.market_type.to_string()),
            ("symbol", key.symbol.to_string()),
            ("timeframe", key.timeframe.to_string()),
            ("limit", request.limit.to_string()),
        ];
        if let Some(to) = request.to {
            params.push(("to", to.value().to_string()));
        }
        if request.is_unbounded() {
            params.push(("includePartialLatest", request.include_partial_latest.to_string()));
        }
        HttpUtils::build_url(&self.base_url, "/candles", &params)
    }

    /// `GET /symbols` URL for one exchange and market type.
    pub fn symbols_url(&self, exchange: &str, market_type: MarketType, query: Option<&str>) -> String {
        let mut params = vec![("exchange", exchange.to_string()), ("marketType", market_type.to_string())];
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }
        params.push(("limit", meta::SYMBOLS_LIMIT.to_string()));
        params.push(("offset", "0".to_string()));
        HttpUtils::build_url(&self.base_url, "/symbols", &params)
    }

    pub async fn fetch_exchanges(&self) -> AppResult<Vec<String>> {
        let url = HttpUtils::build_url(&self.base_url, "/exchanges", &[]);
        let body = self.get_text(&url).await?;
        Ok(meta::parse_exchanges(&decode_json(&body)?))
    }

    pub async fn fetch_timeframes(&self) -> AppResult<Vec<String>> {
        let url = HttpUtils::build_url(&self.base_url, "/timeframes", &[]);
        let body = self.get_text(&url).await?;
        Ok(meta::parse_timeframes(&decode_json(&body)?))
    }

    pub async fn fetch_symbols(
        &self,
        exchange: &str,
        market_type: MarketType,
        query: Option<&str>,
    ) -> AppResult<Vec<SymbolRow>> {
        let url = self.symbols_url(exchange, market_type, query);
        let body = self.get_text(&url).await?;
        Ok(meta::parse_symbols(&decode_json(&body)?, exchange, market_type))
    }

    async fn get_text(&self, url: &str) -> AppResult<String> {
        log_debug!(LogComponent::Infrastructure("HTTP"), "🌐 GET: {}", url);

        let exchange = async {
            let response = Request::get(url)
                .header("Accept", "application/json")
                .send()
                .await
                .map_err(|e| AppError::NetworkError(format!("Request failed: {}", e)))?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| AppError::NetworkError(format!("Failed to read response: {}", e)))?;
            if !HttpUtils::is_success_status(status) {
                return Err(AppError::HttpStatus(status, HttpUtils::error_message(&text, response.status_text())));
            }
            Ok::<_, AppError>(text)
        };

        let result = with_timeout(exchange, self.timeout_ms).await.and_then(|r| r);
        match &result {
            Ok(text) => {
                log_debug!(LogComponent::Infrastructure("HTTP"), "✅ GET response: {} bytes", text.len());
            }
            Err(e) => log_error!(LogComponent::Infrastructure("HTTP"), "✖ {}: {}", url, e),
        }
        result
    }
}

impl PageFetcher for CandlesApiClient {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CandlePage, AppError> {
        let url = self.candles_url(request);
        let body = self.get_text(&url).await?;
        normalize::normalize_body(&body)
    }
}

fn decode_json(body: &str) -> AppResult<serde_json::Value> {
    serde_json::from_str(body).map_err(|e| AppError::DecodeError(format!("response is not JSON: {}", e)))
}

/// Races `fut` against a browser timer.
async fn with_timeout<T>(fut: impl Future<Output = T>, timeout_ms: u32) -> AppResult<T> {
    match future::select(Box::pin(fut), Box::pin(TimeoutFuture::new(timeout_ms))).await {
        Either::Left((value, _)) => Ok(value),
        Either::Right(_) => Err(AppError::TimeoutError(timeout_ms)),
    }
}

/// Retries retryable failures of the wrapped fetcher with a fixed delay.
#[derive(Debug, Clone)]
pub struct RetryingFetcher<F> {
    inner: F,
    retries: u32,
    delay_ms: u32,
}

impl<F> RetryingFetcher<F> {
    pub fn new(inner: F, retries: u32, delay_ms: u32) -> Self {
        Self { inner, retries, delay_ms }
    }

    pub fn from_config(inner: F, config: &ApiConfig) -> Self {
        Self::new(inner, config.retries, config.retry_delay_ms)
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }
}

impl<F: PageFetcher> PageFetcher for RetryingFetcher<F> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<CandlePage, AppError> {
        let mut attempt = 0;
        loop {
            match self.inner.fetch_page(request).await {
                Err(e) if e.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    log_warn!(
                        LogComponent::Infrastructure("Retry"),
                        "Attempt {}/{} for {} failed: {}",
                        attempt,
                        self.retries,
                        request.key,
                        e
                    );
                    if self.delay_ms > 0 {
                        gloo_timers::future::sleep(Duration::from_millis(u64::from(self.delay_ms))).await;
                    }
                }
                result => return result,
            }
        }
    }
}

/// HTTP helpers
pub struct HttpUtils;

impl HttpUtils {
    pub fn is_success_status(status: u16) -> bool {
        (200..300).contains(&status)
    }

    /// `base + path` followed by the encoded query, in the given order.
    pub fn build_url(base_url: &str, path: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'));
        if params.is_empty() {
            return url;
        }

        let query: Vec<String> = params
            .iter()
            .map(|(key, value)| format!("{}={}", Self::url_encode(key), Self::url_encode(value)))
            .collect();
        url.push('?');
        url.push_str(&query.join("&"));
        url
    }

    /// Percent-encodes everything except RFC 3986 unreserved characters.
    pub fn url_encode(input: &str) -> String {
        let mut out = String::with_capacity(input.len());
        for byte in input.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
                _ => out.push_str(&format!("%{:02X}", byte)),
            }
        }
        out
    }

    /// The backend's `message` field when the error body carries one.
    pub fn error_message(body: &str, status_text: String) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(status_text)
    }
}

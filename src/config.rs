//! Runtime configuration and the defaults it falls back to.

use crate::domain::errors::{AppError, AppResult};
use crate::domain::market_data::MergePolicy;
use serde::{Deserialize, Serialize};

/// Bars requested per page.
pub const PAGE_SIZE: u32 = 5000;
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000";
/// Ask for the still-forming latest bar on unbounded requests.
pub const DEFAULT_INCLUDE_PARTIAL_LATEST: bool = true;
pub const REQUEST_TIMEOUT_MS: u32 = 12_000;
pub const FETCH_RETRIES: u32 = 2;
pub const RETRY_DELAY_MS: u32 = 500;
/// Bars of look-ahead before the oldest loaded bar triggers the next page.
pub const EDGE_LOOKAHEAD_BARS: u32 = 10;
/// Step assumed when fewer than two bars are loaded, in chart time units.
pub const DEFAULT_EDGE_STEP: i64 = 60;
pub const SELECTION_STORAGE_KEY: &str = "selection-store";

/// Unit of the time axis reported by the chart widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChartTimeUnit {
    #[default]
    Seconds,
    Milliseconds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_ms: u32,
    pub retries: u32,
    pub retry_delay_ms: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: REQUEST_TIMEOUT_MS,
            retries: FETCH_RETRIES,
            retry_delay_ms: RETRY_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceConfig {
    pub page_size: u32,
    pub include_partial_latest: bool,
    pub merge_policy: MergePolicy,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            include_partial_latest: DEFAULT_INCLUDE_PARTIAL_LATEST,
            merge_policy: MergePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeConfig {
    pub lookahead_bars: u32,
    pub default_step: i64,
    pub time_unit: ChartTimeUnit,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            lookahead_bars: EDGE_LOOKAHEAD_BARS,
            default_step: DEFAULT_EDGE_STEP,
            time_unit: ChartTimeUnit::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub source: SourceConfig,
    pub edge: EdgeConfig,
    pub verbose_logging: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            source: SourceConfig::default(),
            edge: EdgeConfig::default(),
            verbose_logging: true,
        }
    }
}

impl AppConfig {
    /// Parses a possibly partial JSON object over the defaults and validates it.
    pub fn from_json(json: &str) -> AppResult<Self> {
        let config: AppConfig = serde_json::from_str(json)
            .map_err(|e| AppError::ConfigurationError(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(AppError::ConfigurationError("api.baseUrl must not be empty".into()));
        }
        if self.api.timeout_ms == 0 {
            return Err(AppError::ConfigurationError("api.timeoutMs must be positive".into()));
        }
        if self.source.page_size == 0 {
            return Err(AppError::ConfigurationError("source.pageSize must be positive".into()));
        }
        if self.edge.lookahead_bars == 0 {
            return Err(AppError::ConfigurationError("edge.lookaheadBars must be positive".into()));
        }
        if self.edge.default_step <= 0 {
            return Err(AppError::ConfigurationError("edge.defaultStep must be positive".into()));
        }
        Ok(())
    }
}

use derive_more::Display;

/// Application error. Transport failures, undecodable pages and bad
/// configuration all land here; none of them is fatal to the data source.
#[derive(Debug, Clone, PartialEq, Display)]
pub enum AppError {
    #[display(fmt = "Network Error: {}", _0)]
    NetworkError(String),
    #[display(fmt = "HTTP Error: {} - {}", _0, _1)]
    HttpStatus(u16, String),
    #[display(fmt = "Timeout Error: no response within {} ms", _0)]
    TimeoutError(u32),
    #[display(fmt = "Decode Error: {}", _0)]
    DecodeError(String),
    #[display(fmt = "Validation Error: {}", _0)]
    ValidationError(String),
    #[display(fmt = "Configuration Error: {}", _0)]
    ConfigurationError(String),
    #[display(fmt = "Storage Error: {}", _0)]
    StorageError(String),
}

impl AppError {
    /// Whether repeating the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::TimeoutError(_) => true,
            AppError::HttpStatus(status, _) => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

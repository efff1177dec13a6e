pub mod http;
pub mod services;
pub mod storage;

pub use http::{CandlesApiClient, HttpUtils, RetryingFetcher};
pub use services::{BrowserTimeProvider, ConsoleLogger};
pub use storage::{LocalStoragePreferences, MemoryPreferences};

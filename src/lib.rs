use wasm_bindgen::prelude::*;

use crate::domain::logging::LogComponent;

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
pub mod time_utils;

/// Installs the panic hook, console logger and browser clock.
#[wasm_bindgen(start)]
pub fn initialize() {
    console_error_panic_hook::set_once();

    let verbose = config::AppConfig::default().verbose_logging;
    domain::logging::init_logger(infrastructure::services::ConsoleLogger::for_verbosity(verbose));
    domain::logging::init_time_provider(infrastructure::services::BrowserTimeProvider::new());

    log_info!(LogComponent::Presentation("Initialize"), "🚀 Candle viewer initialized");
}

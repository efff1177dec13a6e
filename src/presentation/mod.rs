pub mod chart_mapping;
pub mod wasm_api;

pub use chart_mapping::*;
pub use wasm_api::*;

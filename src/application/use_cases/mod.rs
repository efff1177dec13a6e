pub mod infinite_candle_source;

pub use infinite_candle_source::*;

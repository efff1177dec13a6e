pub mod edge_trigger;
pub mod use_cases;

pub use edge_trigger::*;
pub use use_cases::*;

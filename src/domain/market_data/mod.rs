//! Market data aggregate: candles, pages, the page chain and the services
//! that walk it backwards in time.

pub mod entities;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use repositories::*;
pub use services::*;
pub use value_objects::*;

//! STOCKROOM Core — domain models, repository traits, and the product
//! lifecycle state machine.

pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod repository;

pub use error::{StockroomError, StockroomResult};
pub use lifecycle::ProductLifecycle;

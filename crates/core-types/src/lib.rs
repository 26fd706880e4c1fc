// In crates/core-types/src/lib.rs

pub mod error;
pub mod types;
pub mod window;

// Re-export the most important types for easy access from other crates.
pub use error::{Error, Result};
pub use types::{MatchedTrade, MatchedTradeSet, TickObservation};
pub use window::MatchWindow;

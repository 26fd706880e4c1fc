// In crates/analytics/src/lib.rs

pub mod engine;
pub mod fees;
pub mod types;

pub use engine::AnalyticsEngine;
pub use fees::FeeSchedule;
pub use types::{AnalysisReport, ExcludedTrade, PartitionAnalysis, TradeMetrics};

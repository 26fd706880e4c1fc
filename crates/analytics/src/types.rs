// In crates/analytics/src/types.rs

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::*;
use serde::Serialize;
use std::fmt;

/// Derived figures for one matched trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeMetrics {
    pub entry_time: NaiveDateTime,
    /// Index points gained by the position: entry price minus exit price.
    pub reward: Decimal,
    pub relative_reward: Decimal,
    /// Fees and tax for both legs, in currency.
    pub cost: Decimal,
    /// Currency profit after costs.
    pub profit: Decimal,
    pub is_win: bool,
}

/// A trade left out of the aggregates because its metrics could not be computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExcludedTrade {
    pub entry_time: NaiveDateTime,
    pub reason: String,
}

/// Aggregate statistics over one set of trades.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub name: String,
    pub total_trades: usize,
    /// Fraction of trades with a positive reward, in `[0, 1]`.
    pub win_rate: f64,
    pub avg_reward: Decimal,
    pub avg_relative_reward: Decimal,
    pub best_trade: Decimal,
    pub worst_trade: Decimal,
    pub total_profit: Decimal,
    /// Running sum of profit in chronological order, in index-point-equivalent units.
    pub cumulative_profit: Vec<Decimal>,
    pub monetary_unit: String,
}

impl AnalysisReport {
    /// The cumulative profit curve as plain floats, for rendering.
    pub fn cumulative_profit_series(&self) -> Vec<f64> {
        self.cumulative_profit
            .iter()
            .map(|p| p.to_f64().unwrap_or(0.0))
            .collect()
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.name)?;
        writeln!(f, "  Total trades:          {}", self.total_trades)?;
        writeln!(f, "  Win rate:              {:.4}", self.win_rate)?;
        writeln!(f, "  Avg reward:            {}", self.avg_reward.round_dp(2))?;
        writeln!(f, "  Avg relative reward:   {}", self.avg_relative_reward.round_dp(2))?;
        writeln!(f, "  Best trade:            {}", self.best_trade)?;
        writeln!(f, "  Worst trade:           {}", self.worst_trade.round_dp(2))?;
        write!(
            f,
            "  Total profit:          {} {}",
            self.total_profit.trunc(),
            self.monetary_unit
        )
    }
}

/// Everything the analyzer derived for one partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionAnalysis {
    pub metrics: Vec<TradeMetrics>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub excluded: Vec<ExcludedTrade>,
    pub report: AnalysisReport,
}

// In crates/analytics/src/engine.rs

use crate::fees::FeeSchedule;
use crate::types::{AnalysisReport, ExcludedTrade, PartitionAnalysis, TradeMetrics};
use core_types::{Error, MatchedTrade, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// The engine responsible for turning matched trades into per-trade metrics and a report.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    fees: FeeSchedule,
    /// Contracts traded on each leg.
    contracts: u32,
}

impl Default for AnalyticsEngine {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            contracts: 1,
        }
    }
}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fees(fees: FeeSchedule, contracts: u32) -> Self {
        Self { fees, contracts }
    }

    pub fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Computes reward, cost and profit for a single trade.
    pub fn trade_metrics(&self, trade: &MatchedTrade) -> Result<TradeMetrics> {
        if trade.entry_price <= Decimal::ZERO || trade.exit_price <= Decimal::ZERO {
            return Err(Error::Computation {
                entry_time: trade.entry_time,
                reason: format!(
                    "non-positive price (entry {}, exit {})",
                    trade.entry_price, trade.exit_price
                ),
            });
        }

        let reward = trade.entry_price - trade.exit_price;
        let relative_reward = reward.checked_div(trade.entry_price).ok_or_else(|| {
            Error::Computation {
                entry_time: trade.entry_time,
                reason: "relative reward overflowed".to_string(),
            }
        })?;
        let overflow = || Error::Computation {
            entry_time: trade.entry_time,
            reason: "cost or profit overflowed".to_string(),
        };
        let cost = self
            .fees
            .round_trip_cost(trade.entry_price, trade.exit_price, self.contracts)
            .ok_or_else(overflow)?;
        let profit = reward
            .checked_mul(self.fees.contract_multiplier)
            .and_then(|v| v.checked_mul(Decimal::from(self.contracts)))
            .and_then(|v| v.checked_sub(cost))
            .ok_or_else(overflow)?;

        Ok(TradeMetrics {
            entry_time: trade.entry_time,
            reward,
            relative_reward,
            cost,
            profit,
            is_win: reward > dec!(0),
        })
    }

    /// Analyzes one set of trades (a full set or a partition of it) under `name`.
    ///
    /// Trades whose metrics cannot be computed are excluded from the aggregates and listed
    /// in the result. A set with no usable trades yields `Error::EmptySet`.
    pub fn analyze(&self, name: &str, trades: &[MatchedTrade]) -> Result<PartitionAnalysis> {
        let mut metrics = Vec::with_capacity(trades.len());
        let mut excluded = Vec::new();
        let mut totals = Totals::default();

        for trade in trades {
            let accepted = self
                .trade_metrics(trade)
                .and_then(|m| totals.add(&m).map(|()| m));
            match accepted {
                Ok(m) => metrics.push(m),
                Err(e) => {
                    tracing::warn!(partition = name, error = %e, "Trade excluded from analysis.");
                    excluded.push(ExcludedTrade {
                        entry_time: trade.entry_time,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if metrics.is_empty() {
            return Err(Error::EmptySet(name.to_string()));
        }

        let report = self.report(name, &metrics, &totals);
        tracing::debug!(
            partition = name,
            trades = report.total_trades,
            excluded = excluded.len(),
            "Partition analyzed."
        );

        Ok(PartitionAnalysis {
            metrics,
            excluded,
            report,
        })
    }

    // Callers guarantee `metrics` is non-empty and that `totals` was accumulated over it.
    fn report(&self, name: &str, metrics: &[TradeMetrics], totals: &Totals) -> AnalysisReport {
        let count = Decimal::from(metrics.len());
        let wins = metrics.iter().filter(|m| m.is_win).count();

        let best_trade = metrics.iter().map(|m| m.reward).max().unwrap_or_default();
        let worst_trade = metrics.iter().map(|m| m.reward).min().unwrap_or_default();

        // Every prefix sum was bounded by `Totals::add`.
        let mut running = Decimal::ZERO;
        let cumulative_profit = metrics
            .iter()
            .map(|m| {
                running += m.profit;
                running / self.fees.contract_multiplier
            })
            .collect();

        AnalysisReport {
            name: name.to_string(),
            total_trades: metrics.len(),
            win_rate: wins as f64 / metrics.len() as f64,
            avg_reward: totals.reward / count,
            avg_relative_reward: totals.relative_reward / count,
            best_trade,
            worst_trade,
            total_profit: totals.profit,
            cumulative_profit,
            monetary_unit: "VND".to_string(),
        }
    }
}

/// Running sums over the accepted trades of a partition.
#[derive(Debug, Default)]
struct Totals {
    reward: Decimal,
    relative_reward: Decimal,
    profit: Decimal,
}

impl Totals {
    /// Adds one trade, or leaves the sums untouched if any of them would overflow.
    fn add(&mut self, m: &TradeMetrics) -> Result<()> {
        let overflow = || Error::Computation {
            entry_time: m.entry_time,
            reason: "partition totals overflowed".to_string(),
        };
        let reward = self.reward.checked_add(m.reward).ok_or_else(overflow)?;
        let relative_reward = self
            .relative_reward
            .checked_add(m.relative_reward)
            .ok_or_else(overflow)?;
        let profit = self.profit.checked_add(m.profit).ok_or_else(overflow)?;
        *self = Totals {
            reward,
            relative_reward,
            profit,
        };
        Ok(())
    }
}

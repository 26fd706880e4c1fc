// In crates/core-types/src/types.rs

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A single matched price for the traded instrument at one moment (exchange local time).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickObservation {
    pub timestamp: NaiveDateTime,
    pub price: Decimal,
}

impl TickObservation {
    pub fn new(timestamp: NaiveDateTime, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// One trading day's paired entry and exit observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedTrade {
    pub entry_time: NaiveDateTime,
    pub entry_price: Decimal,
    pub exit_time: NaiveDateTime,
    pub exit_price: Decimal,
    /// Set by the maturity classifier; `false` until the trade has been tagged.
    #[serde(default)]
    pub is_maturity_week: bool,
}

impl MatchedTrade {
    /// Builds an untagged trade, enforcing that entry precedes exit on the same calendar day.
    pub fn new(entry: TickObservation, exit: TickObservation) -> Result<Self> {
        if entry.timestamp >= exit.timestamp {
            return Err(Error::InvalidTrade(format!(
                "entry {} is not before exit {}",
                entry.timestamp, exit.timestamp
            )));
        }
        if entry.timestamp.date() != exit.timestamp.date() {
            return Err(Error::InvalidTrade(format!(
                "entry {} and exit {} fall on different days",
                entry.timestamp, exit.timestamp
            )));
        }
        Ok(Self {
            entry_time: entry.timestamp,
            entry_price: entry.price,
            exit_time: exit.timestamp,
            exit_price: exit.price,
            is_maturity_week: false,
        })
    }
}

/// Chronologically ordered matched trades, at most one per trading day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchedTradeSet {
    trades: Vec<MatchedTrade>,
}

impl MatchedTradeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a trade. Callers push in day order; insertion order is the set's chronology.
    pub fn push(&mut self, trade: MatchedTrade) {
        self.trades.push(trade);
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn trades(&self) -> &[MatchedTrade] {
        &self.trades
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MatchedTrade> {
        self.trades.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, MatchedTrade> {
        self.trades.iter_mut()
    }

    /// The maturity-week view (`true`) or its complement (`false`), in the same order.
    pub fn subset(&self, maturity: bool) -> MatchedTradeSet {
        self.trades
            .iter()
            .filter(|t| t.is_maturity_week == maturity)
            .cloned()
            .collect()
    }
}

impl FromIterator<MatchedTrade> for MatchedTradeSet {
    fn from_iter<I: IntoIterator<Item = MatchedTrade>>(iter: I) -> Self {
        Self {
            trades: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<MatchedTrade>> for MatchedTradeSet {
    fn from(trades: Vec<MatchedTrade>) -> Self {
        Self { trades }
    }
}

impl IntoIterator for MatchedTradeSet {
    type Item = MatchedTrade;
    type IntoIter = std::vec::IntoIter<MatchedTrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.into_iter()
    }
}

impl<'a> IntoIterator for &'a MatchedTradeSet {
    type Item = &'a MatchedTrade;
    type IntoIter = std::slice::Iter<'a, MatchedTrade>;

    fn into_iter(self) -> Self::IntoIter {
        self.trades.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_trade_requires_entry_before_exit() {
        let entry = TickObservation::new(at(4, 11, 30), dec!(1200));
        let exit = TickObservation::new(at(4, 9, 0), dec!(1190));
        assert!(matches!(MatchedTrade::new(entry, exit), Err(Error::InvalidTrade(_))));
    }

    #[test]
    fn test_trade_requires_same_day() {
        let entry = TickObservation::new(at(4, 9, 0), dec!(1200));
        let exit = TickObservation::new(at(5, 11, 30), dec!(1190));
        assert!(matches!(MatchedTrade::new(entry, exit), Err(Error::InvalidTrade(_))));
    }

    #[test]
    fn test_subsets_partition_the_set() {
        let mut set = MatchedTradeSet::new();
        for (day, maturity) in [(4, false), (5, true), (6, true), (7, false)] {
            let mut trade = MatchedTrade::new(
                TickObservation::new(at(day, 9, 0), dec!(1200)),
                TickObservation::new(at(day, 11, 30), dec!(1190)),
            )
            .unwrap();
            trade.is_maturity_week = maturity;
            set.push(trade);
        }

        let maturity = set.subset(true);
        let rest = set.subset(false);
        assert_eq!(maturity.len() + rest.len(), set.len());
        assert!(maturity.iter().all(|t| t.is_maturity_week));
        assert_eq!(rest.trades()[0].entry_time, at(4, 9, 0));
        assert_eq!(rest.trades()[1].entry_time, at(7, 9, 0));
    }
}

// In crates/backtester/src/matcher.rs

use chrono::NaiveDate;
use core_types::{MatchWindow, MatchedTrade, MatchedTradeSet, TickObservation};
use rayon::prelude::*;

/// Pairs one entry and one exit observation per calendar day from a tick stream.
#[derive(Debug, Clone, Copy)]
pub struct TradeMatcher {
    window: MatchWindow,
}

impl TradeMatcher {
    pub fn new(window: MatchWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &MatchWindow {
        &self.window
    }

    /// Matches every day of the window against `ticks`, in chronological day order.
    ///
    /// Days share no state, so they are matched in parallel. A day without both an entry
    /// and an exit observation contributes nothing.
    pub fn match_ticks(&self, mut ticks: Vec<TickObservation>) -> MatchedTradeSet {
        ticks.sort_by_key(|t| t.timestamp);
        let days: Vec<NaiveDate> = self.window.days().collect();

        let trades: Vec<MatchedTrade> = days
            .par_iter()
            .filter_map(|day| self.match_day(*day, ticks_on(&ticks, *day)))
            .collect();

        tracing::info!(
            days = days.len(),
            matched = trades.len(),
            "Matched entry and exit observations."
        );
        trades.into()
    }

    /// Matches a single day. `ticks` must be that day's observations in time order.
    pub fn match_day(&self, day: NaiveDate, ticks: &[TickObservation]) -> Option<MatchedTrade> {
        let entry = ticks
            .iter()
            .find(|t| self.window.accepts_entry(t.timestamp))?;
        let exit = ticks
            .iter()
            .find(|t| self.window.accepts_exit(t.timestamp))?;

        match MatchedTrade::new(*entry, *exit) {
            Ok(trade) => Some(trade),
            Err(e) => {
                tracing::warn!(%day, error = %e, "Skipping day with an invalid match.");
                None
            }
        }
    }
}

// `ticks` is sorted by timestamp.
fn ticks_on(ticks: &[TickObservation], day: NaiveDate) -> &[TickObservation] {
    let start = ticks.partition_point(|t| t.timestamp.date() < day);
    let end = ticks.partition_point(|t| t.timestamp.date() <= day);
    &ticks[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, NaiveTime};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        date(d).and_hms_opt(h, m, s).unwrap()
    }

    fn tick(d: u32, h: u32, m: u32, s: u32, price: Decimal) -> TickObservation {
        TickObservation::new(at(d, h, m, s), price)
    }

    fn matcher(first: u32, last: u32) -> TradeMatcher {
        let window = MatchWindow::with_delay_seconds(
            date(first),
            date(last),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(11, 29, 45).unwrap(),
            30,
        )
        .unwrap();
        TradeMatcher::new(window)
    }

    #[test]
    fn test_matches_first_entry_and_first_exit() {
        let ticks = vec![
            tick(1, 8, 59, 59, dec!(1195)),
            tick(1, 9, 0, 0, dec!(1196)),
            tick(1, 9, 0, 3, dec!(1200)),
            tick(1, 9, 0, 7, dec!(1201)),
            tick(1, 11, 29, 40, dec!(1188)),
            tick(1, 13, 0, 2, dec!(1190)),
            tick(1, 14, 45, 0, dec!(1185)),
        ];
        let set = matcher(1, 1).match_ticks(ticks);

        assert_eq!(set.len(), 1);
        let trade = &set.trades()[0];
        assert_eq!(trade.entry_time, at(1, 9, 0, 3));
        assert_eq!(trade.entry_price, dec!(1200));
        assert_eq!(trade.exit_time, at(1, 13, 0, 2));
        assert_eq!(trade.exit_price, dec!(1190));
    }

    #[test]
    fn test_entry_after_delay_is_not_accepted() {
        let ticks = vec![
            tick(1, 9, 0, 30, dec!(1200)),
            tick(1, 9, 5, 0, dec!(1201)),
            tick(1, 13, 0, 0, dec!(1190)),
        ];
        assert!(matcher(1, 1).match_ticks(ticks).is_empty());
    }

    #[test]
    fn test_day_without_exit_is_skipped() {
        let ticks = vec![
            tick(1, 9, 0, 1, dec!(1200)),
            tick(1, 11, 29, 45, dec!(1190)),
            tick(2, 9, 0, 1, dec!(1210)),
            tick(2, 13, 0, 0, dec!(1215)),
        ];
        let set = matcher(1, 2).match_ticks(ticks);

        assert_eq!(set.len(), 1);
        assert_eq!(set.trades()[0].entry_time.date(), date(2));
    }

    #[test]
    fn test_days_outside_range_are_ignored() {
        let ticks = vec![
            tick(1, 9, 0, 1, dec!(1200)),
            tick(1, 13, 0, 0, dec!(1190)),
            tick(5, 9, 0, 1, dec!(1200)),
            tick(5, 13, 0, 0, dec!(1190)),
        ];
        let set = matcher(2, 4).match_ticks(ticks);
        assert!(set.is_empty());
    }

    #[test]
    fn test_unsorted_input_yields_chronological_days() {
        let mut ticks = Vec::new();
        for d in (1..=10).rev() {
            ticks.push(tick(d, 13, 0, 0, dec!(1190)));
            ticks.push(tick(d, 9, 0, 2, dec!(1200)));
            ticks.push(tick(d, 9, 0, 1, dec!(1199)));
        }
        let set = matcher(1, 10).match_ticks(ticks);

        assert_eq!(set.len(), 10);
        for (i, trade) in set.iter().enumerate() {
            assert_eq!(trade.entry_time, at(i as u32 + 1, 9, 0, 1));
            assert!(trade.entry_time < trade.exit_time);
            assert_eq!(trade.entry_time.date(), trade.exit_time.date());
        }
    }

    #[test]
    fn test_at_most_one_trade_per_day() {
        let mut ticks = Vec::new();
        for s in 1..30 {
            ticks.push(tick(3, 9, 0, s, dec!(1200)));
            ticks.push(tick(3, 13, 0, s, dec!(1190)));
        }
        let set = matcher(1, 5).match_ticks(ticks);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_no_ticks_gives_empty_set() {
        assert!(matcher(1, 30).match_ticks(Vec::new()).is_empty());
    }
}

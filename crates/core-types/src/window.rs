// In crates/core-types/src/window.rs

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{Error, Result};

/// The validated matching rule for a fixed-holding-period backtest.
///
/// Entry: earliest observation of the day whose time-of-day is strictly after `start_time`,
/// strictly before `start_time + delay`, and no later than `end_time`.
/// Exit: earliest observation of the day strictly after `end_time`, up to `DAY_END`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    delay: Duration,
}

impl MatchWindow {
    /// Last time-of-day searched for an exit observation.
    pub const DAY_END: NaiveTime = match NaiveTime::from_hms_opt(23, 59, 0) {
        Some(t) => t,
        None => unreachable!(),
    };

    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        delay: Duration,
    ) -> Result<Self> {
        if start_date > end_date {
            return Err(Error::Configuration(format!(
                "start date {start_date} is after end date {end_date}"
            )));
        }
        if start_time >= end_time {
            return Err(Error::Configuration(format!(
                "start time {start_time} must be before end time {end_time}"
            )));
        }
        if delay <= Duration::zero() {
            return Err(Error::Configuration(format!(
                "delay must be positive, got {}s",
                delay.num_seconds()
            )));
        }
        Ok(Self {
            start_date,
            end_date,
            start_time,
            end_time,
            delay,
        })
    }

    pub fn with_delay_seconds(
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        delay_seconds: i64,
    ) -> Result<Self> {
        Self::new(
            start_date,
            end_date,
            start_time,
            end_time,
            Duration::seconds(delay_seconds),
        )
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Every calendar day in the range, inclusive of both ends.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |day| *day <= self.end_date)
    }

    /// `start_time + delay`, or `None` when that wraps past midnight.
    pub fn entry_deadline(&self) -> Option<NaiveTime> {
        let (deadline, wrapped) = self.start_time.overflowing_add_signed(self.delay);
        (wrapped == 0).then_some(deadline)
    }

    pub fn accepts_entry(&self, timestamp: NaiveDateTime) -> bool {
        let tod = timestamp.time();
        tod > self.start_time && tod <= self.end_time && tod - self.start_time < self.delay
    }

    // Not bounded by the entry window: the first print after end_time, not the last one inside it.
    pub fn accepts_exit(&self, timestamp: NaiveDateTime) -> bool {
        let tod = timestamp.time();
        tod > self.end_time && tod <= Self::DAY_END
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn time(h: u32, m: u32, s: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, s).unwrap()
    }

    fn window(delay: i64) -> MatchWindow {
        MatchWindow::with_delay_seconds(date(2), date(5), time(9, 0, 0), time(11, 29, 45), delay)
            .unwrap()
    }

    #[test]
    fn test_rejects_inverted_dates() {
        let result =
            MatchWindow::with_delay_seconds(date(5), date(2), time(9, 0, 0), time(11, 0, 0), 30);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rejects_empty_time_window() {
        let result =
            MatchWindow::with_delay_seconds(date(2), date(5), time(11, 0, 0), time(11, 0, 0), 30);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_rejects_non_positive_delay() {
        for delay in [0, -5] {
            let result = MatchWindow::with_delay_seconds(
                date(2),
                date(5),
                time(9, 0, 0),
                time(11, 0, 0),
                delay,
            );
            assert!(matches!(result, Err(Error::Configuration(_))));
        }
    }

    #[test]
    fn test_days_are_inclusive() {
        let days: Vec<_> = window(30).days().collect();
        assert_eq!(days, vec![date(2), date(3), date(4), date(5)]);
    }

    #[test]
    fn test_entry_bounds_are_strict() {
        let w = window(30);
        let on = |t: NaiveTime| date(2).and_time(t);
        assert!(!w.accepts_entry(on(time(9, 0, 0))));
        assert!(w.accepts_entry(on(time(9, 0, 1))));
        assert!(w.accepts_entry(on(time(9, 0, 29))));
        assert!(!w.accepts_entry(on(time(9, 0, 30))));
    }

    #[test]
    fn test_entry_never_passes_end_time() {
        let w = MatchWindow::with_delay_seconds(
            date(2),
            date(2),
            time(9, 0, 0),
            time(9, 0, 10),
            3600,
        )
        .unwrap();
        assert!(w.accepts_entry(date(2).and_time(time(9, 0, 10))));
        assert!(!w.accepts_entry(date(2).and_time(time(9, 0, 11))));
    }

    #[test]
    fn test_exit_is_after_end_time_until_day_end() {
        let w = window(30);
        let on = |t: NaiveTime| date(2).and_time(t);
        assert!(!w.accepts_exit(on(time(11, 29, 45))));
        assert!(w.accepts_exit(on(time(11, 29, 46))));
        assert!(w.accepts_exit(on(time(14, 45, 0))));
        assert!(w.accepts_exit(on(time(23, 59, 0))));
        assert!(!w.accepts_exit(on(time(23, 59, 1))));
    }

    #[test]
    fn test_entry_deadline_wraps_to_none() {
        assert_eq!(window(30).entry_deadline(), Some(time(9, 0, 30)));
        let late = MatchWindow::with_delay_seconds(
            date(2),
            date(2),
            time(23, 0, 0),
            time(23, 30, 0),
            7200,
        )
        .unwrap();
        assert_eq!(late.entry_deadline(), None);
    }
}

// In crates/backtester/src/maturity.rs

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use core_types::{Error, MatchedTradeSet, Result};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// The Monday..Sunday week containing the third Thursday of `date`'s month, inclusive.
pub fn maturity_week(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first_of_month = date - Duration::days(i64::from(date.day0()));
    let to_thursday = (3 - i64::from(first_of_month.weekday().num_days_from_monday())).rem_euclid(7);
    let third_thursday = first_of_month + Duration::days(to_thursday + 14);
    let monday =
        third_thursday - Duration::days(i64::from(third_thursday.weekday().num_days_from_monday()));
    (monday, monday + Duration::days(6))
}

/// Whether `date` falls in its month's contract-expiry week. Accepts dates and date-times.
pub fn is_maturity_week<D: Datelike>(date: &D) -> bool {
    let Some(day) = NaiveDate::from_ymd_opt(date.year(), date.month(), date.day()) else {
        return false;
    };
    let (monday, sunday) = maturity_week(day);
    monday <= day && day <= sunday
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD HH:MM:SS.ffffff`.
/// A bare date parses to midnight.
pub fn parse_date_input(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(input, DATE_FORMAT)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok_or_else(|| Error::Format {
            input: input.to_string(),
        })
}

pub fn is_maturity_week_str(input: &str) -> Result<bool> {
    parse_date_input(input).map(|dt| is_maturity_week(&dt))
}

/// Tags every trade by the day it was entered.
pub fn tag(trades: &mut MatchedTradeSet) {
    for trade in trades.iter_mut() {
        trade.is_maturity_week = is_maturity_week(&trade.entry_time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_week_when_month_starts_on_monday() {
        // 2024-01-01 is a Monday; third Thursday is the 18th.
        assert_eq!(maturity_week(date(2024, 1, 9)), (date(2024, 1, 15), date(2024, 1, 21)));
    }

    #[test]
    fn test_week_when_month_starts_on_thursday() {
        // 2024-02-01 is a Thursday; third Thursday is the 15th.
        assert_eq!(maturity_week(date(2024, 2, 28)), (date(2024, 2, 12), date(2024, 2, 18)));
    }

    #[test]
    fn test_week_when_month_starts_after_thursday() {
        // 2024-03-01 is a Friday; third Thursday is the 21st.
        assert_eq!(maturity_week(date(2024, 3, 1)), (date(2024, 3, 18), date(2024, 3, 24)));
        // 2024-09-01 is a Sunday; third Thursday is the 19th.
        assert_eq!(maturity_week(date(2024, 9, 30)), (date(2024, 9, 16), date(2024, 9, 22)));
    }

    #[test]
    fn test_week_bounds_are_inclusive() {
        assert!(!is_maturity_week(&date(2024, 3, 17)));
        assert!(is_maturity_week(&date(2024, 3, 18)));
        assert!(is_maturity_week(&date(2024, 3, 21)));
        assert!(is_maturity_week(&date(2024, 3, 24)));
        assert!(!is_maturity_week(&date(2024, 3, 25)));
    }

    #[test]
    fn test_dates_in_same_week_agree() {
        let (monday, _) = maturity_week(date(2024, 6, 1));
        for offset in 0..7 {
            assert!(is_maturity_week(&(monday + Duration::days(offset))));
        }
    }

    #[test]
    fn test_datetime_matches_its_date() {
        let dt = date(2024, 3, 20).and_hms_opt(14, 45, 0).unwrap();
        assert_eq!(is_maturity_week(&dt), is_maturity_week(&dt.date()));
        let late = date(2024, 3, 24).and_hms_opt(23, 59, 59).unwrap();
        assert!(is_maturity_week(&late));
    }

    #[test]
    fn test_string_inputs() {
        assert_eq!(is_maturity_week_str("2024-03-20"), Ok(true));
        assert_eq!(is_maturity_week_str("2024-03-20 09:00:05"), Ok(true));
        assert_eq!(is_maturity_week_str("2024-03-26 09:00:05.123456"), Ok(false));
    }

    #[test]
    fn test_unparseable_input_is_a_format_error() {
        assert_eq!(
            is_maturity_week_str("20/03/2024"),
            Err(Error::Format {
                input: "20/03/2024".to_string()
            })
        );
        assert!(parse_date_input("").is_err());
    }

    #[test]
    fn test_fractional_seconds_are_kept() {
        let dt = parse_date_input("2024-03-20 09:00:05.250").unwrap();
        assert_eq!(dt.and_utc().timestamp_subsec_millis(), 250);
    }
}

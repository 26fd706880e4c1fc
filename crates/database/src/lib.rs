// In crates/database/src/lib.rs

use std::str::FromStr;

use app_config::types::DatabaseSettings;
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use core_types::{MatchWindow, MatchedTrade, MatchedTradeSet, TickObservation};
use rust_decimal::Decimal;
use sqlx::{PgPool, postgres::PgPoolOptions};

pub mod error;

// Re-export the most important types for easy access.
pub use error::{Error, Result};

/// Earliest print of the day inside the entry window and before `start_time + delay`.
/// A NULL deadline means the delay runs past midnight and only the window bounds apply.
const ENTRY_QUERY: &str = r#"
    SELECT m.datetime AS start_time, m.price::numeric AS start_price
    FROM quote.matched m
    JOIN quote.futurecontractcode ft ON m.tickersymbol = ft.tickersymbol
    WHERE ft.futurecode = $1
      AND m.datetime >= $2
      AND m.datetime <= $3
      AND m.datetime::time > $4
      AND ($5::time IS NULL OR m.datetime::time < $5::time)
    ORDER BY m.datetime ASC
    LIMIT 1
"#;

/// Earliest print of the day after the entry window closes, up to the end of the day.
const EXIT_QUERY: &str = r#"
    SELECT m.datetime AS end_time, m.price::numeric AS end_price
    FROM quote.matched m
    JOIN quote.futurecontractcode ft ON m.tickersymbol = ft.tickersymbol
    WHERE ft.futurecode = $1
      AND m.datetime >= $2
      AND m.datetime <= $3
      AND m.datetime::time > $4
    ORDER BY m.datetime ASC
    LIMIT 1
"#;

/// A wrapper around the `sqlx` connection pool, scoped to one futures code.
#[derive(Debug, Clone)]
pub struct Db {
    pool: PgPool,
    future_code: String,
}

/// Establishes a connection pool to the tick database.
///
/// # Arguments
///
/// * `settings`: The database configuration settings.
pub async fn connect(settings: &DatabaseSettings) -> Result<Db> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        // The `?` operator uses the `#[from]` attribute in our error enum
        // to automatically convert the `sqlx::Error` into a `database::Error`.
        .connect(&settings.url)
        .await?;

    Ok(Db {
        pool,
        future_code: settings.future_code.clone(),
    })
}

impl Db {
    pub fn future_code(&self) -> &str {
        &self.future_code
    }

    /// Pairs one entry and one exit print per day of `window`, in day order.
    ///
    /// A day whose queries fail, or that lacks either print, is skipped and the run goes on.
    pub async fn fetch_matched_pairs(&self, window: &MatchWindow) -> Result<MatchedTradeSet> {
        let mut trades = MatchedTradeSet::new();
        let mut failed_days = 0usize;

        for day in window.days() {
            match self.match_day(window, day).await {
                Ok(Some(trade)) => trades.push(trade),
                Ok(None) => tracing::debug!(%day, "No matched pair for day."),
                Err(e) => {
                    failed_days += 1;
                    tracing::warn!(%day, error = %e, "Skipping day after failed query.");
                }
            }
        }

        tracing::info!(
            future_code = %self.future_code,
            matched = trades.len(),
            failed_days,
            "Fetched matched pairs."
        );
        Ok(trades)
    }

    async fn match_day(&self, window: &MatchWindow, day: NaiveDate) -> Result<Option<MatchedTrade>> {
        let entry: Option<(NaiveDateTime, BigDecimal)> = sqlx::query_as(ENTRY_QUERY)
            .bind(&self.future_code)
            .bind(day.and_time(window.start_time()))
            .bind(day.and_time(window.end_time()))
            .bind(window.start_time())
            .bind(window.entry_deadline())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| Error::QueryFailed { day, source })?;

        let Some(entry) = entry else {
            return Ok(None);
        };

        let exit: Option<(NaiveDateTime, BigDecimal)> = sqlx::query_as(EXIT_QUERY)
            .bind(&self.future_code)
            .bind(day.and_time(window.start_time()))
            .bind(day.and_time(MatchWindow::DAY_END))
            .bind(window.end_time())
            .fetch_optional(&self.pool)
            .await
            .map_err(|source| Error::QueryFailed { day, source })?;

        let Some(exit) = exit else {
            return Ok(None);
        };

        let entry = to_tick(entry)?;
        let exit = to_tick(exit)?;
        match MatchedTrade::new(entry, exit) {
            Ok(trade) => Ok(Some(trade)),
            Err(e) => {
                tracing::warn!(%day, error = %e, "Discarding invalid pair.");
                Ok(None)
            }
        }
    }
}

fn to_tick((timestamp, price): (NaiveDateTime, BigDecimal)) -> Result<TickObservation> {
    Ok(TickObservation::new(timestamp, to_decimal(&price)?))
}

fn to_decimal(value: &BigDecimal) -> Result<Decimal> {
    let text = value.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| Error::InvalidPrice(text))
}

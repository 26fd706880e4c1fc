// In crates/database/src/error.rs

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to connect to the database")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Matching query for {day} failed")]
    QueryFailed {
        day: NaiveDate,
        #[source]
        source: sqlx::Error,
    },

    #[error("Price '{0}' does not fit a decimal")]
    InvalidPrice(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// In crates/app-config/src/types.rs

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    pub app: AppSettings,
    /// Settings for the tick database.
    pub database: DatabaseSettings,
    /// The default backtest run.
    pub backtest: BacktestSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    pub environment: String,
    /// The log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseSettings {
    /// The connection URL for the PostgreSQL database.
    pub url: String,
    /// Futures code whose matched prices are backtested.
    #[serde(default = "default_future_code")]
    pub future_code: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// One backtest run: the date range, the daily entry window and the reporting options.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct BacktestSettings {
    /// First trading day, `YYYY-MM-DD`.
    pub start_date: NaiveDate,
    /// Last trading day, inclusive.
    pub end_date: NaiveDate,
    /// Nominal entry time, `HH:MM:SS`.
    pub start_time: NaiveTime,
    /// Close of the entry window; exits are the first print after it.
    pub end_time: NaiveTime,
    /// How long after `start_time` an entry fill is still accepted.
    pub delay_seconds: i64,
    #[serde(default = "default_enabled")]
    pub include_maturity_split: bool,
    #[serde(default = "default_output_directory")]
    pub output_directory: PathBuf,
    #[serde(default = "default_enabled")]
    pub render_charts: bool,
}

/// Helper functions for serde defaults
fn default_log_level() -> String { "info".to_string() }
fn default_future_code() -> String { "VN30F1M".to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_enabled() -> bool { true }
fn default_output_directory() -> PathBuf { PathBuf::from("output") }

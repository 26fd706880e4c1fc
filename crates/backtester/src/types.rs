// In crates/backtester/src/types.rs

use std::path::PathBuf;

use analytics::types::{AnalysisReport, PartitionAnalysis};
use app_config::types::BacktestSettings;
use chrono::NaiveDate;
use core_types::{Error, MatchWindow, MatchedTradeSet};
use serde::{Serialize, Serializer};

use crate::table::RejectedRow;

pub const TOTAL_PARTITION: &str = "Total Analysis";
pub const MATURITY_PARTITION: &str = "Maturity Only";
pub const NON_MATURITY_PARTITION: &str = "Except Maturity";

/// Immutable settings for one backtest run, validated at construction.
#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub window: MatchWindow,
    pub include_maturity_split: bool,
    pub output_directory: PathBuf,
}

impl BacktestConfig {
    pub fn new(window: MatchWindow, include_maturity_split: bool, output_directory: PathBuf) -> Self {
        Self {
            window,
            include_maturity_split,
            output_directory,
        }
    }
}

impl TryFrom<&BacktestSettings> for BacktestConfig {
    type Error = Error;

    fn try_from(settings: &BacktestSettings) -> Result<Self, Self::Error> {
        let window = MatchWindow::with_delay_seconds(
            settings.start_date,
            settings.end_date,
            settings.start_time,
            settings.end_time,
            settings.delay_seconds,
        )?;
        Ok(Self::new(
            window,
            settings.include_maturity_split,
            settings.output_directory.clone(),
        ))
    }
}

/// The analyzer's result for one partition, or why there is nothing to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartitionOutcome {
    Analyzed(PartitionAnalysis),
    NoData {
        name: String,
        #[serde(serialize_with = "serialize_display")]
        error: Error,
    },
}

impl PartitionOutcome {
    pub fn name(&self) -> &str {
        match self {
            PartitionOutcome::Analyzed(analysis) => &analysis.report.name,
            PartitionOutcome::NoData { name, .. } => name,
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            PartitionOutcome::Analyzed(analysis) => Some(&analysis.report),
            PartitionOutcome::NoData { .. } => None,
        }
    }
}

/// All partition results of one run.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedReport {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// The analyzed trades, tagged with their maturity-week flag.
    pub trades: MatchedTradeSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_rows: Vec<RejectedRow>,
    /// Table rows left out because their entry day lies outside the run's date range.
    #[serde(skip_serializing_if = "is_zero")]
    pub out_of_range_rows: usize,
    pub total: PartitionOutcome,
    pub maturity: Option<PartitionOutcome>,
    pub non_maturity: Option<PartitionOutcome>,
}

fn is_zero(count: &usize) -> bool {
    *count == 0
}

impl CombinedReport {
    /// Every partition that was run, total first.
    pub fn partitions(&self) -> impl Iterator<Item = &PartitionOutcome> {
        std::iter::once(&self.total)
            .chain(self.maturity.as_ref())
            .chain(self.non_maturity.as_ref())
    }
}

fn serialize_display<S: Serializer>(error: &Error, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

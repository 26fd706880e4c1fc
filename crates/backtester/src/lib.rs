pub mod matcher;
pub mod maturity;
pub mod sink;
pub mod table;
pub mod types;

use std::path::Path;

use analytics::AnalyticsEngine;
use core_types::{Error, MatchedTrade, MatchedTradeSet};
use tracing::{info, warn};

pub use matcher::TradeMatcher;
pub use sink::ChartSink;
pub use types::{
    BacktestConfig, CombinedReport, MATURITY_PARTITION, NON_MATURITY_PARTITION, PartitionOutcome,
    TOTAL_PARTITION,
};

/// Runs the performance analysis over a matched trade set and its maturity partitions.
pub struct Backtester {
    config: BacktestConfig,
    engine: AnalyticsEngine,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        Self::with_engine(config, AnalyticsEngine::new())
    }

    pub fn with_engine(config: BacktestConfig, engine: AnalyticsEngine) -> Self {
        Self { config, engine }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Tags each trade with its maturity week and analyzes the total set, then, when the
    /// split is enabled, the maturity-week subset and its complement.
    pub fn run(&self, mut trades: MatchedTradeSet) -> CombinedReport {
        maturity::tag(&mut trades);
        info!(trades = trades.len(), "Running backtest analysis.");

        let total = self.analyze(TOTAL_PARTITION, trades.trades());

        let (maturity, non_maturity) = if self.config.include_maturity_split {
            let maturity_set = trades.subset(true);
            let rest = trades.subset(false);
            (
                Some(self.analyze_subset(MATURITY_PARTITION, &maturity_set, &trades)),
                Some(self.analyze_subset(NON_MATURITY_PARTITION, &rest, &trades)),
            )
        } else {
            (None, None)
        };

        CombinedReport {
            start_date: self.config.window.start_date(),
            end_date: self.config.window.end_date(),
            trades,
            rejected_rows: Vec::new(),
            out_of_range_rows: 0,
            total,
            maturity,
            non_maturity,
        }
    }

    /// Loads a persisted matched-pair table and runs on it. Malformed rows are left out
    /// and listed in the report.
    pub fn run_from_table(&self, path: &Path) -> anyhow::Result<CombinedReport> {
        let load = table::read_matched_table(path)?;
        if !load.rejected.is_empty() {
            warn!(
                rejected = load.rejected.len(),
                path = %path.display(),
                "Some table rows were rejected."
            );
        }
        let loaded = load.rows.len();
        let in_range: MatchedTradeSet = load
            .rows
            .into_iter()
            .filter(|t| self.in_date_range(t))
            .collect();
        let out_of_range = loaded - in_range.len();
        if out_of_range > 0 {
            warn!(
                out_of_range,
                start_date = %self.config.window.start_date(),
                end_date = %self.config.window.end_date(),
                "Some table rows fall outside the configured date range."
            );
        }

        let mut report = self.run(in_range);
        report.rejected_rows = load.rejected;
        report.out_of_range_rows = out_of_range;
        Ok(report)
    }

    /// Hands each analyzed partition's cumulative profit to `sink`. Returns how many
    /// charts were rendered; a failing chart is logged and does not stop the others.
    pub fn render(&self, report: &CombinedReport, sink: &mut dyn ChartSink) -> usize {
        let chart_dir = self.config.output_directory.join("chart");
        let mut rendered = 0;
        for analysis in report.partitions().filter_map(PartitionOutcome::report) {
            let output_path = chart_dir.join(crate::sink::chart_file_stem(&analysis.name));
            match sink.render(&analysis.cumulative_profit_series(), &analysis.name, &output_path) {
                Ok(()) => rendered += 1,
                Err(e) => {
                    warn!(partition = %analysis.name, error = %e, "Failed to render chart.");
                }
            }
        }
        rendered
    }

    fn in_date_range(&self, trade: &MatchedTrade) -> bool {
        let day = trade.entry_time.date();
        self.config.window.start_date() <= day && day <= self.config.window.end_date()
    }

    fn analyze(&self, name: &str, trades: &[MatchedTrade]) -> PartitionOutcome {
        match self.engine.analyze(name, trades) {
            Ok(analysis) => PartitionOutcome::Analyzed(analysis),
            Err(error) => {
                warn!(partition = name, %error, "No data for partition.");
                PartitionOutcome::NoData {
                    name: name.to_string(),
                    error,
                }
            }
        }
    }

    fn analyze_subset(
        &self,
        name: &str,
        subset: &MatchedTradeSet,
        full: &MatchedTradeSet,
    ) -> PartitionOutcome {
        if subset.is_empty() && !full.is_empty() {
            warn!(partition = name, "Partition is empty.");
            return PartitionOutcome::NoData {
                name: name.to_string(),
                error: Error::PartitionEmpty(name.to_string()),
            };
        }
        self.analyze(name, subset.trades())
    }
}

/// Helper function to print the combined report in a readable format.
pub fn print_report(report: &CombinedReport) {
    println!("\n--- Backtest Report ---");
    println!("Start date: {}", report.start_date);
    println!("End date:   {}", report.end_date);
    println!("-----------------------------------");
    for partition in report.partitions() {
        match partition {
            PartitionOutcome::Analyzed(analysis) => {
                println!("{}", analysis.report);
                if !analysis.excluded.is_empty() {
                    println!("  Excluded trades:       {}", analysis.excluded.len());
                }
            }
            PartitionOutcome::NoData { name, error } => {
                println!("{name}:\n  No data ({error})");
            }
        }
        println!("-----------------------------------");
    }
    if report.out_of_range_rows > 0 {
        println!("Rows outside date range: {}", report.out_of_range_rows);
        println!("-----------------------------------");
    }
    if !report.rejected_rows.is_empty() {
        println!("Rejected input rows: {}", report.rejected_rows.len());
        for row in &report.rejected_rows {
            println!("  - line {}: {}", row.line, row.reason);
        }
        println!("-----------------------------------");
    }
}

// In app/src/main.rs

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result};
use app_config::BacktestSettings;
use backtester::table::{read_tick_table, write_matched_table};
use backtester::{BacktestConfig, Backtester, CombinedReport, TradeMatcher, print_report};
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod chart;

use crate::chart::SvgChartSink;

// --- Command-Line Interface Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = "Backtests a fixed-holding-period futures rule: enter at a fixed time each day, exit after the entry window closes."
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error); defaults to `app.log_level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Runs the backtest and reports total, maturity-week and non-maturity performance.
    Backtest {
        /// Per-run backtest file; defaults to the `[backtest]` table of the settings.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Read matched pairs from this table instead of the database.
        #[arg(long)]
        from_table: Option<PathBuf>,

        /// Skip chart rendering.
        #[arg(long)]
        no_chart: bool,
    },

    /// Fetches matched pairs from the database and saves them as a table.
    Fetch {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Destination CSV file.
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Matches a `datetime,price` tick CSV into a matched-pair table.
    Match {
        /// Source tick CSV.
        #[arg(long)]
        ticks: PathBuf,

        /// Destination CSV file.
        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// --- Main Application Entry Point ---

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from a .env file, if it exists.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let configured = app_config::load_settings().ok().map(|s| s.app.log_level);
    let level = log_level(cli.log_level.as_deref(), configured.as_deref());
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(
        tracing_subscriber::filter::Targets::new()
            .with_target("sqlx::query", tracing::Level::WARN)
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();

    let started = Instant::now();
    match cli.command {
        Commands::Backtest {
            config,
            from_table,
            no_chart,
        } => {
            handle_backtest(config.as_deref(), from_table.as_deref(), no_chart).await?;
        }
        Commands::Fetch { config, output } => {
            handle_fetch(config.as_deref(), &output).await?;
        }
        Commands::Match {
            ticks,
            output,
            config,
        } => {
            handle_match(config.as_deref(), &ticks, &output)?;
        }
    }

    tracing::info!(duration = ?started.elapsed(), "Finished successfully.");
    Ok(())
}

/// The command-line level wins over the configured one; anything unparseable falls back to INFO.
fn log_level(cli: Option<&str>, configured: Option<&str>) -> tracing::Level {
    cli.or(configured)
        .and_then(|level| tracing::Level::from_str(level).ok())
        .unwrap_or(tracing::Level::INFO)
}

/// Resolves the run settings: an explicit per-run file wins over the layered settings.
fn backtest_settings(path: Option<&Path>) -> Result<BacktestSettings> {
    match path {
        Some(path) => app_config::load_backtest_settings(path)
            .with_context(|| format!("Failed to load backtest file {}", path.display())),
        None => Ok(app_config::load_settings()
            .context("Failed to load settings")?
            .backtest),
    }
}

fn backtest_config(settings: &BacktestSettings) -> Result<BacktestConfig> {
    BacktestConfig::try_from(settings).context("Backtest configuration rejected")
}

// --- "Backtest" Subcommand Logic ---

async fn handle_backtest(
    config_path: Option<&Path>,
    from_table: Option<&Path>,
    no_chart: bool,
) -> Result<()> {
    // --- 1. Configuration ---
    let settings = backtest_settings(config_path)?;
    let config = backtest_config(&settings)?;
    let output_directory = config.output_directory.clone();
    let backtester = Backtester::new(config);

    // --- 2. Load Data & Run ---
    let report = match from_table {
        Some(path) => {
            tracing::info!(table = %path.display(), "Running backtest from table.");
            backtester.run_from_table(path)?
        }
        None => {
            let db_settings = app_config::load_settings()
                .context("Failed to load settings")?
                .database;
            let db = database::connect(&db_settings).await?;
            tracing::info!(future_code = db.future_code(), "Fetching matched pairs...");
            let trades = db.fetch_matched_pairs(&backtester.config().window).await?;

            let table_path = output_directory.join("matched.csv");
            write_matched_table(&table_path, &trades)?;
            tracing::info!(table = %table_path.display(), "Matched pairs saved.");

            backtester.run(trades)
        }
    };

    // --- 3. Report ---
    print_report(&report);
    save_report(&output_directory, &report)?;

    if settings.render_charts && !no_chart {
        let rendered = backtester.render(&report, &mut SvgChartSink::default());
        tracing::info!(rendered, "Charts rendered.");
    }

    Ok(())
}

fn save_report(output_directory: &Path, report: &CombinedReport) -> Result<()> {
    std::fs::create_dir_all(output_directory)
        .with_context(|| format!("Failed to create {}", output_directory.display()))?;
    let path = output_directory.join("report.json");
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(report = %path.display(), "Report saved.");
    Ok(())
}

// --- "Fetch" Subcommand Logic ---

async fn handle_fetch(config_path: Option<&Path>, output: &Path) -> Result<()> {
    let config = backtest_config(&backtest_settings(config_path)?)?;
    let db_settings = app_config::load_settings()
        .context("Failed to load settings")?
        .database;
    let db = database::connect(&db_settings).await?;

    let trades = db.fetch_matched_pairs(&config.window).await?;
    write_matched_table(output, &trades)?;
    tracing::info!(trades = trades.len(), table = %output.display(), "Matched pairs saved.");
    Ok(())
}

// --- "Match" Subcommand Logic ---

fn handle_match(config_path: Option<&Path>, ticks_path: &Path, output: &Path) -> Result<()> {
    let config = backtest_config(&backtest_settings(config_path)?)?;

    let load = read_tick_table(ticks_path)?;
    if !load.rejected.is_empty() {
        tracing::warn!(rejected = load.rejected.len(), "Some tick rows were rejected.");
    }
    tracing::info!(ticks = load.rows.len(), "Loaded ticks.");

    let trades = TradeMatcher::new(config.window).match_ticks(load.rows);
    if trades.is_empty() {
        tracing::warn!("No day produced a matched pair.");
    }
    write_matched_table(output, &trades)?;
    tracing::info!(trades = trades.len(), table = %output.display(), "Matched pairs saved.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_prefers_cli_then_settings() {
        assert_eq!(log_level(Some("debug"), Some("warn")), tracing::Level::DEBUG);
        assert_eq!(log_level(None, Some("warn")), tracing::Level::WARN);
        assert_eq!(log_level(None, None), tracing::Level::INFO);
        assert_eq!(log_level(Some("loud"), None), tracing::Level::INFO);
    }
}

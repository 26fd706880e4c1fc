// In crates/backtester/src/table.rs

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use core_types::{MatchedTrade, MatchedTradeSet, TickObservation};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::maturity::parse_date_input;

pub const MATCHED_COLUMNS: [&str; 4] = ["start_time", "start_price", "end_time", "end_price"];
pub const TICK_COLUMNS: [&str; 2] = ["datetime", "price"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A data row that could not be loaded, with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedRow {
    pub line: usize,
    pub reason: String,
}

/// The rows that loaded plus the ones that did not.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLoad<T> {
    pub rows: T,
    pub rejected: Vec<RejectedRow>,
}

/// Writes the matched-pair table: one row per trading day, header first.
pub fn write_matched<W: Write>(mut writer: W, trades: &MatchedTradeSet) -> Result<()> {
    writeln!(writer, "{}", MATCHED_COLUMNS.join(","))?;
    for trade in trades {
        writeln!(
            writer,
            "{},{},{},{}",
            trade.entry_time.format(TIMESTAMP_FORMAT),
            trade.entry_price,
            trade.exit_time.format(TIMESTAMP_FORMAT),
            trade.exit_price,
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_matched_table(path: &Path, trades: &MatchedTradeSet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    write_matched(BufWriter::new(file), trades)
}

/// Reads a matched-pair table. Extra columns (an index, a maturity flag) are ignored;
/// rows that do not parse or do not form a valid trade are rejected, not fatal.
pub fn read_matched<R: BufRead>(reader: R) -> Result<TableLoad<MatchedTradeSet>> {
    let mut rows = MatchedTradeSet::new();
    let rejected = read_rows(reader, &MATCHED_COLUMNS, |fields| {
        let entry = TickObservation::new(parse_timestamp(fields[0])?, parse_price(fields[1])?);
        let exit = TickObservation::new(parse_timestamp(fields[2])?, parse_price(fields[3])?);
        rows.push(MatchedTrade::new(entry, exit).map_err(|e| e.to_string())?);
        Ok(())
    })?;
    Ok(TableLoad { rows, rejected })
}

pub fn read_matched_table(path: &Path) -> Result<TableLoad<MatchedTradeSet>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_matched(BufReader::new(file))
        .with_context(|| format!("Failed to read matched table {}", path.display()))
}

/// Reads a `datetime,price` tick table.
pub fn read_ticks<R: BufRead>(reader: R) -> Result<TableLoad<Vec<TickObservation>>> {
    let mut rows = Vec::new();
    let rejected = read_rows(reader, &TICK_COLUMNS, |fields| {
        rows.push(TickObservation::new(
            parse_timestamp(fields[0])?,
            parse_price(fields[1])?,
        ));
        Ok(())
    })?;
    Ok(TableLoad { rows, rejected })
}

pub fn read_tick_table(path: &Path) -> Result<TableLoad<Vec<TickObservation>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_ticks(BufReader::new(file))
        .with_context(|| format!("Failed to read tick table {}", path.display()))
}

// Locates `columns` in the header, then hands each data row's fields (in `columns` order)
// to `on_row`. Row-level failures are collected; only I/O and a bad header are fatal.
fn read_rows<R, F>(reader: R, columns: &[&str], mut on_row: F) -> Result<Vec<RejectedRow>>
where
    R: BufRead,
    F: FnMut(&[&str]) -> std::result::Result<(), String>,
{
    let mut lines = reader.lines().enumerate();
    let positions = loop {
        let Some((_, line)) = lines.next() else {
            anyhow::bail!("Table is empty; expected header '{}'", columns.join(","));
        };
        let line = line?;
        if !line.trim().is_empty() {
            break header_positions(&line, columns)?;
        }
    };

    let mut rejected = Vec::new();
    for (index, line) in lines {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split(',').map(str::trim).collect();
        let fields: Vec<&str> = positions
            .iter()
            .map(|&p| cells.get(p).copied().unwrap_or(""))
            .collect();

        if let Err(reason) = on_row(&fields) {
            tracing::warn!(line = index + 1, %reason, "Rejected table row.");
            rejected.push(RejectedRow {
                line: index + 1,
                reason,
            });
        }
    }
    Ok(rejected)
}

fn header_positions(header: &str, columns: &[&str]) -> Result<Vec<usize>> {
    let names: HashMap<&str, usize> = header
        .trim_start_matches('\u{feff}')
        .split(',')
        .enumerate()
        .map(|(i, name)| (name.trim(), i))
        .collect();
    columns
        .iter()
        .map(|c| {
            names
                .get(c)
                .copied()
                .with_context(|| format!("Missing column '{c}' in header '{header}'"))
        })
        .collect()
}

fn parse_timestamp(field: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_date_input(field).map_err(|e| e.to_string())
}

fn parse_price(field: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(field)
        .or_else(|_| Decimal::from_scientific(field))
        .map_err(|_| format!("Unparseable price '{field}'"))
}

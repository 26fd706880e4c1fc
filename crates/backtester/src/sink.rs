// In crates/backtester/src/sink.rs

use std::path::Path;

/// Consumes one computed series and produces an artifact (a chart, a file, a message).
///
/// Called once per analyzed partition. `output_path` has no extension; the sink picks one.
pub trait ChartSink {
    fn render(&mut self, series: &[f64], label: &str, output_path: &Path) -> anyhow::Result<()>;
}

/// File-friendly form of a partition label: "Maturity Only" -> "MaturityOnly".
pub fn chart_file_stem(label: &str) -> String {
    label.split_whitespace().collect()
}

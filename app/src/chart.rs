// In app/src/chart.rs

use std::fmt::{self, Write as _};
use std::path::Path;

use anyhow::Context;
use backtester::ChartSink;

const MARGIN: f64 = 60.0;

/// Draws a cumulative-profit curve as a standalone SVG line chart.
#[derive(Debug, Clone)]
pub struct SvgChartSink {
    pub width: f64,
    pub height: f64,
}

impl Default for SvgChartSink {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 480.0,
        }
    }
}

impl ChartSink for SvgChartSink {
    fn render(&mut self, series: &[f64], label: &str, output_path: &Path) -> anyhow::Result<()> {
        let path = output_path.with_extension("svg");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let svg = render_svg(series, label, self.width, self.height)
            .with_context(|| format!("Failed to draw chart '{label}'"))?;
        std::fs::write(&path, svg)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!(chart = %path.display(), points = series.len(), "Chart saved.");
        Ok(())
    }
}

pub fn render_svg(
    series: &[f64],
    label: &str,
    width: f64,
    height: f64,
) -> Result<String, fmt::Error> {
    let plot_w = width - 2.0 * MARGIN;
    let plot_h = height - 2.0 * MARGIN;

    // Keep the zero line in view.
    let lo = series.iter().copied().fold(0.0_f64, f64::min);
    let mut hi = series.iter().copied().fold(0.0_f64, f64::max);
    if hi - lo < f64::EPSILON {
        hi = lo + 1.0;
    }

    let x = |i: usize| {
        if series.len() > 1 {
            MARGIN + plot_w * i as f64 / (series.len() - 1) as f64
        } else {
            MARGIN + plot_w / 2.0
        }
    };
    let y = |v: f64| MARGIN + plot_h * (hi - v) / (hi - lo);

    let mut svg = String::new();
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="16">{} Cumulative Change</text>"#,
        width / 2.0,
        MARGIN / 2.0,
        escape(label)
    )?;
    writeln!(
        svg,
        r##"<line x1="{MARGIN}" y1="{0}" x2="{1}" y2="{0}" stroke="#bbbbbb" stroke-dasharray="4"/>"##,
        y(0.0),
        MARGIN + plot_w
    )?;
    writeln!(
        svg,
        r#"<rect x="{MARGIN}" y="{MARGIN}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
    )?;

    match series {
        [] => {}
        [only] => {
            writeln!(
                svg,
                r#"<circle cx="{}" cy="{}" r="3" fill="black"/>"#,
                x(0),
                y(*only)
            )?;
        }
        _ => {
            let points: Vec<String> = series
                .iter()
                .enumerate()
                .map(|(i, v)| format!("{:.2},{:.2}", x(i), y(*v)))
                .collect();
            writeln!(
                svg,
                r#"<polyline fill="none" stroke="black" stroke-width="1.5" points="{}"/>"#,
                points.join(" ")
            )?;
        }
    }

    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="middle" font-size="12">Date</text>"#,
        width / 2.0,
        height - MARGIN / 3.0
    )?;
    writeln!(
        svg,
        r#"<text x="{0}" y="{1}" text-anchor="middle" font-size="12" transform="rotate(-90 {0} {1})">Profit</text>"#,
        MARGIN / 3.0,
        height / 2.0
    )?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end" font-size="10">{hi:.2}</text>"#,
        MARGIN - 4.0,
        MARGIN + 4.0
    )?;
    writeln!(
        svg,
        r#"<text x="{}" y="{}" text-anchor="end" font-size="10">{lo:.2}</text>"#,
        MARGIN - 4.0,
        MARGIN + plot_h
    )?;
    svg.push_str("</svg>\n");
    Ok(svg)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polyline_has_one_point_per_value() {
        let svg = render_svg(&[1.0, -2.0, 3.5], "Total Analysis", 800.0, 480.0).unwrap();
        let points = svg
            .lines()
            .find(|l| l.starts_with("<polyline"))
            .unwrap()
            .split("points=\"")
            .nth(1)
            .unwrap()
            .trim_end_matches("\"/>");
        assert_eq!(points.split(' ').count(), 3);
        assert!(svg.contains("Total Analysis Cumulative Change"));
    }

    #[test]
    fn test_single_point_and_empty_series_render() {
        assert!(render_svg(&[2.0], "Maturity Only", 800.0, 480.0)
            .unwrap()
            .contains("<circle"));
        let empty = render_svg(&[], "Except Maturity", 800.0, 480.0).unwrap();
        assert!(!empty.contains("<polyline"));
        assert!(empty.ends_with("</svg>\n"));
    }

    #[test]
    fn test_sink_writes_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SvgChartSink::default();
        sink.render(&[0.5, 1.0], "A & B", &dir.path().join("chart").join("AB"))
            .unwrap();

        let written = std::fs::read_to_string(dir.path().join("chart").join("AB.svg")).unwrap();
        assert!(written.contains("A &amp; B"));
    }
}

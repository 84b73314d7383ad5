//! # CSV Report Module / CSV 报告模块
//!
//! One row per (project, variant, attempt), projects in name order and
//! variants/attempts in the order they ran. Unobserved values are `-1`.
//!
//! 每个（项目，变体，尝试）一行。

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::core::models::{ResultSet, or_unobserved};

pub const CSV_HEADER: [&str; 7] = [
    "PROJECT", "CONFIG", "TOTAL", "FAILS", "ERRORS", "SKIPPED", "TEST_TIME",
];

/// Renders the report to a string.
pub fn render_csv(results: &ResultSet) -> Result<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    for group in results.iter() {
        for variant in group.variants() {
            for attempt in &variant.attempts {
                let counts = attempt.counts;
                wtr.write_record([
                    group.project_name().to_string(),
                    variant.variant.label().to_string(),
                    or_unobserved(counts.map(|c| c.total)).to_string(),
                    or_unobserved(counts.map(|c| c.fails)).to_string(),
                    or_unobserved(counts.map(|c| c.errors)).to_string(),
                    or_unobserved(counts.map(|c| c.skipped)).to_string(),
                    or_unobserved(attempt.elapsed_millis).to_string(),
                ])?;
            }
        }
    }

    let bytes = wtr.into_inner().context("Failed to flush CSV report")?;
    Ok(String::from_utf8(bytes)?)
}

/// Writes the report to `path`, replacing any previous file.
pub fn write_csv_report(results: &ResultSet, path: &Path) -> Result<()> {
    let report = render_csv(results)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
    }
    fs::write(path, report)
        .with_context(|| format!("Failed to write report file: {}", path.display()))
}

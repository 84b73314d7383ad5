//! # Log Mirror Module / 日志镜像模块
//!
//! Mirrors every attempt's raw build output to
//! `<dir>/<project>/<variant>/log-<attempt>.txt` and writes a JSON summary of
//! the batch next to it. The directory is rebuilt from scratch on every run.
//!
//! 将每次尝试的原始构建输出镜像到
//! `<dir>/<project>/<variant>/log-<attempt>.txt`，并在旁边写入批处理的 JSON 摘要。
//! 每次运行都会重建该目录。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::batch::{BatchOutcome, ProjectFailure};
use crate::infra::fs::recreate_dir;

pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Debug, Serialize)]
struct BatchSummary<'a> {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    retained: Vec<&'a str>,
    total_attempts: usize,
    excluded: &'a [ProjectFailure],
}

/// Path of one attempt's mirrored log.
pub fn attempt_log_path(dir: &Path, project: &str, variant_dir: &str, attempt: u32) -> PathBuf {
    dir.join(project)
        .join(variant_dir)
        .join(format!("log-{attempt}.txt"))
}

/// Writes the log mirror and `summary.json` for a finished batch.
///
/// # Returns
/// The number of attempt logs written
pub fn write_log_mirror(outcome: &BatchOutcome, dir: &Path) -> Result<usize> {
    recreate_dir(dir)?;

    let mut written = 0;
    for group in outcome.results.iter() {
        for variant in group.variants() {
            let variant_dir = dir.join(group.project_name()).join(variant.variant.kind.dir_name());
            fs::create_dir_all(&variant_dir)
                .with_context(|| format!("Failed to create directory: {}", variant_dir.display()))?;

            for attempt in &variant.attempts {
                let path = attempt_log_path(
                    dir,
                    group.project_name(),
                    variant.variant.kind.dir_name(),
                    attempt.attempt,
                );
                fs::write(&path, &attempt.raw_log)
                    .with_context(|| format!("Failed to write log: {}", path.display()))?;
                written += 1;
            }
        }
    }

    let summary = BatchSummary {
        started_at: outcome.started_at,
        finished_at: outcome.finished_at,
        retained: outcome.results.names(),
        total_attempts: outcome.results.total_attempts(),
        excluded: &outcome.failures,
    };
    let summary_path = dir.join(SUMMARY_FILE);
    let json = serde_json::to_string_pretty(&summary)?;
    fs::write(&summary_path, json)
        .with_context(|| format!("Failed to write summary: {}", summary_path.display()))?;

    Ok(written)
}

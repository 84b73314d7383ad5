//! # Metric Extraction Module / 指标提取模块
//!
//! Turns the build tool's console output into accumulated test counters, and
//! its per-mojo phase log into the elapsed time of the test phase.
//!
//! 将构建工具的控制台输出转换为累计的测试计数器，
//! 并将其阶段日志转换为测试阶段的耗时。

use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::warn;

use crate::core::errors::ProjectError;
use crate::core::models::TestCounts;

/// Marker that starts a per-module summary line.
const SUMMARY_MARKER: &str = "Tests run:";

/// Column of the phase log holding the mojo duration in milliseconds.
const DURATION_FIELD: usize = 5;

static ANSI_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").unwrap());

static INTEGER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Reactor module header or the start of a Surefire execution.
static MODULE_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|\s)(Building \S|--- (maven-)?surefire(-plugin)?:)").unwrap()
});

/// Parses a per-module summary line.
///
/// The first four integers after `Tests run:` are total, failures, errors and
/// skipped. Per-class lines (`... Time elapsed: 0.1 s - in com.Foo`) and lines
/// with fewer than four integers yield `None`.
///
/// 解析每个模块的汇总行。
pub fn parse_summary_line(line: &str) -> Option<TestCounts> {
    let start = line.find(SUMMARY_MARKER)?;
    let relevant = &line[start..];
    if relevant.contains(" in ") || relevant.contains("Time elapsed") {
        return None;
    }

    let mut numbers = INTEGER
        .find_iter(relevant)
        .map(|m| m.as_str().parse::<u64>().ok());
    let mut next = || numbers.next().flatten();
    Some(TestCounts::new(next()?, next()?, next()?, next()?))
}

/// Streaming accumulator for one invocation's console output.
///
/// Counts are summed over every module. A zero-total summary that directly
/// follows a non-zero one inside the same module is the fork runner echoing
/// its own report and is dropped.
///
/// 单次调用控制台输出的流式累加器。
#[derive(Debug, Default)]
pub struct MetricExtractor {
    counts: Option<TestCounts>,
    module_reported_tests: bool,
}

impl MetricExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line of output.
    pub fn consume(&mut self, line: &str) {
        let line = ANSI_ESCAPE.replace_all(line, "");

        if MODULE_BOUNDARY.is_match(&line) {
            self.module_reported_tests = false;
            return;
        }

        let Some(summary) = parse_summary_line(&line) else {
            return;
        };
        if summary.total == 0 && self.module_reported_tests {
            return;
        }
        if summary.total > 0 {
            self.module_reported_tests = true;
        }
        *self.counts.get_or_insert_with(TestCounts::default) += summary;
    }

    /// Accumulated counts, or `None` when no summary line was seen.
    pub fn counts(&self) -> Option<TestCounts> {
        self.counts
    }
}

/// Sums the duration column of every phase-log row produced by `plugin_key`.
///
/// Rows whose duration column is missing or not an integer are skipped.
pub fn elapsed_from_phase_log(content: &str, plugin_key: &str) -> u64 {
    content
        .lines()
        .filter(|row| row.contains(plugin_key))
        .filter_map(|row| {
            let field = row.split('\t').nth(DURATION_FIELD).map(str::trim);
            match field.and_then(|f| f.parse::<u64>().ok()) {
                Some(millis) => Some(millis),
                None => {
                    warn!("Ignoring phase log row without a duration: {row}");
                    None
                }
            }
        })
        .sum()
}

/// Reads the phase log at `path`. Returns `Ok(None)` if the file is absent.
pub fn read_phase_log(path: &Path, plugin_key: &str) -> Result<Option<u64>, ProjectError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(elapsed_from_phase_log(&content, plugin_key))),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProjectError::io(path, e)),
    }
}

//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the runner:
//! projects, runner variants, per-attempt results and the per-project result
//! groups that are handed to the reporters.
//!
//! 此模块定义了整个运行器中使用的核心数据结构：
//! 项目、运行器变体、每次尝试的结果以及交给报告器的项目结果组。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Directory-name suffixes added by source archives (e.g. `repo-master.zip`).
const ARCHIVE_SUFFIXES: &[&str] = &["-master", "-main"];

/// Maps a project directory name to the name used in reports.
///
/// 将项目目录名映射为报告中使用的名称。
pub fn display_name(dir_name: &str) -> String {
    ARCHIVE_SUFFIXES
        .iter()
        .find_map(|suffix| dir_name.strip_suffix(suffix))
        .filter(|stripped| !stripped.is_empty())
        .unwrap_or(dir_name)
        .to_string()
}

/// A candidate project: one directory under the repositories root.
/// 候选项目：仓库根目录下的一个目录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    root: PathBuf,
    display_name: String,
}

impl Project {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let dir_name = root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());
        Self {
            display_name: display_name(&dir_name),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn name(&self) -> &str {
        &self.display_name
    }
}

/// The runner releases being compared.
/// 被比较的运行器版本。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VariantKind {
    /// The current upstream release.
    Standard,
    /// A locally built runner.
    Custom,
    /// The fork-script variant of the runner.
    Fork,
}

impl VariantKind {
    /// All kinds, in execution order.
    pub const ALL: [VariantKind; 3] = [VariantKind::Standard, VariantKind::Custom, VariantKind::Fork];

    /// Label used in the CSV report.
    pub fn label(self) -> &'static str {
        match self {
            VariantKind::Standard => "STANDARD",
            VariantKind::Custom => "CUSTOM",
            VariantKind::Fork => "FORK",
        }
    }

    /// Directory name used in the log mirror.
    pub fn dir_name(self) -> &'static str {
        match self {
            VariantKind::Standard => "standard",
            VariantKind::Custom => "custom",
            VariantKind::Fork => "fork",
        }
    }

    pub fn default_version(self) -> &'static str {
        match self {
            VariantKind::Standard => "3.0.0-M3",
            VariantKind::Custom => "3.0.0-SNAPSHOT",
            VariantKind::Fork => "2.21.0",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A runner variant: which release to install and how to label it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunVariant {
    pub kind: VariantKind,
    pub runner_version: String,
}

impl RunVariant {
    pub fn new(kind: VariantKind, runner_version: impl Into<String>) -> Self {
        Self {
            kind,
            runner_version: runner_version.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.kind.label()
    }
}

/// Restricts a batch run to one variant, all variants, or none.
/// 将批处理限制为一个变体、所有变体或不运行任何变体。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseSelector {
    #[default]
    All,
    Only(VariantKind),
    None,
}

impl PhaseSelector {
    /// Keeps the variants this selector asks for, preserving their order.
    pub fn select(&self, variants: &[RunVariant]) -> Vec<RunVariant> {
        variants
            .iter()
            .filter(|variant| match self {
                PhaseSelector::All => true,
                PhaseSelector::Only(kind) => variant.kind == *kind,
                PhaseSelector::None => false,
            })
            .cloned()
            .collect()
    }
}

impl fmt::Display for PhaseSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhaseSelector::All => f.write_str("ALL"),
            PhaseSelector::Only(kind) => f.write_str(kind.label()),
            PhaseSelector::None => f.write_str("NONE"),
        }
    }
}

impl FromStr for PhaseSelector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(PhaseSelector::All),
            "NONE" => Ok(PhaseSelector::None),
            "STANDARD" => Ok(PhaseSelector::Only(VariantKind::Standard)),
            "CUSTOM" => Ok(PhaseSelector::Only(VariantKind::Custom)),
            "FORK" | "FORKSCRIPT" => Ok(PhaseSelector::Only(VariantKind::Fork)),
            other => Err(format!(
                "unknown phase '{other}', expected one of STANDARD, CUSTOM, FORK, NONE, ALL"
            )),
        }
    }
}

/// Test counters accumulated over every module of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestCounts {
    pub total: u64,
    pub fails: u64,
    pub errors: u64,
    pub skipped: u64,
}

impl TestCounts {
    pub fn new(total: u64, fails: u64, errors: u64, skipped: u64) -> Self {
        Self {
            total,
            fails,
            errors,
            skipped,
        }
    }
}

impl std::ops::AddAssign for TestCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.total += rhs.total;
        self.fails += rhs.fails;
        self.errors += rhs.errors;
        self.skipped += rhs.skipped;
    }
}

/// Outcome of a single test invocation attempt.
///
/// `None` counters mean the value was never observed in the build output;
/// reports render them as `-1`.
///
/// 单次测试调用尝试的结果。`None` 表示未在构建输出中观察到该值。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRunResult {
    /// Zero-based attempt index within its variant.
    pub attempt: u32,
    pub counts: Option<TestCounts>,
    /// Sum of the per-module test phase durations.
    pub elapsed_millis: Option<u64>,
    /// Everything the build tool printed during the attempt.
    pub raw_log: String,
    /// `true` iff the invocation did not exit with status zero.
    pub failed: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl TestRunResult {
    pub fn is_stable(&self) -> bool {
        !self.failed
    }
}

impl fmt::Display for TestRunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = self.counts;
        write!(
            f,
            "attempt={} total={} fails={} errors={} skipped={} elapsed={}ms failed={}",
            self.attempt,
            or_unobserved(c.map(|c| c.total)),
            or_unobserved(c.map(|c| c.fails)),
            or_unobserved(c.map(|c| c.errors)),
            or_unobserved(c.map(|c| c.skipped)),
            or_unobserved(self.elapsed_millis),
            self.failed
        )
    }
}

/// Renders an optional counter, using `-1` for "not observed".
pub fn or_unobserved(value: Option<u64>) -> i64 {
    value.map(|v| v as i64).unwrap_or(-1)
}

/// All attempts made for one variant, in attempt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantResults {
    pub variant: RunVariant,
    pub attempts: Vec<TestRunResult>,
}

impl VariantResults {
    pub fn stable_count(&self) -> usize {
        self.attempts.iter().filter(|a| a.is_stable()).count()
    }

    /// Mean elapsed time over the stable attempts that reported one.
    pub fn mean_stable_elapsed(&self) -> Option<u64> {
        let samples: Vec<u64> = self
            .attempts
            .iter()
            .filter(|a| a.is_stable())
            .filter_map(|a| a.elapsed_millis)
            .collect();
        if samples.is_empty() {
            None
        } else {
            Some(samples.iter().sum::<u64>() / samples.len() as u64)
        }
    }
}

/// Collects a project's results while it is being orchestrated.
#[derive(Debug)]
pub struct ResultGroupBuilder {
    project_name: String,
    variants: Vec<VariantResults>,
}

impl ResultGroupBuilder {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            variants: Vec::new(),
        }
    }

    /// Records the attempts of one variant. A variant recorded twice replaces
    /// its earlier attempts, so each kind appears at most once.
    pub fn record(&mut self, variant: RunVariant, attempts: Vec<TestRunResult>) {
        self.variants.retain(|v| v.variant.kind != variant.kind);
        self.variants.push(VariantResults { variant, attempts });
    }

    pub fn seal(self) -> ResultGroup {
        ResultGroup {
            project_name: self.project_name,
            variants: self.variants,
        }
    }
}

/// The finished results of one project. Read-only once sealed.
/// 一个项目的最终结果，封装后只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultGroup {
    project_name: String,
    variants: Vec<VariantResults>,
}

impl ResultGroup {
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Variants in the order they were run.
    pub fn variants(&self) -> &[VariantResults] {
        &self.variants
    }

    pub fn attempts(&self, kind: VariantKind) -> &[TestRunResult] {
        self.variants
            .iter()
            .find(|v| v.variant.kind == kind)
            .map(|v| v.attempts.as_slice())
            .unwrap_or(&[])
    }

    pub fn attempt_count(&self) -> usize {
        self.variants.iter().map(|v| v.attempts.len()).sum()
    }
}

/// Result groups of every retained project, keyed (and deduplicated) by name.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    groups: BTreeMap<String, ResultGroup>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a group. Returns `false` and keeps the existing group when a
    /// project with the same name is already present.
    pub fn insert(&mut self, group: ResultGroup) -> bool {
        use std::collections::btree_map::Entry;
        match self.groups.entry(group.project_name.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(group);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&ResultGroup> {
        self.groups.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in project-name order.
    pub fn iter(&self) -> impl Iterator<Item = &ResultGroup> {
        self.groups.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    pub fn total_attempts(&self) -> usize {
        self.iter().map(ResultGroup::attempt_count).sum()
    }
}

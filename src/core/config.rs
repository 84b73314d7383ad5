//! # Configuration Module / 配置模块
//!
//! Optional TOML configuration for a batch run. Every key has a default, so a
//! batch can run without any file; command-line flags override file values.
//!
//! 批处理运行的可选 TOML 配置。每个键都有默认值，因此没有配置文件也可以运行；
//! 命令行参数会覆盖文件中的值。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::models::{PhaseSelector, RunVariant, VariantKind};
use crate::core::retry::RetryPolicy;

/// Options that switch off analysis and reporting plugins unrelated to tests.
pub const DEFAULT_INVOKE_OPTIONS: &str = "-Dcobertura.skip=true -Djacoco.skip=true -Drat.skip=true -Denforcer.skip=true -Dmaven.javadoc.skip=true -Dcheckstyle.skip=true -Dpmd.skip=true -Dcpd.skip=true -Dfindbugs.skip=true";

/// Two hours.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60 * 60 * 2;

/// Build tool settings.
/// 构建工具设置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MavenSettings {
    /// Maven installation directory. `~` and environment variables are expanded.
    pub home: Option<String>,
    /// Extra options appended to every invocation, shell-quoted.
    pub options: String,
    /// Hard timeout per invocation, in seconds.
    pub timeout_secs: u64,
    /// File, relative to the project root, holding the per-mojo timings.
    pub phase_log: String,
    /// `groupId:artifactId` identifying the runner's rows in the phase log.
    pub runner_plugin: String,
}

impl Default for MavenSettings {
    fn default() -> Self {
        Self {
            home: None,
            options: DEFAULT_INVOKE_OPTIONS.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            phase_log: "maven.build.log".to_string(),
            runner_plugin: "org.apache.maven.plugins:maven-surefire-plugin".to_string(),
        }
    }
}

/// Runner release installed for each variant.
/// 每个变体安装的运行器版本。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariantVersions {
    pub standard: String,
    pub custom: String,
    pub fork: String,
}

impl Default for VariantVersions {
    fn default() -> Self {
        Self {
            standard: VariantKind::Standard.default_version().to_string(),
            custom: VariantKind::Custom.default_version().to_string(),
            fork: VariantKind::Fork.default_version().to_string(),
        }
    }
}

impl VariantVersions {
    /// All variants in execution order.
    pub fn variants(&self) -> Vec<RunVariant> {
        VariantKind::ALL
            .iter()
            .map(|&kind| {
                let version = match kind {
                    VariantKind::Standard => &self.standard,
                    VariantKind::Custom => &self.custom,
                    VariantKind::Fork => &self.fork,
                };
                RunVariant::new(kind, version.clone())
            })
            .collect()
    }
}

/// The whole configuration file.
/// 完整的配置文件。
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// The language for console messages (e.g., "en", "zh-CN").
    pub language: Option<String>,
    pub maven: MavenSettings,
    pub variants: VariantVersions,
}

impl BatchConfig {
    /// Expanded Maven home, if one is configured.
    pub fn maven_home(&self) -> Result<Option<PathBuf>> {
        self.maven
            .home
            .as_deref()
            .map(expand_path)
            .transpose()
    }

    /// The invocation options split into arguments.
    pub fn invoke_options(&self) -> Result<Vec<String>> {
        shlex::split(&self.maven.options).with_context(|| {
            format!("Failed to parse maven options: {}", self.maven.options)
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.maven.timeout_secs)
    }
}

/// Loads a configuration file.
pub fn load_config(path: &Path) -> Result<BatchConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<BatchConfig> {
    let config: BatchConfig = toml::from_str(content)?;
    if config.maven.timeout_secs == 0 {
        anyhow::bail!("maven.timeout_secs must be greater than 0");
    }
    Ok(config)
}

/// Expands `~` and environment variables in a path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Everything a project orchestration needs, resolved from config and flags.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub variants: Vec<RunVariant>,
    pub phase: PhaseSelector,
    pub policy: RetryPolicy,
    pub phase_log: String,
    pub runner_plugin: String,
}

impl RunSettings {
    pub fn from_config(config: &BatchConfig, phase: PhaseSelector, policy: RetryPolicy) -> Self {
        Self {
            variants: config.variants.variants(),
            phase,
            policy,
            phase_log: config.maven.phase_log.clone(),
            runner_plugin: config.maven.runner_plugin.clone(),
        }
    }

    /// The variants this run executes, in order.
    pub fn selected_variants(&self) -> Vec<RunVariant> {
        self.phase.select(&self.variants)
    }
}

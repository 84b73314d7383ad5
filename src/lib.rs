//! # Runner Matrix Library / Runner Matrix 库
//!
//! Batch-runs the test suites of many Maven projects under several test
//! runner releases and reports per-attempt metrics for comparison.
//!
//! 在多个测试运行器版本下批量运行大量 Maven 项目的测试套件，
//! 并报告每次尝试的指标以供比较。
//!
//! ## Modules / 模块
//!
//! - `core` - Data models, descriptor mutation, metric extraction, retry and orchestration
//! - `infra` - Infrastructure services like process invocation, XML, logging and file system walks
//! - `reporting` - CSV report, log mirror and console summary
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 数据模型、描述文件修改、指标提取、重试与编排
//! - `infra` - 基础设施服务，如进程调用、XML、日志和文件系统遍历
//! - `reporting` - CSV 报告、日志镜像和控制台摘要
//! - `cli` - 命令行接口和命令

pub mod core;
pub mod infra;
pub mod reporting;
pub mod cli;

// Re-export commonly used items
pub use core::models;
pub use core::config;
pub use rust_i18n::t;

/// Selects and activates the console language.
///
/// An explicit `requested` language wins; otherwise the system locale is
/// used. The full locale (e.g., "zh-CN") is tried first, then just the
/// language code (e.g., "en"), and finally the default language ("en").
///
/// # Returns
/// The locale that was activated
pub fn init_locale(requested: Option<&str>) -> String {
    let locale = requested
        .map(str::to_string)
        .or_else(sys_locale::get_locale)
        .unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale.as_str()) {
        locale.as_str()
    } else {
        locale
            .split(['-', '_'])
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
    lang.to_string()
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

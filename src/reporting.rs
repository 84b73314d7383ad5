//! # Reporting Module / 报告模块
//!
//! This module renders a finished batch: the CSV summary, the per-attempt log
//! mirror with its JSON run summary, and a colorful console table with
//! internationalization support.
//!
//! 此模块输出已完成的批处理结果：CSV 汇总、按尝试划分的日志镜像及其 JSON 运行摘要，
//! 以及支持国际化的彩色控制台表格。

pub mod console;
pub mod csv;
pub mod logs;

// Re-export common reporting functions
pub use console::print_summary;
pub use csv::write_csv_report;
pub use logs::write_log_mirror;

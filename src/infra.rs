//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Runner Matrix,
//! including command execution, file system operations, the XML tree,
//! logging setup and i18n support.
//!
//! 此模块为 Runner Matrix 提供基础设施服务，
//! 包括命令执行、文件系统操作、XML 树、日志设置和国际化支持。

pub mod command;
pub mod fs;
pub mod logging;
pub mod xml;

// Re-export i18n functions for easier access
pub use rust_i18n::t;

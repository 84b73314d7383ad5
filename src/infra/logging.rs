//! # Logging Module / 日志模块
//!
//! Sets up `tracing` for the batch: a compact stderr layer for the operator
//! and, optionally, an uncoloured copy of every event in a log file.
//! `RUST_LOG` overrides the default `info` filter; the relayed build output
//! is emitted under the `mvn` target at debug level.
//!
//! 为批处理配置 `tracing`：面向操作者的紧凑 stderr 输出层，
//! 以及可选的、写入日志文件的无颜色副本。

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "info";

/// Builds the event filter, with `verbose` enabling the relayed build output.
pub fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{DEFAULT_FILTER},mvn=debug"))
        } else {
            EnvFilter::new(DEFAULT_FILTER)
        }
    })
}

/// Installs the global subscriber.
///
/// # Arguments
/// * `log_file` - Truncated and written alongside stderr when given
/// * `verbose` - Also show every line the build tool prints
pub fn init_logging(log_file: Option<&Path>, verbose: bool) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install the log subscriber")
}

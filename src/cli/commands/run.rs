//! # Run Command Module / 运行命令模块
//!
//! This module implements the batch run: it resolves configuration and
//! flags, runs every project under the repositories directory, and writes
//! the CSV report, the log mirror and the console summary.
//!
//! 此模块实现批处理运行：解析配置和命令行参数，
//! 运行仓库目录下的每个项目，并写出 CSV 报告、日志镜像和控制台摘要。

use anyhow::{Context, Result};
use colored::*;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::core::batch::{BatchCoordinator, default_jobs, discover_projects};
use crate::core::config::{BatchConfig, RunSettings, expand_path, load_config};
use crate::core::retry::RetryPolicy;
use crate::infra::command::MavenInvoker;
use crate::infra::logging::init_logging;
use crate::infra::t;
use crate::reporting::{print_summary, write_csv_report, write_log_mirror};

/// Executes a batch run with the provided arguments.
///
/// Project failures do not make the command fail; only top-level problems
/// do (unreadable repositories directory, bad configuration, report I/O).
///
/// # Arguments
/// * `args` - Parsed command line
/// * `locale` - Console language chosen from `--lang` or the system
pub async fn execute(args: RunArgs, locale: String) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| t!("config_load_failed", locale = &locale, path = path.display()))?,
        None => BatchConfig::default(),
    };

    let locale = match (&args.lang, &config.language) {
        (None, Some(language)) => crate::init_locale(Some(language)),
        _ => locale,
    };

    init_logging(Some(&args.log_file), args.verbose)?;

    let policy = RetryPolicy {
        max_attempts: args.max_runs,
        required_stable: args.runs,
        kill_on_fail: args.kill_on_fail,
    };
    policy.validate().map_err(anyhow::Error::msg)?;

    let maven_home = match &args.maven_home {
        Some(raw) => Some(expand_path(raw)?),
        None => config.maven_home()?,
    };
    let timeout = args
        .timeout_secs
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| config.timeout());
    let jobs = args.jobs.unwrap_or_else(default_jobs).max(1);

    let projects = discover_projects(&args.repositories_dir).with_context(|| {
        t!(
            "repositories_unreadable",
            locale = &locale,
            path = args.repositories_dir.display()
        )
    })?;
    println!(
        "{}",
        t!(
            "projects_discovered",
            locale = &locale,
            count = projects.len(),
            path = args.repositories_dir.display()
        )
        .cyan()
    );
    println!(
        "{}",
        t!("running_with_jobs", locale = &locale, jobs = jobs, phase = args.phase)
            .bold()
    );

    let cancel = setup_signal_handler(&locale);
    let invoker = MavenInvoker::new(
        maven_home,
        config.invoke_options()?,
        timeout,
        args.verbose,
        cancel.clone(),
    );
    info!("Using build tool launcher {}", invoker.executable().display());

    let settings = RunSettings::from_config(&config, args.phase, policy);
    let outcome = BatchCoordinator::new(invoker, settings, jobs, cancel)
        .run(projects)
        .await;

    write_csv_report(&outcome.results, &args.report_file)?;
    println!(
        "{}",
        t!("report_written", locale = &locale, path = args.report_file.display()).green()
    );

    let logs = write_log_mirror(&outcome, &args.log_dir)?;
    println!(
        "{}",
        t!("logs_written", locale = &locale, count = logs, path = args.log_dir.display()).green()
    );

    print_summary(&outcome, &locale);
    Ok(())
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => warn!("Failed to listen for Ctrl-C: {e}"),
        }
    });

    token
}

//! # Console Reporting Module / 控制台报告模块
//!
//! Prints a colored, localized summary of a finished batch: one line per
//! (project, variant) with its attempt and stable counts, followed by the
//! projects that were excluded and why.
//!
//! 打印已完成批处理的彩色本地化摘要：每个（项目，变体）一行，
//! 显示尝试次数和稳定次数，随后列出被排除的项目及原因。

use colored::*;

use crate::core::batch::BatchOutcome;
use crate::core::models::{VariantResults, or_unobserved};
use crate::infra::t;

/// Prints the batch summary table.
///
/// # Output Format / 输出格式
/// ```text
/// --- Batch Summary ---
///   - STANDARD  | commons-lang                   | 2 attempts, 1 stable |    45210ms
///   - CUSTOM    | commons-lang                   | 1 attempts, 1 stable |    44012ms
///   - Excluded  | commons-io                     | bootstrap build failed (exit code 1)
/// ```
pub fn print_summary(outcome: &BatchOutcome, locale: &str) {
    println!("\n{}", t!("batch_summary_banner", locale = locale).bold());

    for group in outcome.results.iter() {
        if group.variants().is_empty() {
            println!(
                "  - {:<9} | {:<30} | {}",
                "-".dimmed(),
                group.project_name(),
                t!("no_variants_run", locale = locale).dimmed()
            );
        }
        for variant in group.variants() {
            println!(
                "  - {:<9} | {:<30} | {} | {:>10}",
                colored_label(variant),
                group.project_name(),
                t!(
                    "attempt_counts",
                    locale = locale,
                    attempts = variant.attempts.len(),
                    stable = variant.stable_count()
                ),
                format!("{}ms", or_unobserved(variant.mean_stable_elapsed()))
            );
        }
    }

    for failure in &outcome.failures {
        println!(
            "  - {:<9} | {:<30} | {}",
            t!("excluded_label", locale = locale).red(),
            failure.project,
            failure.error
        );
    }

    let elapsed = outcome.finished_at - outcome.started_at;
    println!(
        "\n{}",
        t!(
            "batch_totals",
            locale = locale,
            retained = outcome.results.len(),
            excluded = outcome.failures.len(),
            attempts = outcome.results.total_attempts(),
            seconds = elapsed.num_seconds()
        )
        .cyan()
    );
}

fn colored_label(variant: &VariantResults) -> ColoredString {
    let label = variant.variant.label();
    if variant.stable_count() > 0 {
        label.green()
    } else {
        label.yellow()
    }
}

//! # Project Orchestration Module / 项目编排模块
//!
//! Drives one project through its pipeline: a one-time compile bootstrap,
//! then for every selected runner variant a descriptor switch followed by
//! the retry loop. The finished results are sealed into a `ResultGroup`.
//!
//! 驱动单个项目完成其流程：一次性编译引导，然后对每个选中的运行器变体
//! 切换描述文件并执行重试循环。最终结果被封装为 `ResultGroup`。

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::core::config::RunSettings;
use crate::core::descriptor::apply_variant;
use crate::core::errors::ProjectError;
use crate::core::metrics::{MetricExtractor, read_phase_log};
use crate::core::models::{Project, ResultGroup, ResultGroupBuilder, RunVariant, TestRunResult};
use crate::core::retry::run_with_retry;
use crate::infra::command::{BuildInvoker, InvocationOutcome, InvocationRequest};
use crate::infra::fs::{BUILD_OUTPUT_DIR, DESCRIPTOR_FILE};

/// Marker left in the build output directory after a successful bootstrap.
pub const BOOTSTRAP_MARKER: &str = ".runner-matrix-bootstrapped";

pub struct ProjectOrchestrator<'a, I> {
    invoker: &'a I,
    settings: &'a RunSettings,
}

impl<'a, I: BuildInvoker> ProjectOrchestrator<'a, I> {
    pub fn new(invoker: &'a I, settings: &'a RunSettings) -> Self {
        Self { invoker, settings }
    }

    /// Runs the full pipeline for `project`.
    ///
    /// Any error is fatal for the whole project; no partial group is returned.
    pub async fn run(&self, project: &Project) -> Result<ResultGroup, ProjectError> {
        self.bootstrap(project).await?;

        let mut group = ResultGroupBuilder::new(project.name());
        for variant in self.settings.selected_variants() {
            info!(
                "[{}] Switching runner to {} ({})",
                project.name(),
                variant.label(),
                variant.runner_version
            );
            apply_variant(project, &variant.runner_version)?;

            let attempts = run_with_retry(self.settings.policy, |attempt| {
                self.run_attempt(project, &variant, attempt)
            })
            .await?;
            group.record(variant, attempts);
        }
        Ok(group.seal())
    }

    fn marker_path(project: &Project) -> PathBuf {
        project.root().join(BUILD_OUTPUT_DIR).join(BOOTSTRAP_MARKER)
    }

    /// Compiles the project once so test attempts measure only the test phase.
    async fn bootstrap(&self, project: &Project) -> Result<(), ProjectError> {
        let marker = Self::marker_path(project);
        if marker.is_file() {
            return Ok(());
        }

        info!("[{}] Bootstrapping with clean compile", project.name());
        let request =
            InvocationRequest::new(project.root().join(DESCRIPTOR_FILE), &["clean", "compile"]).quiet();
        let outcome = self.invoker.invoke(request, &mut |_: &str| {}).await?;
        check_cancelled(&outcome)?;
        if !outcome.success() {
            return Err(ProjectError::Bootstrap {
                exit_code: outcome.exit_code,
                timed_out: outcome.timed_out,
            });
        }

        if let Some(dir) = marker.parent() {
            fs::create_dir_all(dir).map_err(|e| ProjectError::io(dir, e))?;
        }
        fs::write(&marker, b"").map_err(|e| ProjectError::io(&marker, e))?;
        Ok(())
    }

    /// One `test` invocation and its parsed result.
    async fn run_attempt(
        &self,
        project: &Project,
        variant: &RunVariant,
        attempt: u32,
    ) -> Result<TestRunResult, ProjectError> {
        let phase_log = project.root().join(&self.settings.phase_log);
        remove_stale(&phase_log)?;

        info!(
            "[{}] Running tests [{}/{}] - {}",
            project.name(),
            attempt + 1,
            self.settings.policy.max_attempts,
            variant.label()
        );

        let mut extractor = MetricExtractor::new();
        let mut raw_log = String::new();
        let request = InvocationRequest::new(project.root().join(DESCRIPTOR_FILE), &["test"]);
        let outcome = self
            .invoker
            .invoke(request, &mut |line: &str| {
                raw_log.push_str(line);
                raw_log.push('\n');
                extractor.consume(line);
            })
            .await?;
        check_cancelled(&outcome)?;

        let failed = !outcome.success();
        let elapsed_millis = match read_phase_log(&phase_log, &self.settings.runner_plugin)? {
            Some(millis) => Some(millis),
            None if failed => None,
            None => return Err(ProjectError::MissingArtifact { path: phase_log }),
        };

        let result = TestRunResult {
            attempt,
            counts: extractor.counts(),
            elapsed_millis,
            raw_log,
            failed,
            exit_code: outcome.exit_code,
            timed_out: outcome.timed_out,
        };
        if failed {
            warn!("[{}] {} {}", project.name(), variant.label(), result);
        } else {
            info!("[{}] {} {}", project.name(), variant.label(), result);
        }
        Ok(result)
    }
}

fn check_cancelled(outcome: &InvocationOutcome) -> Result<(), ProjectError> {
    if outcome.cancelled {
        Err(ProjectError::Cancelled)
    } else {
        Ok(())
    }
}

fn remove_stale(path: &std::path::Path) -> Result<(), ProjectError> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(ProjectError::io(path, e)),
        _ => Ok(()),
    }
}

//! # Batch Coordination Module / 批处理协调模块
//!
//! Runs every candidate project through its orchestration on a bounded
//! worker pool, isolates per-project failures, and gathers the surviving
//! result groups through a single collector.
//!
//! 在有界的工作池上对每个候选项目执行编排，隔离单个项目的失败，
//! 并通过单一收集器汇总成功的结果组。

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::{StreamExt, stream};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::core::config::RunSettings;
use crate::core::errors::ProjectError;
use crate::core::models::{Project, ResultGroup, ResultSet};
use crate::core::orchestrator::ProjectOrchestrator;
use crate::infra::command::BuildInvoker;
use crate::infra::fs::list_subdirectories;

/// Default pool width: all cores but one, at least one.
pub fn default_jobs() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

/// Lists the candidate projects under `root`, in directory-name order.
pub fn discover_projects(root: &Path) -> Result<Vec<Project>> {
    Ok(list_subdirectories(root)?
        .into_iter()
        .map(Project::new)
        .collect())
}

/// A project excluded from the aggregate, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectFailure {
    pub project: String,
    pub error: String,
}

/// Everything a batch produced.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: ResultSet,
    pub failures: Vec<ProjectFailure>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct BatchCoordinator<I> {
    invoker: Arc<I>,
    settings: Arc<RunSettings>,
    jobs: usize,
    cancel: CancellationToken,
}

impl<I: BuildInvoker + 'static> BatchCoordinator<I> {
    pub fn new(invoker: I, settings: RunSettings, jobs: usize, cancel: CancellationToken) -> Self {
        Self {
            invoker: Arc::new(invoker),
            settings: Arc::new(settings),
            jobs: jobs.max(1),
            cancel,
        }
    }

    /// Runs every project and collects the results of those that succeeded.
    ///
    /// Never fails: each project's error is logged and turned into a
    /// `ProjectFailure`.
    pub async fn run(&self, projects: Vec<Project>) -> BatchOutcome {
        let started_at = Utc::now();
        info!("Running {} projects with {} workers", projects.len(), self.jobs);

        let outcomes = stream::iter(projects.into_iter().map(|project| {
            let invoker = Arc::clone(&self.invoker);
            let settings = Arc::clone(&self.settings);
            let cancel = self.cancel.clone();
            let name = project.name().to_string();

            let handle = tokio::spawn(async move {
                if cancel.is_cancelled() {
                    return Err(ProjectError::Cancelled);
                }
                ProjectOrchestrator::new(invoker.as_ref(), settings.as_ref())
                    .run(&project)
                    .await
            });
            async move { (name, handle.await) }
        }))
        .buffer_unordered(self.jobs)
        .collect::<Vec<_>>()
        .await;

        let mut results = ResultSet::new();
        let mut failures = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(Ok(group)) => self.collect(&mut results, &mut failures, group),
                Ok(Err(e)) => {
                    error!("Skipping \"{name}\" due to error: {e}");
                    failures.push(ProjectFailure {
                        project: name,
                        error: e.to_string(),
                    });
                }
                Err(join_error) => {
                    error!("Skipping \"{name}\": worker task failed: {join_error}");
                    failures.push(ProjectFailure {
                        project: name,
                        error: format!("worker task failed: {join_error}"),
                    });
                }
            }
        }
        failures.sort_by(|a, b| a.project.cmp(&b.project));

        BatchOutcome {
            results,
            failures,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn collect(&self, results: &mut ResultSet, failures: &mut Vec<ProjectFailure>, group: ResultGroup) {
        let name = group.project_name().to_string();
        if results.insert(group) {
            info!("Collected results for \"{name}\"");
        } else {
            warn!("Discarding duplicate results for \"{name}\"");
            failures.push(ProjectFailure {
                project: name,
                error: "duplicate project name".to_string(),
            });
        }
    }
}

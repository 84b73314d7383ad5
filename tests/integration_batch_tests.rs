//! # Batch Integration Tests / 批处理集成测试
//!
//! Drives the orchestrator and the batch coordinator end to end against a
//! scripted build tool, then renders the reports from the outcome.
//!
//! 使用脚本化的构建工具端到端驱动编排器和批处理协调器，然后根据结果生成报告。

mod common;

use common::{
    PHASE_LOG, POM_WITHOUT_BUILD, ScriptedAttempt, ScriptedInvoker, create_project, setup_repositories,
};
use runner_matrix::core::batch::{BatchCoordinator, discover_projects};
use runner_matrix::core::config::{BatchConfig, RunSettings};
use runner_matrix::core::errors::ProjectError;
use runner_matrix::core::models::{PhaseSelector, Project, TestCounts, VariantKind};
use runner_matrix::core::orchestrator::{BOOTSTRAP_MARKER, ProjectOrchestrator};
use runner_matrix::core::retry::RetryPolicy;
use runner_matrix::reporting::csv::render_csv;
use runner_matrix::reporting::logs::{SUMMARY_FILE, attempt_log_path};
use runner_matrix::reporting::write_log_mirror;
use std::fs;
use tokio_util::sync::CancellationToken;

fn settings(phase: PhaseSelector, policy: RetryPolicy) -> RunSettings {
    RunSettings::from_config(&BatchConfig::default(), phase, policy)
}

fn single_run() -> RetryPolicy {
    RetryPolicy::default()
}

#[cfg(test)]
mod orchestrator_tests {
    use super::*;

    #[tokio::test]
    async fn test_runs_every_variant_in_order() {
        let repos = setup_repositories(&["lib-master"]);
        let invoker = ScriptedInvoker::new().project(
            "lib-master",
            0,
            vec![
                ScriptedAttempt::passing(12, 1500),
                ScriptedAttempt::failing(12, 2),
                ScriptedAttempt::passing(12, 1400),
                ScriptedAttempt::passing(12, 900),
            ],
        );
        let settings = settings(PhaseSelector::All, single_run());
        let project = Project::new(repos.path().join("lib-master"));

        let group = ProjectOrchestrator::new(&invoker, &settings)
            .run(&project)
            .await
            .unwrap();

        assert_eq!(group.project_name(), "lib");
        let kinds: Vec<_> = group.variants().iter().map(|v| v.variant.kind).collect();
        assert_eq!(kinds, vec![VariantKind::Standard, VariantKind::Custom, VariantKind::Fork]);
        assert_eq!(group.attempts(VariantKind::Standard).len(), 1);
        assert_eq!(group.attempts(VariantKind::Custom).len(), 2);
        assert_eq!(group.attempts(VariantKind::Fork).len(), 1);

        let custom = group.attempts(VariantKind::Custom);
        assert!(custom[0].failed);
        assert_eq!(custom[0].counts, Some(TestCounts::new(12, 2, 0, 0)));
        assert_eq!(custom[1].elapsed_millis, Some(1400));
        assert!(custom[1].raw_log.contains("Tests run: 12"));

        let goals = invoker.calls_for("lib-master");
        assert_eq!(goals[0], vec!["clean".to_string(), "compile".to_string()]);
        assert!(goals[1..].iter().all(|g| g == &vec!["test".to_string()]));
        assert_eq!(goals.len(), 5);
    }

    #[tokio::test]
    async fn test_existing_marker_skips_bootstrap() {
        let repos = setup_repositories(&["warm"]);
        let target = repos.path().join("warm").join("target");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join(BOOTSTRAP_MARKER), "").unwrap();

        let invoker = ScriptedInvoker::new();
        let settings = settings(PhaseSelector::Only(VariantKind::Fork), single_run());
        ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(repos.path().join("warm")))
            .await
            .unwrap();

        assert_eq!(invoker.calls_for("warm"), vec![vec!["test".to_string()]]);
    }

    #[tokio::test]
    async fn test_successful_bootstrap_leaves_marker() {
        let repos = setup_repositories(&["cold"]);
        let invoker = ScriptedInvoker::new();
        let settings = settings(PhaseSelector::None, single_run());

        let group = ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(repos.path().join("cold")))
            .await
            .unwrap();

        assert!(group.variants().is_empty());
        assert!(repos.path().join("cold/target").join(BOOTSTRAP_MARKER).is_file());
    }

    #[tokio::test]
    async fn test_failed_bootstrap_is_fatal() {
        let repos = setup_repositories(&["broken"]);
        let invoker = ScriptedInvoker::new().project("broken", 1, vec![]);
        let settings = settings(PhaseSelector::All, single_run());

        let result = ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(repos.path().join("broken")))
            .await;

        assert!(matches!(
            result,
            Err(ProjectError::Bootstrap { exit_code: Some(1), timed_out: false })
        ));
        assert_eq!(invoker.calls_for("broken").len(), 1);
    }

    #[tokio::test]
    async fn test_missing_phase_log_after_success_is_fatal() {
        let repos = setup_repositories(&["nolog"]);
        let mut attempt = ScriptedAttempt::passing(3, 10);
        attempt.phase_log = None;
        let invoker = ScriptedInvoker::new().project("nolog", 0, vec![attempt]);
        let settings = settings(PhaseSelector::Only(VariantKind::Standard), single_run());

        let result = ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(repos.path().join("nolog")))
            .await;

        match result {
            Err(ProjectError::MissingArtifact { path }) => {
                assert_eq!(path, repos.path().join("nolog").join(PHASE_LOG));
            }
            other => panic!("expected MissingArtifact, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_phase_log_after_failure_is_unobserved() {
        let repos = setup_repositories(&["flaky"]);
        let mut failing = ScriptedAttempt::failing(3, 1);
        failing.phase_log = None;
        failing.lines.clear();
        let invoker = ScriptedInvoker::new().project("flaky", 0, vec![failing]);
        let settings = settings(PhaseSelector::Only(VariantKind::Standard), single_run());

        let group = ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(repos.path().join("flaky")))
            .await
            .unwrap();

        let attempts = group.attempts(VariantKind::Standard);
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[0].counts, None);
        assert_eq!(attempts[0].elapsed_millis, None);
        assert!(!attempts[1].failed);
    }

    #[tokio::test]
    async fn test_timeout_is_a_failed_attempt() {
        let repos = setup_repositories(&["slow"]);
        let invoker = ScriptedInvoker::new().project("slow", 0, vec![ScriptedAttempt::timing_out()]);
        let settings = settings(PhaseSelector::Only(VariantKind::Custom), single_run());

        let group = ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(repos.path().join("slow")))
            .await
            .unwrap();

        let attempts = group.attempts(VariantKind::Custom);
        assert_eq!(attempts.len(), 2);
        assert!(attempts[0].failed);
        assert!(attempts[0].timed_out);
        assert_eq!(attempts[0].exit_code, None);
        assert_eq!(attempts[0].elapsed_millis, None);
        assert!(attempts[0].raw_log.contains("SlowTest"));
    }

    #[tokio::test]
    async fn test_kill_on_fail_drops_the_project() {
        let repos = setup_repositories(&["strict"]);
        let invoker = ScriptedInvoker::new().project("strict", 0, vec![ScriptedAttempt::failing(5, 5)]);
        let policy = RetryPolicy {
            kill_on_fail: true,
            ..RetryPolicy::default()
        };
        let settings = settings(PhaseSelector::All, policy);

        let result = ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(repos.path().join("strict")))
            .await;
        assert!(matches!(result, Err(ProjectError::InvocationFailed { attempt: 0, .. })));
    }

    #[tokio::test]
    async fn test_descriptor_is_switched_before_each_variant() {
        let dir = tempfile::tempdir().unwrap();
        let root = create_project(dir.path(), "bare", POM_WITHOUT_BUILD);
        let invoker = ScriptedInvoker::new();
        let settings = settings(PhaseSelector::Only(VariantKind::Fork), single_run());

        ProjectOrchestrator::new(&invoker, &settings)
            .run(&Project::new(&root))
            .await
            .unwrap();

        let pom = fs::read_to_string(root.join("pom.xml")).unwrap();
        assert!(pom.contains("<version>2.21.0</version>"));
        assert!(pom.contains("<reuseForks>false</reuseForks>"));
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_project_is_excluded_and_others_survive() {
        let repos = setup_repositories(&["a", "b", "c"]);
        let invoker = ScriptedInvoker::new().project("b", 2, vec![]);
        let projects = discover_projects(repos.path()).unwrap();

        let outcome = BatchCoordinator::new(
            invoker,
            settings(PhaseSelector::All, single_run()),
            2,
            CancellationToken::new(),
        )
        .run(projects)
        .await;

        assert_eq!(outcome.results.names(), vec!["a", "c"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].project, "b");
        assert!(outcome.failures[0].error.contains("bootstrap"));
        assert!(outcome.finished_at >= outcome.started_at);
    }

    #[tokio::test]
    async fn test_sequential_and_parallel_runs_agree() {
        let names = ["p1", "p2", "p3", "p4"];
        let mut totals = Vec::new();
        for jobs in [1, 4] {
            let repos = setup_repositories(&names);
            let outcome = BatchCoordinator::new(
                ScriptedInvoker::new(),
                settings(PhaseSelector::All, single_run()),
                jobs,
                CancellationToken::new(),
            )
            .run(discover_projects(repos.path()).unwrap())
            .await;
            totals.push((outcome.results.names().len(), outcome.results.total_attempts()));
        }
        assert_eq!(totals[0], totals[1]);
        assert_eq!(totals[0], (4, 12));
    }

    #[tokio::test]
    async fn test_cancelled_batch_starts_nothing() {
        let repos = setup_repositories(&["x", "y"]);
        let invoker = ScriptedInvoker::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = BatchCoordinator::new(
            invoker.clone(),
            settings(PhaseSelector::All, single_run()),
            2,
            cancel,
        )
        .run(discover_projects(repos.path()).unwrap())
        .await;

        assert!(outcome.results.is_empty());
        assert_eq!(outcome.failures.len(), 2);
        assert!(invoker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_display_names_keep_one_group() {
        let repos = setup_repositories(&["dup-main", "dup-master"]);
        let outcome = BatchCoordinator::new(
            ScriptedInvoker::new(),
            settings(PhaseSelector::Only(VariantKind::Standard), single_run()),
            1,
            CancellationToken::new(),
        )
        .run(discover_projects(repos.path()).unwrap())
        .await;

        assert_eq!(outcome.results.names(), vec!["dup"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].project, "dup");
    }

    #[test]
    fn test_discovery_skips_files_and_sorts() {
        let repos = setup_repositories(&["zeta", "alpha-master"]);
        fs::write(repos.path().join("notes.txt"), "not a project").unwrap();

        let names: Vec<_> = discover_projects(repos.path())
            .unwrap()
            .iter()
            .map(|p| p.name().to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_discovery_of_missing_root_fails() {
        let repos = setup_repositories(&[]);
        assert!(discover_projects(&repos.path().join("absent")).is_err());
    }
}

#[cfg(test)]
mod report_tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_cover_every_attempt() {
        let repos = setup_repositories(&["alpha", "beta"]);
        let invoker = ScriptedInvoker::new()
            .project("alpha", 0, vec![ScriptedAttempt::failing(4, 1), ScriptedAttempt::passing(4, 250)])
            .project("beta", 0, vec![{
                let mut silent = ScriptedAttempt::passing(0, 75);
                silent.lines.clear();
                silent
            }]);

        let outcome = BatchCoordinator::new(
            invoker,
            settings(PhaseSelector::Only(VariantKind::Standard), single_run()),
            2,
            CancellationToken::new(),
        )
        .run(discover_projects(repos.path()).unwrap())
        .await;

        let csv = render_csv(&outcome.results).unwrap();
        let rows: Vec<&str> = csv.lines().collect();
        assert_eq!(rows.len(), outcome.results.total_attempts() + 1);
        assert_eq!(rows[0], "PROJECT,CONFIG,TOTAL,FAILS,ERRORS,SKIPPED,TEST_TIME");
        assert_eq!(rows[1], "alpha,STANDARD,4,1,0,0,10");
        assert_eq!(rows[2], "alpha,STANDARD,4,0,0,0,250");
        assert_eq!(rows[3], "beta,STANDARD,-1,-1,-1,-1,75");

        let log_dir = repos.path().join("logs");
        fs::create_dir_all(log_dir.join("stale")).unwrap();
        let written = write_log_mirror(&outcome, &log_dir).unwrap();

        assert_eq!(written, 3);
        assert!(!log_dir.join("stale").exists());
        let second = fs::read_to_string(attempt_log_path(&log_dir, "alpha", "standard", 1)).unwrap();
        assert!(second.contains("Tests run: 4, Failures: 0"));

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(log_dir.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["retained"], serde_json::json!(["alpha", "beta"]));
        assert_eq!(summary["total_attempts"], 3);
    }
}

// Shared test helpers for integration tests
#![allow(dead_code)]

use runner_matrix::infra::command::{
    BuildInvoker, InvocationError, InvocationOutcome, InvocationRequest, LineSink,
};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

pub const PHASE_LOG: &str = "maven.build.log";
pub const RUNNER_KEY: &str = "org.apache.maven.plugins:maven-surefire-plugin";

/// A root descriptor that already declares the runner plugin.
pub const POM_WITH_RUNNER: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>org.example</groupId>
  <artifactId>sample</artifactId>
  <version>1.0</version>
  <build>
    <plugins>
      <plugin>
        <groupId>org.apache.maven.plugins</groupId>
        <artifactId>maven-surefire-plugin</artifactId>
        <version>2.12.4</version>
      </plugin>
    </plugins>
  </build>
</project>
"#;

/// A root descriptor without any build section.
pub const POM_WITHOUT_BUILD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0">
  <modelVersion>4.0.0</modelVersion>
  <groupId>org.example</groupId>
  <artifactId>bare</artifactId>
  <version>1.0</version>
</project>
"#;

/// A module descriptor that inherits the runner from its parent.
pub const MODULE_POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
  <modelVersion>4.0.0</modelVersion>
  <artifactId>module</artifactId>
</project>
"#;

/// One phase-log row for the runner with the given duration.
pub fn phase_row(millis: u64) -> String {
    format!("{RUNNER_KEY}\ttest\tdefault-test\tmodule\t1700000000000\t{millis}\n")
}

/// A Surefire results block for one module.
pub fn summary_lines(total: u64, fails: u64, errors: u64, skipped: u64) -> Vec<String> {
    vec![
        "[INFO] Results:".to_string(),
        "[INFO] ".to_string(),
        format!("[INFO] Tests run: {total}, Failures: {fails}, Errors: {errors}, Skipped: {skipped}"),
    ]
}

/// Creates `<root>/<dir>/pom.xml` with `pom`.
pub fn create_project(root: &Path, dir: &str, pom: &str) -> PathBuf {
    let project = root.join(dir);
    fs::create_dir_all(&project).expect("Failed to create project directory");
    fs::write(project.join("pom.xml"), pom).expect("Failed to write pom.xml");
    project
}

pub fn setup_repositories(names: &[&str]) -> TempDir {
    let temp_dir = tempdir().expect("Failed to create temporary directory");
    for name in names {
        create_project(temp_dir.path(), name, POM_WITH_RUNNER);
    }
    temp_dir
}

/// What a scripted `test` invocation prints and leaves behind.
#[derive(Debug, Clone)]
pub struct ScriptedAttempt {
    pub exit_code: i32,
    pub lines: Vec<String>,
    pub phase_log: Option<String>,
    pub timed_out: bool,
}

impl ScriptedAttempt {
    pub fn passing(total: u64, millis: u64) -> Self {
        Self {
            exit_code: 0,
            lines: summary_lines(total, 0, 0, 0),
            phase_log: Some(phase_row(millis)),
            timed_out: false,
        }
    }

    pub fn failing(total: u64, fails: u64) -> Self {
        Self {
            exit_code: 1,
            lines: summary_lines(total, fails, 0, 0),
            phase_log: Some(phase_row(10)),
            timed_out: false,
        }
    }

    /// Killed at the deadline after printing a partial log.
    pub fn timing_out() -> Self {
        Self {
            exit_code: -1,
            lines: vec!["[INFO] Running org.example.SlowTest".to_string()],
            phase_log: None,
            timed_out: true,
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedProject {
    bootstrap_exit: i32,
    attempts: VecDeque<ScriptedAttempt>,
}

/// An in-process build tool keyed by project directory name.
///
/// Attempts are consumed in order; once a project's script is exhausted
/// every further attempt passes. Clones share the script and call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInvoker {
    projects: Arc<Mutex<HashMap<String, ScriptedProject>>>,
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(self, dir: &str, bootstrap_exit: i32, attempts: Vec<ScriptedAttempt>) -> Self {
        self.projects.lock().unwrap().insert(
            dir.to_string(),
            ScriptedProject {
                bootstrap_exit,
                attempts: attempts.into(),
            },
        );
        self
    }

    /// `(project dir, goals)` of every invocation so far.
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, dir: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|(d, _)| d == dir)
            .map(|(_, goals)| goals)
            .collect()
    }

    fn next(&self, dir: &str, bootstrap: bool) -> ScriptedAttempt {
        let mut projects = self.projects.lock().unwrap();
        let project = projects.entry(dir.to_string()).or_insert(ScriptedProject {
            bootstrap_exit: 0,
            attempts: VecDeque::new(),
        });
        if bootstrap {
            return ScriptedAttempt {
                exit_code: project.bootstrap_exit,
                lines: vec!["[INFO] BUILD".to_string()],
                phase_log: None,
                timed_out: false,
            };
        }
        project
            .attempts
            .pop_front()
            .unwrap_or_else(|| ScriptedAttempt::passing(1, 100))
    }
}

impl BuildInvoker for ScriptedInvoker {
    async fn invoke(
        &self,
        request: InvocationRequest,
        on_line: LineSink<'_>,
    ) -> Result<InvocationOutcome, InvocationError> {
        tokio::task::yield_now().await;

        let project_dir = request.descriptor.parent().unwrap().to_path_buf();
        let dir = project_dir.file_name().unwrap().to_string_lossy().into_owned();
        let bootstrap = request.goals.iter().any(|g| g == "compile");

        self.calls
            .lock()
            .unwrap()
            .push((dir.clone(), request.goals.clone()));
        let script = self.next(&dir, bootstrap);

        if let Some(log) = &script.phase_log {
            fs::write(project_dir.join(PHASE_LOG), log)?;
        }
        for line in &script.lines {
            on_line(line);
        }

        Ok(InvocationOutcome {
            exit_code: (!script.timed_out).then_some(script.exit_code),
            timed_out: script.timed_out,
            cancelled: false,
            duration: Duration::from_millis(1),
        })
    }
}

/// Writes an executable fake `mvn` under `<home>/bin` that replays `script`.
///
/// The script sees the same arguments as the real launcher, so it can
/// inspect `$@` to tell the bootstrap from a test run.
#[cfg(unix)]
pub fn fake_maven_home(root: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let home = root.join("maven-home");
    let bin = home.join("bin");
    fs::create_dir_all(&bin).expect("Failed to create fake maven bin");
    let mvn = bin.join("mvn");
    fs::write(&mvn, format!("#!/bin/sh\n{script}\n")).expect("Failed to write fake mvn");
    fs::set_permissions(&mvn, fs::Permissions::from_mode(0o755)).expect("Failed to chmod fake mvn");
    home
}

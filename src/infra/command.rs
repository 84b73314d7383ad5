//! # Command Execution Module / 命令执行模块
//!
//! Runs the external build tool, streaming its merged stdout/stderr line by
//! line to a caller-supplied callback while enforcing a hard timeout and
//! honouring batch-wide cancellation.
//!
//! 运行外部构建工具，将其合并的 stdout/stderr 逐行传递给调用者提供的回调，
//! 同时强制执行硬超时并响应批处理级别的取消。

use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How long output is still read after the process has exited.
const DRAIN_GRACE: Duration = Duration::from_secs(10);

/// Infrastructure failures, as opposed to a non-zero exit status.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("failed to launch '{}': {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while running the build tool: {0}")]
    Io(#[from] io::Error),
}

/// One build tool invocation.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// The descriptor the goals run against.
    pub descriptor: PathBuf,
    pub goals: Vec<String>,
    /// Never relay this invocation's output to the log sink.
    pub quiet: bool,
}

impl InvocationRequest {
    pub fn new(descriptor: impl Into<PathBuf>, goals: &[&str]) -> Self {
        Self {
            descriptor: descriptor.into(),
            goals: goals.iter().map(|g| g.to_string()).collect(),
            quiet: false,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// Exit code; `None` when the process was killed or ended by a signal.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub cancelled: bool,
    pub duration: Duration,
}

impl InvocationOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out && !self.cancelled
    }

    fn exited(status: ExitStatus, duration: Duration) -> Self {
        Self {
            exit_code: status.code(),
            timed_out: false,
            cancelled: false,
            duration,
        }
    }
}

/// Callback receiving each output line as it is produced.
pub type LineSink<'a> = &'a mut (dyn FnMut(&str) + Send);

/// Runs build tool goals. Implemented by [`MavenInvoker`]; tests substitute
/// scripted implementations.
pub trait BuildInvoker: Send + Sync {
    fn invoke(
        &self,
        request: InvocationRequest,
        on_line: LineSink<'_>,
    ) -> impl Future<Output = Result<InvocationOutcome, InvocationError>> + Send;
}

/// Invokes `mvn` as a subprocess.
#[derive(Debug, Clone)]
pub struct MavenInvoker {
    maven_home: Option<PathBuf>,
    options: Vec<String>,
    timeout: Duration,
    verbose: bool,
    cancel: CancellationToken,
}

impl MavenInvoker {
    pub fn new(
        maven_home: Option<PathBuf>,
        options: Vec<String>,
        timeout: Duration,
        verbose: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            maven_home,
            options,
            timeout,
            verbose,
            cancel,
        }
    }

    /// The `mvn` launcher: from the configured home, or `PATH` otherwise.
    pub fn executable(&self) -> PathBuf {
        let launcher = if cfg!(windows) { "mvn.cmd" } else { "mvn" };
        match &self.maven_home {
            Some(home) => home.join("bin").join(launcher),
            None => PathBuf::from(launcher),
        }
    }

    /// Full argument list for a request.
    pub fn arguments(&self, request: &InvocationRequest) -> Vec<String> {
        let mut args = vec![
            "-B".to_string(),
            "-f".to_string(),
            request.descriptor.display().to_string(),
        ];
        args.extend(request.goals.iter().cloned());
        args.extend(self.options.iter().cloned());
        args
    }

    fn command(&self, request: &InvocationRequest) -> Command {
        let mut cmd = Command::new(self.executable());
        cmd.args(self.arguments(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = request.descriptor.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        if let Some(home) = &self.maven_home {
            cmd.env("MAVEN_HOME", home);
        }
        cmd
    }
}

impl BuildInvoker for MavenInvoker {
    async fn invoke(
        &self,
        request: InvocationRequest,
        on_line: LineSink<'_>,
    ) -> Result<InvocationOutcome, InvocationError> {
        let relay = self.verbose && !request.quiet;
        info!(
            "Running mvn {} on {}",
            request.goals.join(" "),
            request.descriptor.display()
        );

        let mut child = self.command(&request).spawn().map_err(|source| InvocationError::Spawn {
            program: self.executable(),
            source,
        })?;

        spawn_and_stream(&mut child, self.timeout, &self.cancel, &mut |line: &str| {
            if relay {
                debug!(target: "mvn", "{line}");
            }
            on_line(line);
        })
        .await
    }
}

enum Wake {
    Line(Option<io::Result<String>>),
    Exited(io::Result<ExitStatus>),
    Deadline,
    Cancelled,
}

/// Streams a spawned child's merged stdout/stderr to `on_line` until it
/// exits, the timeout elapses, or `cancel` fires.
///
/// On timeout or cancellation the child is killed and reaped before
/// returning, so no process outlives its invocation.
///
/// # Arguments
/// * `child` - A child spawned with piped stdout and stderr
/// * `timeout` - Hard wall-clock limit
/// * `cancel` - Batch-wide cancellation token
/// * `on_line` - Receives every line, in arrival order
pub async fn spawn_and_stream(
    child: &mut Child,
    timeout: Duration,
    cancel: &CancellationToken,
    on_line: &mut (dyn FnMut(&str) + Send),
) -> Result<InvocationOutcome, InvocationError> {
    let start = Instant::now();
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("stderr was not captured"))?;

    let lines = LinesStream::new(BufReader::new(stdout).lines())
        .merge(LinesStream::new(BufReader::new(stderr).lines()));
    tokio::pin!(lines);
    let mut streams_open = true;

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut outcome = loop {
        let wake = tokio::select! {
            line = lines.next(), if streams_open => Wake::Line(line),
            status = child.wait() => Wake::Exited(status),
            _ = &mut deadline => Wake::Deadline,
            _ = cancel.cancelled() => Wake::Cancelled,
        };

        match wake {
            Wake::Line(Some(Ok(line))) => on_line(&line),
            Wake::Line(Some(Err(e))) => {
                warn!("Stopped reading build output: {e}");
                streams_open = false;
            }
            Wake::Line(None) => streams_open = false,
            Wake::Exited(status) => break InvocationOutcome::exited(status?, start.elapsed()),
            Wake::Deadline => {
                warn!("Build tool exceeded {}s, killing it", timeout.as_secs());
                child.kill().await?;
                break InvocationOutcome {
                    exit_code: None,
                    timed_out: true,
                    cancelled: false,
                    duration: start.elapsed(),
                };
            }
            Wake::Cancelled => {
                child.kill().await?;
                break InvocationOutcome {
                    exit_code: None,
                    timed_out: false,
                    cancelled: true,
                    duration: start.elapsed(),
                };
            }
        }
    };

    // Drain what the pipes still hold after the process exited. A leftover
    // grandchild may keep them open, so the drain is bounded.
    if streams_open && !outcome.timed_out && !outcome.cancelled {
        let drain = async {
            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => on_line(&line),
                    Err(e) => {
                        warn!("Stopped reading build output: {e}");
                        break;
                    }
                }
            }
        };
        if tokio::time::timeout(DRAIN_GRACE, drain).await.is_err() {
            warn!("Build output still open {}s after exit, ignoring the rest", DRAIN_GRACE.as_secs());
        }
    }
    outcome.duration = start.elapsed();
    Ok(outcome)
}

//! # Error Taxonomy / 错误分类
//!
//! Fatal, project-scoped errors. Expected outcomes such as a failing test
//! invocation travel as data (`TestRunResult::failed`); only the conditions
//! below abort a project's orchestration.
//!
//! 项目级致命错误。预期的结果（例如测试调用失败）作为数据传递；
//! 只有以下情况会中止项目的编排。

use std::path::PathBuf;
use thiserror::Error;

use crate::infra::command::InvocationError;
use crate::infra::xml::XmlError;

#[derive(Debug, Error)]
pub enum ProjectError {
    /// The root descriptor has several `build/plugins` sections to choose from.
    #[error("{} has {sections} candidate build/plugins sections; cannot decide where to add the runner plugin", .descriptor.display())]
    AmbiguousBuildSection { descriptor: PathBuf, sections: usize },

    /// The initial `clean compile` did not succeed.
    #[error("bootstrap compile failed ({})", describe_exit(.exit_code, .timed_out))]
    Bootstrap {
        exit_code: Option<i32>,
        timed_out: bool,
    },

    /// A test invocation failed while kill-on-fail is active.
    #[error("test invocation {attempt} failed ({})", describe_exit(.exit_code, .timed_out))]
    InvocationFailed {
        attempt: u32,
        exit_code: Option<i32>,
        timed_out: bool,
    },

    /// The phase log is missing after a successful invocation.
    #[error("missing phase log {} after a successful test invocation", .path.display())]
    MissingArtifact { path: PathBuf },

    #[error("no build descriptor at {}", .path.display())]
    MissingDescriptor { path: PathBuf },

    #[error("malformed build descriptor {}: {source}", .path.display())]
    Descriptor {
        path: PathBuf,
        #[source]
        source: XmlError,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("cancelled")]
    Cancelled,
}

impl ProjectError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ProjectError::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(exit_code: &Option<i32>, timed_out: &bool) -> String {
    match (*timed_out, *exit_code) {
        (true, _) => "timed out".to_string(),
        (false, Some(code)) => format!("exit code {code}"),
        (false, None) => "terminated by signal".to_string(),
    }
}

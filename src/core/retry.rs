//! # Retry Controller Module / 重试控制模块
//!
//! Repeats test invocations for one (project, variant) pair until enough
//! stable collections have been gathered or the attempt ceiling is reached.
//!
//! 为一个（项目，变体）组合重复执行测试调用，
//! 直到收集到足够的稳定结果或达到尝试上限。

use std::future::Future;
use tracing::warn;

use crate::core::errors::ProjectError;
use crate::core::models::TestRunResult;

/// When to stop retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Hard ceiling on attempts, regardless of stability.
    pub max_attempts: u32,
    /// Successful attempts wanted before stopping.
    pub required_stable: u32,
    /// Abort the project on the first failed attempt.
    pub kill_on_fail: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 20,
            required_stable: 1,
            kill_on_fail: false,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("the attempt ceiling must be at least 1".to_string());
        }
        if self.required_stable == 0 {
            return Err("the required stable collection count must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Runs `run_once` until the policy is satisfied.
///
/// Every attempt is recorded, failed ones included, in attempt order. Errors
/// returned by `run_once` are fatal and propagate immediately.
///
/// # Arguments
/// * `policy` - Attempt ceiling, stability target and kill-on-fail flag
/// * `run_once` - Performs attempt `n` (zero-based)
///
/// # Returns
/// The recorded attempts, or the first fatal error
pub async fn run_with_retry<F, Fut>(
    policy: RetryPolicy,
    mut run_once: F,
) -> Result<Vec<TestRunResult>, ProjectError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<TestRunResult, ProjectError>>,
{
    let mut results = Vec::new();
    let mut stable = 0;

    for attempt in 0..policy.max_attempts {
        let result = run_once(attempt).await?;

        if result.failed && policy.kill_on_fail {
            return Err(ProjectError::InvocationFailed {
                attempt,
                exit_code: result.exit_code,
                timed_out: result.timed_out,
            });
        }

        if result.is_stable() {
            stable += 1;
        }
        results.push(result);

        if stable >= policy.required_stable {
            return Ok(results);
        }
    }

    warn!(
        "Gave up after {} attempts with {}/{} stable collections",
        policy.max_attempts, stable, policy.required_stable
    );
    Ok(results)
}

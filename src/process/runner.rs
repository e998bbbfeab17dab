//! Process Runner (C2)
//!
//! Executes a child command with a wall-clock timeout. Returns a non-negative
//! integer exit status; by convention `124` indicates a timeout. Child
//! stdout and stderr are discarded — this runner doesn't raise on non-zero
//! exits, those are data the caller inspects.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::warn;

use crate::errors::ProcessError;
use crate::models::ExitStatus;

/// Run `command` with `args`, discarding stdout/stderr, bounded by `timeout`.
///
/// A spawn failure (missing binary, permission denied) is the only case that
/// returns `Err` — everything else, including the child timing out or
/// exiting non-zero, is reported as data via [`ExitStatus`].
pub async fn run_with_timeout(
    command: &str,
    args: &[String],
    timeout: Duration,
) -> Result<ExitStatus, ProcessError> {
    let mut cmd = Command::new(command);
    cmd.args(args);
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|source| ProcessError::SpawnFailed {
        command: command.to_string(),
        source,
    })?;

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => Ok(ExitStatus {
            code: status.code().unwrap_or(ExitStatus::TIMEOUT),
        }),
        Ok(Err(err)) => {
            warn!("child wait failed for {}: {}", command, err);
            Ok(ExitStatus {
                code: ExitStatus::TIMEOUT,
            })
        }
        Err(_) => {
            // Timed out: best-effort kill, don't block shutdown on it.
            let _ = child.start_kill();
            Ok(ExitStatus {
                code: ExitStatus::TIMEOUT,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_success_exit() {
        let status = run_with_timeout("true", &[], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(status.success());
    }

    #[tokio::test]
    async fn reports_nonzero_exit_without_error() {
        let status = run_with_timeout("false", &[], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!status.success());
        assert!(!status.timed_out());
    }

    #[tokio::test]
    async fn reports_timeout() {
        let status = run_with_timeout(
            "sleep",
            &["5".to_string()],
            Duration::from_millis(50),
        )
        .await
        .unwrap();
        assert!(status.timed_out());
    }

    #[tokio::test]
    async fn spawn_failure_is_an_error() {
        let result = run_with_timeout(
            "definitely-not-a-real-binary-xyz",
            &[],
            Duration::from_secs(1),
        )
        .await;
        assert!(result.is_err());
    }
}

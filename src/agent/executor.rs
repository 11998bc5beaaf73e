//! Runs a persisted script in a child process with a wall-clock limit.
//!
//! `ScriptExecutor::execute` never fails: timeouts and launch errors are
//! folded into an `ExecutionResult` with the `-1` sentinel exit code, so the
//! caller can always report something back to the user.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

/// Exit code reported for timeouts and launch failures.
///
/// A script killed by signal `N` reports `-N` instead.
pub const SENTINEL_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    NonZeroExit(i32),
    Timeout,
    LaunchFailure,
}

/// Captured result of one script run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub outcome: ExecutionOutcome,
}

impl ExecutionResult {
    fn timed_out(limit: Duration) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!(
                "実行がタイムアウトしました（{}秒）。無限ループなどが原因の可能性があります。",
                format_limit(limit)
            ),
            exit_code: SENTINEL_EXIT_CODE,
            outcome: ExecutionOutcome::Timeout,
        }
    }

    fn launch_failed(err: impl std::fmt::Display) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("スクリプトの実行中に予期せぬエラーが発生しました: {}", err),
            exit_code: SENTINEL_EXIT_CODE,
            outcome: ExecutionOutcome::LaunchFailure,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.outcome == ExecutionOutcome::Timeout
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ExecutionOutcome::Success
    }
}

fn format_limit(limit: Duration) -> String {
    if limit.subsec_nanos() == 0 {
        limit.as_secs().to_string()
    } else {
        format!("{}", limit.as_secs_f64())
    }
}

/// Exit code for a finished child: the real code, else `-signal` on unix.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }
    SENTINEL_EXIT_CODE
}

/// Executes scripts with a fixed interpreter and time limit.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    interpreter: String,
    timeout: Duration,
}

impl ScriptExecutor {
    pub fn new(interpreter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            interpreter: interpreter.into(),
            timeout,
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn execute(&self, path: &Path) -> ExecutionResult {
        self.execute_with_timeout(path, self.timeout).await
    }

    /// Run `<interpreter> <path>` and wait at most `limit` for it to finish.
    ///
    /// On timeout the child is killed and reaped before returning.
    pub async fn execute_with_timeout(&self, path: &Path, limit: Duration) -> ExecutionResult {
        let mut child = match Command::new(&self.interpreter)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(interpreter = %self.interpreter, error = %e, "failed to spawn script");
                return ExecutionResult::launch_failed(e);
            }
        };

        let (Some(mut stdout), Some(mut stderr)) = (child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill().await;
            return ExecutionResult::launch_failed("stdout/stderr pipes were not captured");
        };

        let run = async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (status, _, _) = tokio::try_join!(
                child.wait(),
                stdout.read_to_end(&mut out),
                stderr.read_to_end(&mut err)
            )?;
            Ok::<_, std::io::Error>((status, out, err))
        };
        let waited = timeout(limit, run).await;

        match waited {
            Ok(Ok((status, out, err))) => {
                let exit_code = exit_code_of(status);
                let outcome = if status.success() {
                    ExecutionOutcome::Success
                } else {
                    ExecutionOutcome::NonZeroExit(exit_code)
                };
                tracing::info!(path = %path.display(), exit_code, "script finished");
                ExecutionResult {
                    stdout: String::from_utf8_lossy(&out).into_owned(),
                    stderr: String::from_utf8_lossy(&err).into_owned(),
                    exit_code,
                    outcome,
                }
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                tracing::warn!(path = %path.display(), error = %e, "script I/O failed");
                ExecutionResult::launch_failed(e)
            }
            Err(_) => {
                // kill() also waits, so the child is reaped here
                if let Err(e) = child.kill().await {
                    tracing::warn!(path = %path.display(), error = %e, "failed to kill timed-out script");
                }
                tracing::warn!(path = %path.display(), limit_ms = limit.as_millis() as u64, "script timed out");
                ExecutionResult::timed_out(limit)
            }
        }
    }
}

//! OS-portable shell execution with timeout and output capture.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::ExecutionContext;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Default timeout applied when a request does not carry one.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shells a request may name explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellKind {
    Bash,
    Sh,
    Zsh,
    Cmd,
    Powershell,
    Pwsh,
}

impl ShellKind {
    pub fn program(self) -> &'static str {
        match self {
            Self::Bash => "bash",
            Self::Sh => "sh",
            Self::Zsh => "zsh",
            Self::Cmd => "cmd",
            Self::Powershell => "powershell",
            Self::Pwsh => "pwsh",
        }
    }

    /// Canonical flag that makes the shell run its next argument as a
    /// command string.
    pub fn command_flag(self) -> &'static str {
        match self {
            Self::Bash | Self::Sh | Self::Zsh => "-c",
            Self::Cmd => "/C",
            Self::Powershell | Self::Pwsh => "-Command",
        }
    }

    /// Platform default when the request names no shell.
    pub fn os_default() -> Self {
        if cfg!(windows) {
            Self::Cmd
        } else {
            Self::Sh
        }
    }
}

/// One shell execution request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShellRequest {
    pub command: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<ShellKind>,

    /// Timeout in seconds; defaults to [`DEFAULT_TIMEOUT_SECS`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Outcome of one shell execution.
#[derive(Debug, Clone)]
pub struct ShellResponse {
    pub exit_code: i32,

    /// Combined stdout+stderr capture.
    pub output: String,

    /// Error summary; empty on success.
    pub error: String,

    pub timed_out: bool,

    /// Human-readable wall time.
    pub duration: String,
}

/// Spawns shell commands with a deadline and captures their output.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    default_timeout: Duration,
}

impl ShellExecutor {
    pub fn new(default_timeout: Duration) -> Self {
        Self { default_timeout }
    }

    /// Run one request to completion, deadline expiry or cancellation.
    ///
    /// The deadline is the earlier of the request timeout and the context
    /// deadline. The child inherits nothing on stdin and is killed when the
    /// deadline fires.
    pub async fn execute(
        &self,
        ctx: &ExecutionContext,
        request: &ShellRequest,
    ) -> AgentResult<ShellResponse> {
        if request.command.trim().is_empty() {
            return Err(AgentError::Validation("command must not be empty".into()));
        }

        let shell = request.shell.unwrap_or_else(ShellKind::os_default);
        let timeout = request
            .timeout
            .map_or(self.default_timeout, Duration::from_secs);
        let timeout_secs = timeout.as_secs();

        let mut deadline = Instant::now() + timeout;
        if let Some(ctx_deadline) = ctx.deadline() {
            deadline = deadline.min(ctx_deadline);
        }

        debug!(
            command_id = %ctx.command_id(),
            shell = shell.program(),
            timeout_secs,
            "spawning shell command"
        );

        let started = Instant::now();
        let mut cmd = Command::new(shell.program());
        cmd.arg(shell.command_flag())
            .arg(&request.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Ok(ShellResponse {
                    exit_code: 1,
                    output: String::new(),
                    error: format!("failed to spawn {}: {e}", shell.program()),
                    timed_out: false,
                    duration: human_duration(started.elapsed()),
                });
            }
        };

        // Dropping the in-flight future on the timeout/cancel branches drops
        // the child handle, and kill_on_drop terminates the process.
        let wait = child.wait_with_output();
        tokio::pin!(wait);

        tokio::select! {
            result = &mut wait => {
                let elapsed = started.elapsed();
                match result {
                    Ok(output) => {
                        let exit_code = output.status.code().unwrap_or(-1);
                        let combined = combine_output(&output.stdout, &output.stderr);
                        let error = if output.status.success() {
                            String::new()
                        } else {
                            format!("command exited with code {exit_code}")
                        };
                        Ok(ShellResponse {
                            exit_code,
                            output: combined,
                            error,
                            timed_out: false,
                            duration: human_duration(elapsed),
                        })
                    }
                    Err(e) => Ok(ShellResponse {
                        exit_code: 1,
                        output: String::new(),
                        error: format!("failed to collect command output: {e}"),
                        timed_out: false,
                        duration: human_duration(elapsed),
                    }),
                }
            }
            () = tokio::time::sleep_until(deadline) => {
                warn!(
                    command_id = %ctx.command_id(),
                    timeout_secs,
                    "shell command timed out, killing child"
                );
                Ok(ShellResponse {
                    exit_code: 124,
                    output: String::new(),
                    error: format!("command timed out after {timeout_secs}s"),
                    timed_out: true,
                    duration: human_duration(started.elapsed()),
                })
            }
            () = ctx.token().cancelled() => {
                warn!(command_id = %ctx.command_id(), "shell command cancelled, killing child");
                Ok(ShellResponse {
                    exit_code: 130,
                    output: String::new(),
                    error: "command cancelled".to_string(),
                    timed_out: false,
                    duration: human_duration(started.elapsed()),
                })
            }
        }
    }
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

/// Stitch captured stdout and stderr into one text block, stdout first.
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = stdout.trim_end();
    let stderr = stderr.trim_end();
    if stdout.is_empty() {
        stderr.to_string()
    } else if stderr.is_empty() {
        stdout.to_string()
    } else {
        format!("{stdout}\n{stderr}")
    }
}

pub fn human_duration(elapsed: Duration) -> String {
    format!("{elapsed:.2?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LevelHandle;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            CancellationToken::new(),
            "minion-test",
            "cmd-test",
            LevelHandle::default(),
        )
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(combine_output(b"out\n", b""), "out");
        assert_eq!(combine_output(b"", b"err\n"), "err");
        assert_eq!(combine_output(b"out\n", b"err\n"), "out\nerr");
    }

    #[test]
    fn test_shell_kind_flags() {
        assert_eq!(ShellKind::Sh.command_flag(), "-c");
        assert_eq!(ShellKind::Cmd.command_flag(), "/C");
        assert_eq!(ShellKind::Pwsh.command_flag(), "-Command");
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let executor = ShellExecutor::default();
        let request = ShellRequest {
            command: "   ".to_string(),
            shell: None,
            timeout: None,
        };
        assert!(executor.execute(&ctx(), &request).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_echo() {
        let executor = ShellExecutor::default();
        let request = ShellRequest {
            command: "echo hello".to_string(),
            shell: None,
            timeout: None,
        };
        let response = executor.execute(&ctx(), &request).await.unwrap();
        assert_eq!(response.exit_code, 0);
        assert_eq!(response.output, "hello");
        assert!(!response.timed_out);
        assert!(response.error.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_propagated() {
        let executor = ShellExecutor::default();
        let request = ShellRequest {
            command: "exit 3".to_string(),
            shell: Some(ShellKind::Sh),
            timeout: None,
        };
        let response = executor.execute(&ctx(), &request).await.unwrap();
        assert_eq!(response.exit_code, 3);
        assert!(response.error.contains("code 3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_child() {
        let executor = ShellExecutor::default();
        let request = ShellRequest {
            command: "sleep 5".to_string(),
            shell: None,
            timeout: Some(1),
        };
        let started = std::time::Instant::now();
        let response = executor.execute(&ctx(), &request).await.unwrap();
        assert!(response.timed_out);
        assert_ne!(response.exit_code, 0);
        assert!(response.error.contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_context_deadline_caps_request_timeout() {
        let context = ctx().with_deadline(Instant::now() + Duration::from_millis(200));
        let executor = ShellExecutor::default();
        let request = ShellRequest {
            command: "sleep 5".to_string(),
            shell: None,
            timeout: Some(30),
        };

        let started = std::time::Instant::now();
        let response = executor.execute(&context, &request).await.unwrap();
        assert!(response.timed_out);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_observed() {
        let token = CancellationToken::new();
        let context = ExecutionContext::new(
            token.clone(),
            "minion-test",
            "cmd-cancel",
            LevelHandle::default(),
        );
        let executor = ShellExecutor::default();
        let request = ShellRequest {
            command: "sleep 5".to_string(),
            shell: None,
            timeout: None,
        };

        let handle = tokio::spawn(async move { executor.execute(&context, &request).await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();

        let response = handle.await.unwrap().unwrap();
        assert!(!response.timed_out);
        assert!(response.error.contains("cancelled"));
    }
}

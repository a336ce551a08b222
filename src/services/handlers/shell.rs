//! Shell command handler.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{ExecutionContext, HandlerCategory, HandlerDefinition};
use crate::domain::ports::{CommandHandler, CommandOutput};
use crate::infrastructure::shell::{ShellExecutor, ShellRequest, ShellResponse};
use crate::services::handlers::strip_name_token;
use async_trait::async_trait;

/// `shell`: run an arbitrary command line with optional shell selection
/// and timeout.
pub struct ShellHandler {
    executor: ShellExecutor,
}

impl ShellHandler {
    pub fn new(executor: ShellExecutor) -> Self {
        Self { executor }
    }

    /// Parse either form into a request. The simple form is the raw command
    /// line after the `shell` name token, preserved verbatim (no flag
    /// splitting, quoting intact).
    fn parse_request(payload: &str) -> AgentResult<ShellRequest> {
        let trimmed = payload.trim();
        if trimmed.starts_with('{') {
            let request: ShellRequest = serde_json::from_str(trimmed)
                .map_err(|e| AgentError::Parse(format!("invalid shell request: {e}")))?;
            if request.command.trim().is_empty() {
                return Err(AgentError::Validation("command must not be empty".into()));
            }
            return Ok(request);
        }

        let command = strip_name_token(trimmed, "shell");
        if command.is_empty() {
            return Err(AgentError::Validation("command must not be empty".into()));
        }
        Ok(ShellRequest {
            command: command.to_string(),
            shell: None,
            timeout: None,
        })
    }
}

#[async_trait]
impl CommandHandler for ShellHandler {
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let request = Self::parse_request(payload)?;
        let response = self.executor.execute(ctx, &request).await?;
        Ok(output_from_response(&response))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "shell",
            HandlerCategory::Shell,
            "Run a command line through a shell with timeout and output capture",
        )
        .usage("shell <command line>")
        .example("shell df -h")
        .example(r#"{"command":"sleep 2 && echo done","shell":"bash","timeout":10}"#)
        .parameter("command", "string", true, None, "Command line to run")
        .parameter(
            "shell",
            "string",
            false,
            None,
            "One of bash, sh, zsh, cmd, powershell, pwsh; defaults to the OS shell",
        )
        .parameter(
            "timeout",
            "number",
            false,
            Some("30"),
            "Timeout in seconds",
        )
        .notes("Output combines stdout and stderr; the child is killed on timeout.")
    }
}

/// Map an executor response to handler output. The combined capture lands
/// in stdout and the error summary in stderr; the duration is always
/// reported.
pub(crate) fn output_from_response(response: &ShellResponse) -> CommandOutput {
    let stdout = if response.output.is_empty() {
        format!("Duration: {}", response.duration)
    } else {
        format!("{}\n\nDuration: {}", response.output, response.duration)
    };
    CommandOutput {
        exit_code: response.exit_code,
        stdout,
        stderr: response.error.clone(),
    }
}

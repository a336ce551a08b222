//! System introspection handlers and the legacy shell alias.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{ExecutionContext, HandlerCategory, HandlerDefinition};
use crate::domain::ports::{CommandHandler, CommandOutput};
use crate::infrastructure::shell::{ShellExecutor, ShellRequest};
use crate::services::handlers::strip_name_token;
use async_trait::async_trait;
use sysinfo::System;

/// Architecture names as the controller expects them.
pub fn arch_name() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

fn os_line() -> String {
    format!("OS: {}\nArch: {}", std::env::consts::OS, arch_name())
}

/// `system:info`: OS, architecture, memory and worker count.
pub struct SystemInfoHandler;

#[async_trait]
impl CommandHandler for SystemInfoHandler {
    async fn execute(&self, _ctx: &ExecutionContext, _payload: &str) -> AgentResult<CommandOutput> {
        let mut sys = System::new();
        sys.refresh_memory();
        let total_mb = sys.total_memory() / (1024 * 1024);

        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        let allocated_mb = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| sys.process(pid))
            .map_or(0, |p| p.memory() / (1024 * 1024));

        let workers = std::thread::available_parallelism().map_or(1, |n| n.get());

        Ok(CommandOutput::success(format!(
            "{}\nTotal Memory: {} MB\nAllocated Memory: {} MB\nWorkers: {}",
            os_line(),
            total_mb,
            allocated_mb,
            workers
        )))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "system:info",
            HandlerCategory::System,
            "Report OS, architecture, memory usage and worker count",
        )
        .usage("system:info")
        .example("system:info")
    }
}

/// `system:os`: OS and architecture only.
pub struct SystemOsHandler;

#[async_trait]
impl CommandHandler for SystemOsHandler {
    async fn execute(&self, _ctx: &ExecutionContext, _payload: &str) -> AgentResult<CommandOutput> {
        Ok(CommandOutput::success(os_line()))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "system:os",
            HandlerCategory::System,
            "Report OS and architecture",
        )
        .usage("system:os")
        .example("system:os")
    }
}

/// `system`: backwards-compatible alias running the payload on the OS
/// default shell.
pub struct SystemAliasHandler {
    executor: ShellExecutor,
}

impl SystemAliasHandler {
    pub fn new(executor: ShellExecutor) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl CommandHandler for SystemAliasHandler {
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let command = strip_name_token(payload, "system");
        if command.is_empty() {
            return Err(AgentError::Validation("command must not be empty".into()));
        }

        let request = ShellRequest {
            command: command.to_string(),
            shell: None,
            timeout: None,
        };
        let response = self.executor.execute(ctx, &request).await?;
        Ok(super::shell::output_from_response(&response))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "system",
            HandlerCategory::Shell,
            "Run the payload as a shell command on the OS default shell",
        )
        .usage("system <command line>")
        .example("system uptime")
        .notes("Legacy alias; prefer the shell command.")
    }
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

    #[tokio::test]
    async fn test_system_os_output() {
        let out = SystemOsHandler.execute(&ctx(), "system:os").await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.starts_with("OS: "));
        assert!(out.stdout.contains("\nArch: "));
    }

    #[tokio::test]
    async fn test_system_info_fields() {
        let out = SystemInfoHandler
            .execute(&ctx(), "system:info")
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.contains("Total Memory: "));
        assert!(out.stdout.contains("Allocated Memory: "));
        assert!(out.stdout.contains("Workers: "));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_alias_runs_shell() {
        let handler = SystemAliasHandler::new(ShellExecutor::default());
        let out = handler.execute(&ctx(), "system echo aliased").await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.contains("aliased"));
    }

    #[tokio::test]
    async fn test_system_alias_empty_command() {
        let handler = SystemAliasHandler::new(ShellExecutor::default());
        assert!(handler.execute(&ctx(), "system").await.is_err());
    }
}

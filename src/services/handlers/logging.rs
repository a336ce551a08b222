//! Runtime log-level handlers.
//!
//! These mutate the shared level cell carried by the execution context;
//! the subscriber's filter reads the same cell, so changes apply to the
//! very next log event.

use crate::domain::errors::AgentResult;
use crate::domain::models::{ExecutionContext, HandlerCategory, HandlerDefinition, LogLevel};
use crate::domain::ports::{CommandHandler, CommandOutput};
use async_trait::async_trait;
use tracing::info;

/// `logging:level`: report the current level.
pub struct LoggingLevelHandler;

#[async_trait]
impl CommandHandler for LoggingLevelHandler {
    async fn execute(&self, ctx: &ExecutionContext, _payload: &str) -> AgentResult<CommandOutput> {
        Ok(CommandOutput::success(ctx.level_handle().get().as_str()))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "logging:level",
            HandlerCategory::Logging,
            "Report the current log level",
        )
        .usage("logging:level")
        .example("logging:level")
    }
}

/// `logging:increase`: one step more verbose along
/// `error → warn → info → debug`.
pub struct LoggingIncreaseHandler;

#[async_trait]
impl CommandHandler for LoggingIncreaseHandler {
    async fn execute(&self, ctx: &ExecutionContext, _payload: &str) -> AgentResult<CommandOutput> {
        let (previous, current) = ctx.level_handle().increase();
        Ok(CommandOutput::success(transition_message(
            previous, current, "debug",
        )))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "logging:increase",
            HandlerCategory::Logging,
            "Increase log verbosity by one step",
        )
        .usage("logging:increase")
        .example("logging:increase")
        .notes("Saturates at debug.")
    }
}

/// `logging:decrease`: one step quieter.
pub struct LoggingDecreaseHandler;

#[async_trait]
impl CommandHandler for LoggingDecreaseHandler {
    async fn execute(&self, ctx: &ExecutionContext, _payload: &str) -> AgentResult<CommandOutput> {
        let (previous, current) = ctx.level_handle().decrease();
        Ok(CommandOutput::success(transition_message(
            previous, current, "error",
        )))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "logging:decrease",
            HandlerCategory::Logging,
            "Decrease log verbosity by one step",
        )
        .usage("logging:decrease")
        .example("logging:decrease")
        .notes("Saturates at error.")
    }
}

fn transition_message(previous: LogLevel, current: LogLevel, endpoint: &str) -> String {
    if previous == current {
        format!("log level already at {endpoint}")
    } else {
        info!(from = %previous, to = %current, "log level changed");
        format!("log level changed from {previous} to {current}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LevelHandle;
    use tokio_util::sync::CancellationToken;

    fn ctx_with(level: LogLevel) -> ExecutionContext {
        ExecutionContext::new(
            CancellationToken::new(),
            "minion-test",
            "cmd-test",
            LevelHandle::new(level),
        )
    }

    #[tokio::test]
    async fn test_level_report() {
        let ctx = ctx_with(LogLevel::Warn);
        let out = LoggingLevelHandler
            .execute(&ctx, "logging:level")
            .await
            .unwrap();
        assert_eq!(out.stdout, "warn");
    }

    #[tokio::test]
    async fn test_increase_from_info() {
        let ctx = ctx_with(LogLevel::Info);
        let out = LoggingIncreaseHandler
            .execute(&ctx, "logging:increase")
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.contains("from info to debug"));
        assert_eq!(ctx.level_handle().get(), LogLevel::Debug);

        let level = LoggingLevelHandler
            .execute(&ctx, "logging:level")
            .await
            .unwrap();
        assert_eq!(level.stdout, "debug");
    }

    #[tokio::test]
    async fn test_increase_saturates() {
        let ctx = ctx_with(LogLevel::Debug);
        let out = LoggingIncreaseHandler
            .execute(&ctx, "logging:increase")
            .await
            .unwrap();
        assert_eq!(out.exit_code, 0);
        assert!(out.stdout.contains("already at debug"));
    }

    #[tokio::test]
    async fn test_decrease_saturates() {
        let ctx = ctx_with(LogLevel::Error);
        let out = LoggingDecreaseHandler
            .execute(&ctx, "logging:decrease")
            .await
            .unwrap();
        assert!(out.stdout.contains("already at error"));
    }
}

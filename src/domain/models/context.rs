//! Per-command execution envelope.

use super::log_level::LevelHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Immutable ambient state handed to a handler for one command.
///
/// This is the only channel by which handlers obtain cancellation, identity
/// and the mutable log-level handle; they never consult process globals.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    token: CancellationToken,
    agent_id: String,
    command_id: String,
    timestamp: i64,
    level_handle: LevelHandle,
    deadline: Option<Instant>,
}

impl ExecutionContext {
    pub fn new(
        token: CancellationToken,
        agent_id: impl Into<String>,
        command_id: impl Into<String>,
        level_handle: LevelHandle,
    ) -> Self {
        Self {
            token,
            agent_id: agent_id.into(),
            command_id: command_id.into(),
            timestamp: super::command::epoch_seconds(),
            level_handle,
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    /// Seconds since the Unix epoch at which the command was accepted.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn level_handle(&self) -> &LevelHandle {
        &self.level_handle
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

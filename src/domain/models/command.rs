//! Wire-level command types exchanged with the controller.
//!
//! Exactly one message kind travels inbound (`Command`); results and status
//! updates travel outbound. The stream transport only sees the tagged
//! [`StreamMessage`] union.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key under which the controller threads its sequence number.
/// When present it is recorded and echoed back for correlation.
pub const SEQ_NUM_KEY: &str = "seq_num";

/// Informational classification assigned by the controller.
///
/// Dispatch never consults this; the payload's leading token selects the
/// handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    System,
    FileTransfer,
    Shell,
    Docker,
    #[default]
    Unknown,
}

/// A unit of work assigned by the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Command {
    /// Controller-assigned unique identifier.
    pub id: String,

    /// Handler name plus arguments: either bare (`system:info`), prefixed
    /// (`docker-compose:ps /opt/app`), or a JSON object.
    pub payload: String,

    #[serde(default, rename = "type")]
    pub command_type: CommandType,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Command {
    /// Sequence number threaded through metadata by the controller, if any.
    pub fn seq_num(&self) -> Option<&str> {
        self.metadata.get(SEQ_NUM_KEY).map(String::as_str)
    }
}

/// Lifecycle states reported back for each accepted command.
///
/// Status updates are advisory; the result is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Received,
    Executing,
    Completed,
    Failed,
}

impl CommandStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Received => "RECEIVED",
            Self::Executing => "EXECUTING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Outcome of one executed command. Exactly one is produced per accepted
/// command, either sent promptly or buffered for the next attach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub command_id: String,
    pub minion_id: String,

    /// Seconds since the Unix epoch at completion.
    pub timestamp: i64,

    /// 0 on success, nonzero on failure.
    pub exit_code: i32,

    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn new(
        command_id: impl Into<String>,
        minion_id: impl Into<String>,
        exit_code: i32,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            minion_id: minion_id.into(),
            timestamp: epoch_seconds(),
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Advisory lifecycle notification for a command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandStatusUpdate {
    pub command_id: String,
    pub minion_id: String,
    pub status: CommandStatus,
    pub timestamp: i64,
}

impl CommandStatusUpdate {
    pub fn new(
        command_id: impl Into<String>,
        minion_id: impl Into<String>,
        status: CommandStatus,
    ) -> Self {
        Self {
            command_id: command_id.into(),
            minion_id: minion_id.into(),
            status,
            timestamp: epoch_seconds(),
        }
    }
}

/// Tagged union multiplexed over the bidirectional stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum StreamMessage {
    Command(Command),
    Result(CommandResult),
    Status(CommandStatusUpdate),
}

/// Current time as seconds since the Unix epoch.
pub fn epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

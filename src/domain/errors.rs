//! Domain errors for the minion agent core.

use thiserror::Error;

/// Agent-level errors that can occur while accepting and executing commands.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Malformed payload: {0}")]
    Parse(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Execution timed out after {0}s")]
    Timeout(u64),

    #[error("Cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AgentResult<T> = Result<T, AgentError>;

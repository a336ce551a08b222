//! Command handler port.
//!
//! Every named operation the agent can execute implements this trait and is
//! registered with the handler registry. Handlers are stateless across
//! invocations and obtain all ambient state through the execution context.

use crate::domain::errors::AgentResult;
use crate::domain::models::{ExecutionContext, HandlerDefinition};
use async_trait::async_trait;

/// Raw output of one handler invocation.
///
/// A nonzero exit code is a command-level failure, not a handler error;
/// handler errors (parse, validation) are returned as `Err` and converted
/// to a failure result by the registry.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Port trait for command handler implementations.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the registry shares them across
/// tokio tasks behind `Arc`.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Execute one command. The payload is the raw string from the wire;
    /// handlers parse it through [`crate::domain::models::Payload`].
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput>;

    /// Self-description used for help rendering and registration.
    fn metadata(&self) -> HandlerDefinition;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_constructors() {
        let ok = CommandOutput::success("done");
        assert!(ok.succeeded());
        assert_eq!(ok.stdout, "done");
        assert!(ok.stderr.is_empty());

        let bad = CommandOutput::failure(2, "", "boom");
        assert!(!bad.succeeded());
        assert_eq!(bad.exit_code, 2);
        assert_eq!(bad.stderr, "boom");
    }
}

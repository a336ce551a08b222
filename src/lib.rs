//! Minion - fleet-management agent command execution core
//!
//! A long-lived agent that:
//! - receives commands from a central controller over a persistent
//!   bidirectional stream
//! - dispatches them through a name-indexed handler registry (system
//!   introspection, file operations, shell execution, docker-compose
//!   operations, log-level control)
//! - reports status transitions and results on the same stream
//! - buffers results across stream failures and replays them on reconnect
//! - identifies itself with a stable hardware-derived fingerprint

pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export key types for convenience
pub use domain::models::{Command, CommandResult, CommandStatus, StreamMessage};
pub use services::{Agent, HandlerRegistry, StreamProcessor};

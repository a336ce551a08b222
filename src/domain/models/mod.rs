//! Domain models
//!
//! Wire types, payload parsing and per-command ambient state. These carry
//! no transport or filesystem concerns.

pub mod command;
pub mod config;
pub mod context;
pub mod handler_def;
pub mod log_level;
pub mod payload;

pub use command::{
    epoch_seconds, Command, CommandResult, CommandStatus, CommandStatusUpdate, CommandType,
    StreamMessage, SEQ_NUM_KEY,
};
pub use config::{
    AgentConfig, LogConfig, LogFormat, ReconnectConfig, RotationPolicy, ServerConfig, ShellConfig,
    StreamConfig,
};
pub use context::ExecutionContext;
pub use handler_def::{HandlerCategory, HandlerDefinition, HandlerParameter};
pub use log_level::{LevelHandle, LogLevel};
pub use payload::{Payload, TokenPayload};

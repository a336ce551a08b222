//! Runtime-adjustable log level.
//!
//! The process entry point owns one [`LevelHandle`]; handlers receive a
//! clone through the execution context and step it along the
//! `error → warn → info → debug` chain. The logger reads the cell per
//! event, so changes take effect without locking or re-initialization.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Verbosity levels in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        }
    }

    /// One step more verbose, or `None` when already at `debug`.
    pub fn more_verbose(self) -> Option<Self> {
        match self {
            Self::Error => Some(Self::Warn),
            Self::Warn => Some(Self::Info),
            Self::Info => Some(Self::Debug),
            Self::Debug => None,
        }
    }

    /// One step quieter, or `None` when already at `error`.
    pub fn less_verbose(self) -> Option<Self> {
        match self {
            Self::Debug => Some(Self::Info),
            Self::Info => Some(Self::Warn),
            Self::Warn => Some(Self::Error),
            Self::Error => None,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Error,
            1 => Self::Warn,
            3 => Self::Debug,
            _ => Self::Info,
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" | "trace" => Ok(Self::Debug),
            other => Err(format!("invalid log level: {other}")),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared atomic cell holding the current [`LogLevel`].
#[derive(Debug, Clone)]
pub struct LevelHandle {
    cell: Arc<AtomicU8>,
}

impl LevelHandle {
    pub fn new(level: LogLevel) -> Self {
        Self {
            cell: Arc::new(AtomicU8::new(level as u8)),
        }
    }

    pub fn get(&self) -> LogLevel {
        LogLevel::from_u8(self.cell.load(Ordering::Relaxed))
    }

    pub fn set(&self, level: LogLevel) {
        self.cell.store(level as u8, Ordering::Relaxed);
    }

    /// Step toward `debug`. Returns `(previous, current)`; saturates at the
    /// endpoint, in which case both are equal.
    pub fn increase(&self) -> (LogLevel, LogLevel) {
        let previous = self.get();
        let current = previous.more_verbose().unwrap_or(previous);
        self.set(current);
        (previous, current)
    }

    /// Step toward `error`. Returns `(previous, current)`; saturates at the
    /// endpoint, in which case both are equal.
    pub fn decrease(&self) -> (LogLevel, LogLevel) {
        let previous = self.get();
        let current = previous.less_verbose().unwrap_or(previous);
        self.set(current);
        (previous, current)
    }
}

impl Default for LevelHandle {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

//! Command stream port.
//!
//! Abstracts the persistent bidirectional channel to the controller. The
//! processor only sees these traits; transports (framed TCP, TLS tunnels,
//! test doubles) live behind them.

use crate::domain::models::StreamMessage;
use async_trait::async_trait;
use thiserror::Error;

/// Errors surfaced by a stream implementation.
#[derive(Debug, Error)]
pub enum StreamError {
    /// The peer closed the stream cleanly.
    #[error("stream closed by peer")]
    Closed,

    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    /// Status reported by the remote end, gRPC-style.
    #[error("remote status {code}: {message}")]
    Status { code: String, message: String },

    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// Remote status detail, when the error carries one.
    pub fn status_detail(&self) -> Option<String> {
        match self {
            Self::Status { code, message } => Some(format!("{code}: {message}")),
            _ => None,
        }
    }
}

/// One attached bidirectional stream.
///
/// `recv` returns [`StreamError::Closed`] at end of stream; the processor
/// returns it to the caller, which reconnects and re-attaches.
#[async_trait]
pub trait CommandStream: Send {
    async fn send(&mut self, message: StreamMessage) -> Result<(), StreamError>;

    async fn recv(&mut self) -> Result<StreamMessage, StreamError>;
}

/// Factory that produces a fresh stream per connection attempt.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn CommandStream>, StreamError>;
}

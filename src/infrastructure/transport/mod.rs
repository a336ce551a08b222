//! Default stream transport: length-delimited JSON frames over TCP.
//!
//! TLS termination and alternative transports stay outside the core; they
//! only need to implement the [`CommandStream`] port.

use crate::domain::models::StreamMessage;
use crate::domain::ports::{CommandStream, StreamConnector, StreamError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::debug;

/// One attached TCP stream carrying framed [`StreamMessage`] JSON.
pub struct TcpCommandStream {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
}

impl TcpCommandStream {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
        }
    }
}

#[async_trait]
impl CommandStream for TcpCommandStream {
    async fn send(&mut self, message: StreamMessage) -> Result<(), StreamError> {
        let bytes =
            serde_json::to_vec(&message).map_err(|e| StreamError::Codec(e.to_string()))?;
        self.framed
            .send(Bytes::from(bytes))
            .await
            .map_err(StreamError::Io)
    }

    async fn recv(&mut self) -> Result<StreamMessage, StreamError> {
        match self.framed.next().await {
            None => Err(StreamError::Closed),
            Some(Err(e)) => Err(StreamError::Io(e)),
            Some(Ok(frame)) => {
                serde_json::from_slice(&frame).map_err(|e| StreamError::Codec(e.to_string()))
            }
        }
    }
}

/// Connects a fresh [`TcpCommandStream`] per attempt.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    address: String,
}

impl TcpConnector {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

#[async_trait]
impl StreamConnector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn CommandStream>, StreamError> {
        debug!(address = %self.address, "connecting to controller");
        let stream = TcpStream::connect(&self.address).await?;
        Ok(Box::new(TcpCommandStream::new(stream)))
    }
}

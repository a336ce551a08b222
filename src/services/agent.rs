//! Agent run loop: connect, process, reconnect with backoff.

use crate::domain::models::ReconnectConfig;
use crate::domain::ports::{CommandStream, StreamConnector, StreamError};
use crate::services::processor::StreamProcessor;
use backoff::ExponentialBackoffBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Drives the stream processor over successive connections until
/// cancelled.
pub struct Agent {
    processor: Arc<StreamProcessor>,
    connector: Arc<dyn StreamConnector>,
    reconnect: ReconnectConfig,
}

impl Agent {
    pub fn new(
        processor: Arc<StreamProcessor>,
        connector: Arc<dyn StreamConnector>,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            processor,
            connector,
            reconnect,
        }
    }

    pub fn processor(&self) -> &Arc<StreamProcessor> {
        &self.processor
    }

    /// Run until the token is cancelled. Stream failures trigger a fresh
    /// connection with exponential backoff; buffered results flush on the
    /// next attach.
    pub async fn run(&self, token: CancellationToken) -> anyhow::Result<()> {
        loop {
            if token.is_cancelled() {
                info!("agent shutting down");
                return Ok(());
            }

            let Some(mut stream) = self.connect(&token).await else {
                info!("agent shutting down");
                return Ok(());
            };
            info!("stream attached");

            match self.processor.process(&token, stream.as_mut()).await {
                Err(StreamError::Cancelled) => {
                    info!("agent shutting down");
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "stream processing ended, reconnecting");
                }
                Ok(()) => {}
            }
        }
    }

    /// Connect with unbounded exponential backoff, or `None` when
    /// cancelled while waiting.
    async fn connect(&self, token: &CancellationToken) -> Option<Box<dyn CommandStream>> {
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(self.reconnect.initial_backoff_ms))
            .with_max_interval(Duration::from_millis(self.reconnect.max_backoff_ms))
            .with_max_elapsed_time(None)
            .build();

        let attempt = backoff::future::retry(backoff, || async {
            self.connector.connect().await.map_err(|e| {
                warn!(error = %e, "connect failed, backing off");
                backoff::Error::transient(e)
            })
        });

        tokio::select! {
            () = token.cancelled() => None,
            result = attempt => result.ok(),
        }
    }
}

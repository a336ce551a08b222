//! Stream processor: receive loop, dispatch, status emission and
//! reconnection-safe result buffering.
//!
//! `process` owns one attached stream at a time and runs until the stream
//! errors or the token is cancelled; the caller reconnects and calls it
//! again. Results that fail to send are buffered and flushed first on the
//! next attach: the buffer, not the status updates, is the correctness
//! mechanism.

use crate::domain::models::{
    Command, CommandResult, CommandStatus, CommandStatusUpdate, ExecutionContext, LevelHandle,
    StreamMessage,
};
use crate::domain::ports::{CommandStream, StreamError};
use crate::services::registry::HandlerRegistry;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outbound items that failed to send, drained FIFO per type on the next
/// attach.
#[derive(Debug, Default)]
struct PendingBuffer {
    results: VecDeque<CommandResult>,
    statuses: VecDeque<CommandStatusUpdate>,
}

impl PendingBuffer {
    fn is_empty(&self) -> bool {
        self.results.is_empty() && self.statuses.is_empty()
    }
}

/// Processes commands from one attached stream at a time.
pub struct StreamProcessor {
    registry: Arc<HandlerRegistry>,
    agent_id: RwLock<String>,
    level_handle: LevelHandle,
    idle_timeout: Duration,
    pending: Mutex<PendingBuffer>,
    seq_nums: RwLock<HashMap<String, String>>,
}

impl StreamProcessor {
    pub fn new(
        registry: Arc<HandlerRegistry>,
        agent_id: impl Into<String>,
        level_handle: LevelHandle,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            agent_id: RwLock::new(agent_id.into()),
            level_handle,
            idle_timeout,
            pending: Mutex::new(PendingBuffer::default()),
            seq_nums: RwLock::new(HashMap::new()),
        }
    }

    /// Adopt a server-assigned identity; subsequent outbound messages carry
    /// the new id.
    pub async fn update_agent_id(&self, new_id: impl Into<String>) {
        let new_id = new_id.into();
        info!(agent_id = %new_id, "adopting server-assigned agent id");
        *self.agent_id.write().await = new_id;
    }

    pub async fn agent_id(&self) -> String {
        self.agent_id.read().await.clone()
    }

    /// Sequence number recorded for a command, when its metadata carried
    /// one.
    pub async fn seq_num_for(&self, command_id: &str) -> Option<String> {
        self.seq_nums.read().await.get(command_id).cloned()
    }

    /// Depths of the pending (results, statuses) buffers.
    pub async fn pending_depths(&self) -> (usize, usize) {
        let pending = self.pending.lock().await;
        (pending.results.len(), pending.statuses.len())
    }

    /// Run the receive loop on an attached stream until it errors or the
    /// token is cancelled. Idempotent under repeated calls: each attach
    /// first flushes anything buffered by a previous invocation.
    pub async fn process(
        &self,
        token: &CancellationToken,
        stream: &mut dyn CommandStream,
    ) -> Result<(), StreamError> {
        self.flush_pending(stream).await;

        loop {
            tokio::select! {
                () = token.cancelled() => {
                    info!("stream processing cancelled");
                    return Err(StreamError::Cancelled);
                }
                () = tokio::time::sleep(self.idle_timeout) => {
                    debug!(
                        idle_secs = self.idle_timeout.as_secs(),
                        "no traffic within idle window, stream considered healthy"
                    );
                }
                received = stream.recv() => match received {
                    Ok(StreamMessage::Command(command)) => {
                        self.handle_command(token, stream, command).await;
                    }
                    Ok(other) => {
                        debug!(message = ?other, "discarding non-command inbound message");
                    }
                    Err(e) => {
                        let (results, statuses) = self.pending_depths().await;
                        warn!(
                            error = %e,
                            status_detail = e.status_detail().as_deref().unwrap_or(""),
                            pending_results = results,
                            pending_statuses = statuses,
                            "stream receive failed, returning for reconnect"
                        );
                        return Err(e);
                    }
                },
            }
        }
    }

    /// Full lifecycle for one command: statuses, dispatch, result, terminal
    /// status. Nothing here is fatal to the receive loop.
    async fn handle_command(
        &self,
        token: &CancellationToken,
        stream: &mut dyn CommandStream,
        command: Command,
    ) {
        let agent_id = self.agent_id().await;

        if let Some(seq) = command.seq_num() {
            self.seq_nums
                .write()
                .await
                .insert(command.id.clone(), seq.to_string());
            debug!(command_id = %command.id, seq_num = seq, "recorded sequence number");
        }

        info!(
            command_id = %command.id,
            command_type = ?command.command_type,
            "command received"
        );

        self.emit_status(stream, &agent_id, &command.id, CommandStatus::Received)
            .await;
        self.emit_status(stream, &agent_id, &command.id, CommandStatus::Executing)
            .await;

        let ctx = ExecutionContext::new(
            token.child_token(),
            agent_id.clone(),
            command.id.clone(),
            self.level_handle.clone(),
        );

        let result = match self.registry.dispatch(&ctx, &command.payload).await {
            Ok(output) => CommandResult::new(
                &command.id,
                &agent_id,
                output.exit_code,
                output.stdout,
                output.stderr,
            ),
            Err(e) => CommandResult::new(&command.id, &agent_id, 1, "", e.to_string()),
        };

        let terminal = if result.succeeded() {
            CommandStatus::Completed
        } else {
            CommandStatus::Failed
        };

        info!(
            command_id = %command.id,
            exit_code = result.exit_code,
            status = %terminal,
            "command executed"
        );

        if let Err(e) = stream.send(StreamMessage::Result(result.clone())).await {
            warn!(
                command_id = %command.id,
                error = %e,
                "result send failed, buffering for next attach"
            );
            self.pending.lock().await.results.push_back(result);
        }

        self.emit_status(stream, &agent_id, &command.id, terminal).await;
    }

    /// Attempt one status update; buffered on failure, never fatal.
    async fn emit_status(
        &self,
        stream: &mut dyn CommandStream,
        agent_id: &str,
        command_id: &str,
        status: CommandStatus,
    ) {
        let update = CommandStatusUpdate::new(command_id, agent_id, status);
        if let Err(e) = stream.send(StreamMessage::Status(update.clone())).await {
            warn!(
                command_id,
                status = %status,
                error = %e,
                "status send failed, buffering"
            );
            self.pending.lock().await.statuses.push_back(update);
        }
    }

    /// Flush buffered items in FIFO order, results before statuses. Items
    /// that sent successfully are removed even when a later one fails.
    async fn flush_pending(&self, stream: &mut dyn CommandStream) {
        let mut pending = self.pending.lock().await;
        if pending.is_empty() {
            return;
        }

        info!(
            pending_results = pending.results.len(),
            pending_statuses = pending.statuses.len(),
            "flushing pending buffers on attach"
        );

        while let Some(result) = pending.results.front() {
            match stream.send(StreamMessage::Result(result.clone())).await {
                Ok(()) => {
                    pending.results.pop_front();
                }
                Err(e) => {
                    warn!(error = %e, "pending result flush interrupted");
                    return;
                }
            }
        }

        while let Some(status) = pending.statuses.front() {
            match stream.send(StreamMessage::Status(status.clone())).await {
                Ok(()) => {
                    pending.statuses.pop_front();
                }
                Err(e) => {
                    warn!(error = %e, "pending status flush interrupted");
                    return;
                }
            }
        }

        debug!("pending buffers drained");
    }
}

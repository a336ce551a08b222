//! End-to-end tests of the stream processor over a scripted in-memory
//! stream: lifecycle ordering, send-failure buffering and replay,
//! cancellation and idle behavior.

use async_trait::async_trait;
use minion::domain::models::{
    Command, CommandStatus, CommandType, LevelHandle, LogLevel, StreamMessage,
};
use minion::domain::ports::{CommandStream, StreamError};
use minion::infrastructure::compose::ComposeRunner;
use minion::infrastructure::shell::ShellExecutor;
use minion::services::{HandlerRegistry, StreamProcessor};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Inbound script entries for the mock stream.
enum Inbound {
    Msg(StreamMessage),
    Closed,
}

/// Scriptable stream double: queued inbound messages, recorded outbound
/// messages, and per-send success scripting.
struct ScriptedStream {
    inbound: Mutex<VecDeque<Inbound>>,
    sent: Arc<Mutex<Vec<StreamMessage>>>,
    /// Outcome per send, front first; sends succeed once exhausted.
    send_script: Mutex<VecDeque<bool>>,
}

impl ScriptedStream {
    fn new(inbound: Vec<Inbound>) -> Self {
        Self {
            inbound: Mutex::new(inbound.into_iter().collect()),
            sent: Arc::new(Mutex::new(Vec::new())),
            send_script: Mutex::new(VecDeque::new()),
        }
    }

    fn with_send_script(self, script: Vec<bool>) -> Self {
        *self.send_script.lock().unwrap() = script.into_iter().collect();
        self
    }

    fn sent_handle(&self) -> Arc<Mutex<Vec<StreamMessage>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl CommandStream for ScriptedStream {
    async fn send(&mut self, message: StreamMessage) -> Result<(), StreamError> {
        let ok = self.send_script.lock().unwrap().pop_front().unwrap_or(true);
        if ok {
            self.sent.lock().unwrap().push(message);
            Ok(())
        } else {
            Err(StreamError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "send failed",
            )))
        }
    }

    async fn recv(&mut self) -> Result<StreamMessage, StreamError> {
        let next = self.inbound.lock().unwrap().pop_front();
        match next {
            Some(Inbound::Msg(msg)) => Ok(msg),
            Some(Inbound::Closed) => Err(StreamError::Closed),
            // Script exhausted: behave like an idle stream.
            None => std::future::pending().await,
        }
    }
}

fn command(id: &str, payload: &str) -> Command {
    Command {
        id: id.to_string(),
        payload: payload.to_string(),
        command_type: CommandType::Unknown,
        metadata: HashMap::new(),
    }
}

fn processor_with(level: LogLevel) -> StreamProcessor {
    let registry = Arc::new(HandlerRegistry::with_defaults(
        ShellExecutor::default(),
        ComposeRunner::default(),
    ));
    StreamProcessor::new(
        registry,
        "fingerprint-aaaa",
        LevelHandle::new(level),
        Duration::from_secs(90),
    )
}

fn statuses_of(sent: &[StreamMessage]) -> Vec<CommandStatus> {
    sent.iter()
        .filter_map(|m| match m {
            StreamMessage::Status(s) => Some(s.status),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_full_lifecycle_for_system_os() {
    let processor = processor_with(LogLevel::Info);
    let mut stream = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Command(command("c1", "system:os"))),
        Inbound::Closed,
    ]);
    let sent = stream.sent_handle();

    let err = processor
        .process(&CancellationToken::new(), &mut stream)
        .await
        .unwrap_err();
    assert!(matches!(err, StreamError::Closed));

    let sent = sent.lock().unwrap();
    assert_eq!(
        statuses_of(&sent),
        vec![
            CommandStatus::Received,
            CommandStatus::Executing,
            CommandStatus::Completed
        ]
    );

    let result = sent
        .iter()
        .find_map(|m| match m {
            StreamMessage::Result(r) => Some(r.clone()),
            _ => None,
        })
        .expect("result emitted");
    assert_eq!(result.command_id, "c1");
    assert_eq!(result.minion_id, "fingerprint-aaaa");
    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.starts_with("OS: "));
    assert!(result.stdout.contains("\nArch: "));
    assert!(result.stderr.is_empty());
}

#[tokio::test]
async fn test_unknown_command_reports_not_found_and_fails() {
    let processor = processor_with(LogLevel::Info);
    let mut stream = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Command(command("c2", "no:such thing"))),
        Inbound::Closed,
    ]);
    let sent = stream.sent_handle();

    let _ = processor
        .process(&CancellationToken::new(), &mut stream)
        .await;

    let sent = sent.lock().unwrap();
    assert_eq!(
        statuses_of(&sent),
        vec![
            CommandStatus::Received,
            CommandStatus::Executing,
            CommandStatus::Failed
        ]
    );

    let result = sent
        .iter()
        .find_map(|m| match m {
            StreamMessage::Result(r) => Some(r.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.stderr, "command not found: no:such thing");
}

#[tokio::test]
async fn test_result_buffered_on_send_failure_and_replayed_first() {
    let processor = processor_with(LogLevel::Info);

    // RECEIVED and EXECUTING go through; the result and terminal status
    // sends fail, simulating a disconnect mid-command.
    let mut broken = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Command(command("c3", "system:os"))),
        Inbound::Closed,
    ])
    .with_send_script(vec![true, true, false, false]);

    let _ = processor
        .process(&CancellationToken::new(), &mut broken)
        .await;

    let (results, statuses) = processor.pending_depths().await;
    assert_eq!(results, 1);
    assert_eq!(statuses, 1);

    // Reconnect: the buffered result must be the first outbound message.
    let mut fresh = ScriptedStream::new(vec![Inbound::Closed]);
    let sent = fresh.sent_handle();
    let _ = processor
        .process(&CancellationToken::new(), &mut fresh)
        .await;

    let sent = sent.lock().unwrap();
    assert!(matches!(sent[0], StreamMessage::Result(ref r) if r.command_id == "c3"));
    assert!(matches!(sent[1], StreamMessage::Status(ref s) if s.command_id == "c3"));

    let (results, statuses) = processor.pending_depths().await;
    assert_eq!((results, statuses), (0, 0));
}

#[tokio::test]
async fn test_partial_flush_keeps_unsent_items() {
    let processor = processor_with(LogLevel::Info);

    // Two commands whose results both fail to send.
    let mut broken = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Command(command("c4", "system:os"))),
        Inbound::Msg(StreamMessage::Command(command("c5", "system:os"))),
        Inbound::Closed,
    ])
    .with_send_script(vec![true, true, false, false, true, true, false, false]);

    let _ = processor
        .process(&CancellationToken::new(), &mut broken)
        .await;
    let (results, _) = processor.pending_depths().await;
    assert_eq!(results, 2);

    // Reconnect onto a stream whose first send works and second fails:
    // c4 drains, c5 stays queued in FIFO order.
    let mut flaky = ScriptedStream::new(vec![Inbound::Closed])
        .with_send_script(vec![true, false]);
    let sent = flaky.sent_handle();
    let _ = processor
        .process(&CancellationToken::new(), &mut flaky)
        .await;

    assert!(matches!(
        sent.lock().unwrap()[0],
        StreamMessage::Result(ref r) if r.command_id == "c4"
    ));
    let (results, _) = processor.pending_depths().await;
    assert_eq!(results, 1);
}

#[tokio::test]
async fn test_logging_commands_share_level_handle() {
    let processor = processor_with(LogLevel::Info);
    let mut stream = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Command(command("c6", "logging:increase"))),
        Inbound::Msg(StreamMessage::Command(command("c7", "logging:level"))),
        Inbound::Closed,
    ]);
    let sent = stream.sent_handle();

    let _ = processor
        .process(&CancellationToken::new(), &mut stream)
        .await;

    let sent = sent.lock().unwrap();
    let results: Vec<_> = sent
        .iter()
        .filter_map(|m| match m {
            StreamMessage::Result(r) => Some(r.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(results.len(), 2);
    assert!(results[0].stdout.contains("from info to debug"));
    assert_eq!(results[1].stdout, "debug");
}

#[tokio::test]
async fn test_non_command_messages_discarded() {
    let processor = processor_with(LogLevel::Info);
    let mut stream = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Result(
            minion::domain::models::CommandResult::new("x", "y", 0, "", ""),
        )),
        Inbound::Msg(StreamMessage::Command(command("c8", "system:os"))),
        Inbound::Closed,
    ]);
    let sent = stream.sent_handle();

    let _ = processor
        .process(&CancellationToken::new(), &mut stream)
        .await;

    // Only c8 produced output; the stray inbound result was dropped.
    let sent = sent.lock().unwrap();
    let result_ids: Vec<_> = sent
        .iter()
        .filter_map(|m| match m {
            StreamMessage::Result(r) => Some(r.command_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(result_ids, vec!["c8"]);
}

#[tokio::test]
async fn test_cancellation_returns_promptly() {
    let processor = processor_with(LogLevel::Info);
    let token = CancellationToken::new();
    token.cancel();

    let mut stream = ScriptedStream::new(vec![]);
    let err = processor.process(&token, &mut stream).await.unwrap_err();
    assert!(matches!(err, StreamError::Cancelled));
}

#[tokio::test]
async fn test_idle_timeout_continues_without_error() {
    let registry = Arc::new(HandlerRegistry::with_defaults(
        ShellExecutor::default(),
        ComposeRunner::default(),
    ));
    let processor = Arc::new(StreamProcessor::new(
        registry,
        "fingerprint-bbbb",
        LevelHandle::default(),
        Duration::from_millis(20),
    ));

    let token = CancellationToken::new();
    let worker_token = token.clone();
    let worker = {
        let processor = Arc::clone(&processor);
        tokio::spawn(async move {
            let mut stream = ScriptedStream::new(vec![]);
            processor.process(&worker_token, &mut stream).await
        })
    };

    // Several idle windows elapse without the loop returning.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!worker.is_finished());

    token.cancel();
    let err = worker.await.unwrap().unwrap_err();
    assert!(matches!(err, StreamError::Cancelled));
}

#[tokio::test]
async fn test_update_agent_id_reflected_in_results() {
    let processor = processor_with(LogLevel::Info);
    processor.update_agent_id("server-assigned-id").await;

    let mut stream = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Command(command("c9", "system:os"))),
        Inbound::Closed,
    ]);
    let sent = stream.sent_handle();

    let _ = processor
        .process(&CancellationToken::new(), &mut stream)
        .await;

    let sent = sent.lock().unwrap();
    for message in sent.iter() {
        match message {
            StreamMessage::Result(r) => assert_eq!(r.minion_id, "server-assigned-id"),
            StreamMessage::Status(s) => assert_eq!(s.minion_id, "server-assigned-id"),
            StreamMessage::Command(_) => panic!("commands never travel outbound"),
        }
    }
}

#[tokio::test]
async fn test_seq_num_recorded_from_metadata() {
    let processor = processor_with(LogLevel::Info);
    let mut cmd = command("c10", "system:os");
    cmd.metadata
        .insert("seq_num".to_string(), "17".to_string());

    let mut stream = ScriptedStream::new(vec![
        Inbound::Msg(StreamMessage::Command(cmd)),
        Inbound::Closed,
    ]);

    let _ = processor
        .process(&CancellationToken::new(), &mut stream)
        .await;

    assert_eq!(processor.seq_num_for("c10").await.as_deref(), Some("17"));
}

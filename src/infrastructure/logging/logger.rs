//! Tracing subscriber setup.
//!
//! Every layer is filtered through the shared [`LevelHandle`]: the cell is
//! read per event, so `logging:increase` / `logging:decrease` take effect
//! immediately without re-initializing the subscriber.

use crate::domain::models::{LevelHandle, LogConfig, LogFormat, LogLevel, RotationPolicy};
use anyhow::Result;
use std::io;
use tracing::{Level, Metadata};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Logger implementation using tracing.
pub struct Logger {
    _guard: Option<WorkerGuard>,
}

impl Logger {
    /// Initialize the global subscriber and return the logger together with
    /// the level handle that controls it.
    ///
    /// # Errors
    /// Returns an error if the configured level string is invalid.
    pub fn init(config: &LogConfig) -> Result<(Self, LevelHandle)> {
        let initial: LogLevel = config
            .level
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?;
        let handle = LevelHandle::new(initial);

        let guard = if let Some(ref log_dir) = config.log_dir {
            let file_appender = match config.rotation {
                RotationPolicy::Daily => rolling::daily(log_dir, "minion.log"),
                RotationPolicy::Hourly => rolling::hourly(log_dir, "minion.log"),
                RotationPolicy::Never => rolling::never(log_dir, "minion.log"),
            };
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            // File output is always JSON for structured logging.
            let file_filter = handle.clone();
            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true)
                .with_filter(filter_fn(move |meta| enabled(&file_filter, meta)));

            if config.enable_stdout {
                let stdout_filter = handle.clone();
                match config.format {
                    LogFormat::Json => {
                        let stdout_layer = tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(io::stdout)
                            .with_target(true)
                            .with_filter(filter_fn(move |meta| enabled(&stdout_filter, meta)));
                        tracing_subscriber::registry()
                            .with(file_layer)
                            .with(stdout_layer)
                            .init();
                    }
                    LogFormat::Pretty => {
                        let stdout_layer = tracing_subscriber::fmt::layer()
                            .with_writer(io::stdout)
                            .with_target(true)
                            .with_filter(filter_fn(move |meta| enabled(&stdout_filter, meta)));
                        tracing_subscriber::registry()
                            .with(file_layer)
                            .with(stdout_layer)
                            .init();
                    }
                }
            } else {
                tracing_subscriber::registry().with(file_layer).init();
            }

            Some(guard)
        } else {
            let stdout_filter = handle.clone();
            match config.format {
                LogFormat::Json => {
                    let stdout_layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(io::stdout)
                        .with_target(true)
                        .with_filter(filter_fn(move |meta| enabled(&stdout_filter, meta)));
                    tracing_subscriber::registry().with(stdout_layer).init();
                }
                LogFormat::Pretty => {
                    let stdout_layer = tracing_subscriber::fmt::layer()
                        .with_writer(io::stdout)
                        .with_target(true)
                        .with_filter(filter_fn(move |meta| enabled(&stdout_filter, meta)));
                    tracing_subscriber::registry().with(stdout_layer).init();
                }
            }

            None
        };

        tracing::info!(
            level = %initial,
            format = ?config.format,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );

        Ok((Self { _guard: guard }, handle))
    }
}

/// Per-event filter decision against the shared level cell.
fn enabled(handle: &LevelHandle, meta: &Metadata<'_>) -> bool {
    *meta.level() <= tracing_level(handle.get())
}

/// Map the domain level onto tracing's severity scale.
fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
    }
}

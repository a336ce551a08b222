//! Minion agent entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use minion::domain::models::AgentConfig;
use minion::infrastructure::compose::ComposeRunner;
use minion::infrastructure::config::ConfigLoader;
use minion::infrastructure::fingerprint;
use minion::infrastructure::logging::Logger;
use minion::infrastructure::shell::ShellExecutor;
use minion::infrastructure::transport::TcpConnector;
use minion::services::{Agent, HandlerRegistry, StreamProcessor};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "minion", version, about = "Fleet-management agent executing controller commands")]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the controller and execute commands
    Run {
        /// Controller address, overriding the configuration
        #[arg(long)]
        server: Option<String>,
    },
    /// Print this host's fingerprint and exit
    Fingerprint,
    /// List available command handlers
    Handlers {
        /// Show detailed help for one handler
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
    .context("Failed to load configuration")?;

    match cli.command {
        Commands::Fingerprint => {
            let fingerprint =
                fingerprint::generate().context("Failed to derive host fingerprint")?;
            println!("{fingerprint}");
            Ok(())
        }
        Commands::Handlers { name } => {
            let registry = HandlerRegistry::with_defaults(
                ShellExecutor::new(Duration::from_secs(config.shell.default_timeout_secs)),
                ComposeRunner::default(),
            );
            match name {
                Some(name) => match registry.format_help_for(&name) {
                    Some(help) => print!("{help}"),
                    None => anyhow::bail!("unknown handler: {name}"),
                },
                None => print!("{}", registry.format_help()),
            }
            Ok(())
        }
        Commands::Run { server } => run(config, server).await,
    }
}

async fn run(mut config: AgentConfig, server: Option<String>) -> Result<()> {
    if let Some(server) = server {
        config.server.address = server;
    }

    let (_logger, level_handle) =
        Logger::init(&config.logging).context("Failed to initialize logging")?;

    let agent_id = fingerprint::generate().context("Failed to derive host fingerprint")?;
    tracing::info!(
        agent_id = %agent_id,
        server = %config.server.address,
        "minion starting"
    );

    let shell = ShellExecutor::new(Duration::from_secs(config.shell.default_timeout_secs));
    let registry = Arc::new(HandlerRegistry::with_defaults(shell, ComposeRunner::default()));
    let processor = Arc::new(StreamProcessor::new(
        registry,
        agent_id,
        level_handle,
        Duration::from_secs(config.stream.idle_timeout_secs),
    ));

    let connector = Arc::new(TcpConnector::new(config.server.address.clone()));
    let agent = Agent::new(processor, connector, config.reconnect.clone());

    let token = CancellationToken::new();
    let shutdown = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, shutting down");
            shutdown.cancel();
        }
    });

    agent.run(token).await
}

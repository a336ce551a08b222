//! Configuration loading with hierarchical merging.

use crate::domain::models::AgentConfig;
use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: error, warn, info, debug")]
    InvalidLogLevel(String),

    #[error("Server address cannot be empty")]
    EmptyServerAddress,

    #[error("Invalid idle timeout: {0}. Must be positive")]
    InvalidIdleTimeout(u64),

    #[error("Invalid shell timeout: {0}. Must be positive")]
    InvalidShellTimeout(u64),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. minion.yaml in the working directory
    /// 3. Environment variables (MINION_* prefix, highest priority)
    pub fn load() -> Result<AgentConfig> {
        let config: AgentConfig = Figment::new()
            .merge(Serialized::defaults(AgentConfig::default()))
            .merge(Yaml::file("minion.yaml"))
            .merge(Env::prefixed("MINION_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<AgentConfig> {
        let config: AgentConfig = Figment::new()
            .merge(Serialized::defaults(AgentConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("MINION_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &AgentConfig) -> Result<(), ConfigError> {
        if config.server.address.trim().is_empty() {
            return Err(ConfigError::EmptyServerAddress);
        }

        if config.stream.idle_timeout_secs == 0 {
            return Err(ConfigError::InvalidIdleTimeout(
                config.stream.idle_timeout_secs,
            ));
        }

        if config.shell.default_timeout_secs == 0 {
            return Err(ConfigError::InvalidShellTimeout(
                config.shell.default_timeout_secs,
            ));
        }

        if config.reconnect.initial_backoff_ms >= config.reconnect.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.reconnect.initial_backoff_ms,
                config.reconnect.max_backoff_ms,
            ));
        }

        if config.logging.level.parse::<crate::domain::models::LogLevel>().is_err() {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

//! Handler registry: name-indexed dispatch and help rendering.
//!
//! Lookup uses the payload's first whitespace-separated token, including
//! any `name:sub` prefix. Bare JSON payloads carry no name token, so they
//! are routed on their `command` field: file subcommands go to the `file`
//! router, compose subcommands (with a `path`) to their specific handler,
//! anything else to `shell`.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{ExecutionContext, HandlerCategory, HandlerDefinition, Payload};
use crate::domain::ports::{CommandHandler, CommandOutput};
use crate::infrastructure::compose::ComposeRunner;
use crate::infrastructure::shell::ShellExecutor;
use crate::services::handlers::{
    ComposeDownHandler, ComposeFindHandler, ComposePsHandler, ComposeRouterHandler,
    ComposeUpHandler, ComposeViewHandler, FileCopyHandler, FileGetHandler, FileInfoHandler,
    FileMoveHandler, FileRouterHandler, LoggingDecreaseHandler, LoggingIncreaseHandler,
    LoggingLevelHandler, ShellHandler, SystemAliasHandler, SystemInfoHandler, SystemOsHandler,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Registry for command handlers.
///
/// Registration is thread-safe for readers concurrent with writers;
/// runtime registrations after startup are permitted but rare.
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn CommandHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry populated with the full default handler set.
    pub fn with_defaults(shell: ShellExecutor, compose: ComposeRunner) -> Self {
        let registry = Self::new();

        registry.register(Arc::new(SystemInfoHandler));
        registry.register(Arc::new(SystemOsHandler));
        registry.register(Arc::new(SystemAliasHandler::new(shell.clone())));

        registry.register(Arc::new(LoggingLevelHandler));
        registry.register(Arc::new(LoggingIncreaseHandler));
        registry.register(Arc::new(LoggingDecreaseHandler));

        registry.register(Arc::new(ShellHandler::new(shell)));

        registry.register(Arc::new(FileGetHandler));
        registry.register(Arc::new(FileCopyHandler));
        registry.register(Arc::new(FileMoveHandler));
        registry.register(Arc::new(FileInfoHandler));
        registry.register(Arc::new(FileRouterHandler));

        registry.register(Arc::new(ComposePsHandler::new(compose.clone())));
        registry.register(Arc::new(ComposeUpHandler::new(compose.clone())));
        registry.register(Arc::new(ComposeDownHandler::new(compose)));
        registry.register(Arc::new(ComposeFindHandler));
        registry.register(Arc::new(ComposeViewHandler));
        registry.register(Arc::new(ComposeRouterHandler));

        registry
    }

    /// Register a handler under its metadata name. Re-registration under
    /// the same name replaces the previous handler.
    pub fn register(&self, handler: Arc<dyn CommandHandler>) {
        let name = handler.metadata().name;
        debug!(%name, "registering command handler");
        self.handlers
            .write()
            .expect("handler registry lock poisoned")
            .insert(name, handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CommandHandler>> {
        self.handlers
            .read()
            .expect("handler registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// Resolve the payload to a handler and execute it.
    ///
    /// A miss yields [`AgentError::CommandNotFound`], whose text is the
    /// `command not found: <payload>` line reported back to the controller.
    pub async fn dispatch(
        &self,
        ctx: &ExecutionContext,
        payload: &str,
    ) -> AgentResult<CommandOutput> {
        let handler = self.resolve(payload)?;
        handler.execute(ctx, payload).await
    }

    fn resolve(&self, payload: &str) -> AgentResult<Arc<dyn CommandHandler>> {
        let trimmed = payload.trim();
        if trimmed.starts_with('{') {
            return self.resolve_json(trimmed);
        }

        let key = Payload::lookup_key(trimmed)
            .ok_or_else(|| AgentError::CommandNotFound(trimmed.to_string()))?;
        self.get(key)
            .ok_or_else(|| AgentError::CommandNotFound(trimmed.to_string()))
    }

    /// Route a bare JSON payload on its `command` field.
    fn resolve_json(&self, trimmed: &str) -> AgentResult<Arc<dyn CommandHandler>> {
        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| AgentError::Parse(format!("invalid JSON payload: {e}")))?;
        let command = value
            .get("command")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| {
                AgentError::Parse("JSON payload requires a string command field".into())
            })?;

        let key = match command {
            "get" | "copy" | "move" | "info" => "file".to_string(),
            "ps" | "up" | "down" | "find" | "view" if value.get("path").is_some() => {
                format!("docker-compose:{command}")
            }
            // Anything else is a shell command line.
            _ => "shell".to_string(),
        };

        self.get(&key)
            .ok_or_else(|| AgentError::CommandNotFound(trimmed.to_string()))
    }

    /// Handler definitions grouped by category, sorted by name.
    pub fn by_category(&self) -> BTreeMap<HandlerCategory, Vec<HandlerDefinition>> {
        let mut grouped: BTreeMap<HandlerCategory, Vec<HandlerDefinition>> = BTreeMap::new();
        for handler in self
            .handlers
            .read()
            .expect("handler registry lock poisoned")
            .values()
        {
            let def = handler.metadata();
            grouped.entry(def.category).or_default().push(def);
        }
        for defs in grouped.values_mut() {
            defs.sort_by(|a, b| a.name.cmp(&b.name));
        }
        grouped
    }

    /// Plain-text help listing every handler by category.
    pub fn format_help(&self) -> String {
        let mut out = String::from("Available commands:\n");
        for (category, defs) in self.by_category() {
            out.push_str(&format!("\n{category}:\n"));
            for def in defs {
                out.push_str(&format!("  {:<24} {}\n", def.name, def.description));
            }
        }
        out
    }

    /// Detailed plain-text help for one handler.
    pub fn format_help_for(&self, name: &str) -> Option<String> {
        let def = self.get(name)?.metadata();
        let mut out = format!("{}\n  {}\n", def.name, def.description);
        if !def.usage.is_empty() {
            out.push_str(&format!("\nUsage:\n  {}\n", def.usage));
        }
        if !def.parameters.is_empty() {
            out.push_str("\nParameters:\n");
            for p in &def.parameters {
                let required = if p.required { "required" } else { "optional" };
                out.push_str(&format!("  {} ({}, {})", p.name, p.param_type, required));
                if let Some(ref default) = p.default {
                    out.push_str(&format!(" [default: {default}]"));
                }
                out.push_str(&format!(": {}\n", p.description));
            }
        }
        if !def.examples.is_empty() {
            out.push_str("\nExamples:\n");
            for example in &def.examples {
                out.push_str(&format!("  {example}\n"));
            }
        }
        if let Some(ref notes) = def.notes {
            out.push_str(&format!("\nNotes:\n  {notes}\n"));
        }
        Some(out)
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

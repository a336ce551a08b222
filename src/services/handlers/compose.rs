//! docker-compose handlers: ps, up, down, find, view, and the router.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{
    ExecutionContext, HandlerCategory, HandlerDefinition, Payload, TokenPayload,
};
use crate::domain::ports::{CommandHandler, CommandOutput};
use crate::infrastructure::compose::{self, ComposeOutput, ComposeRunner};
use crate::infrastructure::fsops::validate_path;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Request shared by every compose operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeRequest {
    /// Subcommand; consumed by the router only.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub command: String,

    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    pub build: bool,
}

impl ComposeRequest {
    /// Build a request from the token form. `--build` and the service name
    /// are accepted in any order after the path.
    pub fn from_tokens(tokens: &TokenPayload, skip: usize) -> AgentResult<Self> {
        let path = tokens
            .arg(skip)
            .ok_or_else(|| AgentError::Validation("compose path required".into()))?
            .to_string();

        Ok(Self {
            command: String::new(),
            path,
            service: tokens.arg(skip + 1).map(ToString::to_string),
            build: tokens.has_flag("build"),
        })
    }

    fn parse(payload: &str) -> AgentResult<Self> {
        match Payload::parse(payload)? {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| AgentError::Parse(format!("invalid compose request: {e}"))),
            Payload::Tokens(tokens) => Self::from_tokens(&tokens, 0),
        }
    }
}

fn output_from(compose: &ComposeOutput) -> CommandOutput {
    CommandOutput {
        exit_code: compose.exit_code,
        stdout: compose.output.clone(),
        stderr: compose.error.clone(),
    }
}

/// `docker-compose:ps`: list project containers.
pub struct ComposePsHandler {
    runner: ComposeRunner,
}

impl ComposePsHandler {
    pub fn new(runner: ComposeRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl CommandHandler for ComposePsHandler {
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let request = ComposeRequest::parse(payload)?;
        let dir = validate_path(&request.path)?;
        let result = self.runner.run(ctx, &dir, &["ps"]).await?;
        Ok(output_from(&result))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "docker-compose:ps",
            HandlerCategory::Docker,
            "List containers of a compose project",
        )
        .usage("docker-compose:ps <path>")
        .example("docker-compose:ps /opt/app")
    }
}

/// `docker-compose:up`: start a project detached, optionally rebuilding or
/// limited to one service.
pub struct ComposeUpHandler {
    runner: ComposeRunner,
}

impl ComposeUpHandler {
    pub fn new(runner: ComposeRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl CommandHandler for ComposeUpHandler {
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let request = ComposeRequest::parse(payload)?;
        let dir = validate_path(&request.path)?;

        let mut args = vec!["up", "-d"];
        if request.build {
            args.push("--build");
        }
        if let Some(ref service) = request.service {
            args.push(service.as_str());
        }

        let result = self.runner.run(ctx, &dir, &args).await?;
        Ok(output_from(&result))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "docker-compose:up",
            HandlerCategory::Docker,
            "Start a compose project detached",
        )
        .usage("docker-compose:up <path> [--build] [service]")
        .example("docker-compose:up /opt/app --build web")
        .parameter("path", "string", true, None, "Compose project directory")
        .parameter("service", "string", false, None, "Limit to one service")
        .parameter("build", "bool", false, Some("false"), "Rebuild images first")
    }
}

/// `docker-compose:down`: stop a project, or stop and remove one service.
pub struct ComposeDownHandler {
    runner: ComposeRunner,
}

impl ComposeDownHandler {
    pub fn new(runner: ComposeRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl CommandHandler for ComposeDownHandler {
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let request = ComposeRequest::parse(payload)?;
        let dir = validate_path(&request.path)?;

        let Some(ref service) = request.service else {
            let result = self.runner.run(ctx, &dir, &["down"]).await?;
            return Ok(output_from(&result));
        };

        let stop = self.runner.run(ctx, &dir, &["stop", service.as_str()]).await?;
        let mut output = output_from(&stop);

        // The rm failure is non-fatal; it is appended as a warning.
        let rm = self
            .runner
            .run(ctx, &dir, &["rm", "-f", service.as_str()])
            .await?;
        if rm.succeeded() {
            if !rm.output.is_empty() {
                output.stdout = format!("{}\n{}", output.stdout, rm.output);
            }
        } else {
            output.stdout = format!(
                "{}\nwarning: failed to remove service {service}: {}",
                output.stdout,
                if rm.error.is_empty() { &rm.output } else { &rm.error }
            );
        }

        Ok(output)
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "docker-compose:down",
            HandlerCategory::Docker,
            "Stop a compose project, or stop and remove one service",
        )
        .usage("docker-compose:down <path> [service]")
        .example("docker-compose:down /opt/app")
        .example("docker-compose:down /opt/app web")
    }
}

/// `docker-compose:find`: list every compose project under a root.
pub struct ComposeFindHandler;

#[async_trait]
impl CommandHandler for ComposeFindHandler {
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let request = ComposeRequest::parse(payload)?;
        let root = validate_path(&request.path)?;

        let projects = compose::find_projects(ctx, &root)?;
        let mut out = format!("Found {} compose project(s)\n", projects.len());
        for project in &projects {
            out.push_str(&format!("{}\n", project.display()));
        }

        Ok(CommandOutput::success(out))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "docker-compose:find",
            HandlerCategory::Docker,
            "Walk a directory tree and list compose projects",
        )
        .usage("docker-compose:find <root>")
        .example("docker-compose:find /opt")
        .notes("Unreadable directories are skipped.")
    }
}

/// `docker-compose:view`: return the compose file contents verbatim.
pub struct ComposeViewHandler;

#[async_trait]
impl CommandHandler for ComposeViewHandler {
    async fn execute(&self, _ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let request = ComposeRequest::parse(payload)?;
        let dir = validate_path(&request.path)?;

        let (file, contents) = compose::view(&dir)?;
        Ok(CommandOutput::success(format!(
            "=== {} ===\n{contents}",
            file.display()
        )))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "docker-compose:view",
            HandlerCategory::Docker,
            "Show the compose file of a project",
        )
        .usage("docker-compose:view <path>")
        .example("docker-compose:view /opt/app")
    }
}

/// `docker-compose`: router that always directs to a subcommand.
pub struct ComposeRouterHandler;

#[async_trait]
impl CommandHandler for ComposeRouterHandler {
    async fn execute(&self, _ctx: &ExecutionContext, _payload: &str) -> AgentResult<CommandOutput> {
        Err(AgentError::Validation(
            "use a specific docker-compose subcommand: docker-compose:ps, docker-compose:up, \
             docker-compose:down, docker-compose:find or docker-compose:view"
                .into(),
        ))
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "docker-compose",
            HandlerCategory::Docker,
            "Entry point for compose operations; always directs to a subcommand",
        )
        .usage("docker-compose:<ps|up|down|find|view> <path> [args]")
        .example("docker-compose:ps /opt/app")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LevelHandle;
    use std::fs;
    use tokio_util::sync::CancellationToken;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(
            CancellationToken::new(),
            "minion-test",
            "cmd-test",
            LevelHandle::default(),
        )
    }

    #[test]
    fn test_token_parsing_order_insensitive() {
        let a = ComposeRequest::parse("docker-compose:up /opt/app --build web").unwrap();
        let b = ComposeRequest::parse("docker-compose:up /opt/app web --build").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.path, "/opt/app");
        assert_eq!(a.service.as_deref(), Some("web"));
        assert!(a.build);
    }

    #[test]
    fn test_token_round_trips_through_json() {
        let request = ComposeRequest::parse("docker-compose:up /opt/app --build web").unwrap();
        let json = serde_json::to_string(&request).unwrap();
        let reparsed: ComposeRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, reparsed);
    }

    #[test]
    fn test_path_required() {
        assert!(ComposeRequest::parse("docker-compose:ps").is_err());
    }

    #[tokio::test]
    async fn test_ps_missing_path() {
        let handler = ComposePsHandler::new(ComposeRunner::default());
        let err = handler
            .execute(&ctx(), "docker-compose:ps /nonexistent")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("path does not exist"));
    }

    #[tokio::test]
    async fn test_find_two_projects() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("x/one")).unwrap();
        fs::create_dir_all(dir.path().join("y/two")).unwrap();
        fs::write(dir.path().join("x/one/docker-compose.yml"), "a").unwrap();
        fs::write(dir.path().join("y/two/docker-compose.yaml"), "b").unwrap();

        let out = ComposeFindHandler
            .execute(
                &ctx(),
                &format!("docker-compose:find {}", dir.path().display()),
            )
            .await
            .unwrap();
        assert!(out.stdout.contains("Found 2 compose project(s)"));
        assert!(out.stdout.contains("x/one"));
        assert!(out.stdout.contains("y/two"));
    }

    #[tokio::test]
    async fn test_view_header_names_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("docker-compose.yml"),
            "services:\n  web: {}\n",
        )
        .unwrap();

        let out = ComposeViewHandler
            .execute(
                &ctx(),
                &format!("docker-compose:view {}", dir.path().display()),
            )
            .await
            .unwrap();
        assert!(out.stdout.starts_with("=== "));
        assert!(out.stdout.contains("docker-compose.yml"));
        assert!(out.stdout.contains("services:"));
    }

    #[tokio::test]
    async fn test_router_always_fails() {
        let err = ComposeRouterHandler
            .execute(&ctx(), "docker-compose /opt/app")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("docker-compose:ps"));
    }
}

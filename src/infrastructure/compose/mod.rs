//! Wrappers over the `docker compose` CLI.
//!
//! Every operation resolves and validates the compose directory first; the
//! external tool is invoked as `docker compose -f <file> <subcommand>` with
//! the compose directory as working directory.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::ExecutionContext;
use crate::infrastructure::shell::human_duration;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::Instant;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Recognized compose file names, in preference order.
pub const COMPOSE_FILES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// Output of one compose invocation.
#[derive(Debug, Clone)]
pub struct ComposeOutput {
    pub exit_code: i32,

    /// Combined stdout+stderr capture.
    pub output: String,

    /// Error summary; empty on success.
    pub error: String,

    pub timed_out: bool,
    pub duration: String,
}

impl ComposeOutput {
    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Locate the compose file inside a project directory.
///
/// The directory must exist and contain `docker-compose.yml` (preferred) or
/// `docker-compose.yaml`.
pub fn find_compose_file(dir: &Path) -> AgentResult<PathBuf> {
    if !dir.exists() {
        return Err(AgentError::Validation(format!(
            "path does not exist: {}",
            dir.display()
        )));
    }
    if !dir.is_dir() {
        return Err(AgentError::Validation(format!(
            "path is not a directory: {}",
            dir.display()
        )));
    }

    for name in COMPOSE_FILES {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(AgentError::Validation(format!(
        "no docker-compose.yml or docker-compose.yaml in {}",
        dir.display()
    )))
}

/// Runs `docker compose` subcommands with a deadline.
#[derive(Debug, Clone)]
pub struct ComposeRunner {
    timeout: Duration,
}

impl ComposeRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Invoke `docker compose -f <file> <args…>` in `dir`.
    pub async fn run(
        &self,
        ctx: &ExecutionContext,
        dir: &Path,
        args: &[&str],
    ) -> AgentResult<ComposeOutput> {
        let compose_file = find_compose_file(dir)?;

        debug!(
            command_id = %ctx.command_id(),
            dir = %dir.display(),
            ?args,
            "running docker compose"
        );

        let started = Instant::now();
        let mut cmd = Command::new("docker");
        cmd.arg("compose")
            .arg("-f")
            .arg(&compose_file)
            .args(args)
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return Ok(ComposeOutput {
                    exit_code: 1,
                    output: String::new(),
                    error: format!("failed to spawn docker: {e}"),
                    timed_out: false,
                    duration: human_duration(started.elapsed()),
                });
            }
        };

        let mut deadline = Instant::now() + self.timeout;
        if let Some(ctx_deadline) = ctx.deadline() {
            deadline = deadline.min(ctx_deadline);
        }

        let wait = child.wait_with_output();
        tokio::pin!(wait);

        tokio::select! {
            result = &mut wait => {
                let elapsed = started.elapsed();
                match result {
                    Ok(output) => {
                        let exit_code = output.status.code().unwrap_or(-1);
                        let combined = [&output.stdout[..], &output.stderr[..]]
                            .map(|b| String::from_utf8_lossy(b).trim_end().to_string())
                            .into_iter()
                            .filter(|s| !s.is_empty())
                            .collect::<Vec<_>>()
                            .join("\n");
                        let error = if output.status.success() {
                            String::new()
                        } else {
                            format!("docker compose exited with code {exit_code}")
                        };
                        Ok(ComposeOutput {
                            exit_code,
                            output: combined,
                            error,
                            timed_out: false,
                            duration: human_duration(elapsed),
                        })
                    }
                    Err(e) => Ok(ComposeOutput {
                        exit_code: 1,
                        output: String::new(),
                        error: format!("failed to collect docker compose output: {e}"),
                        timed_out: false,
                        duration: human_duration(elapsed),
                    }),
                }
            }
            () = tokio::time::sleep_until(deadline) => {
                warn!(command_id = %ctx.command_id(), "docker compose timed out, killing child");
                Ok(ComposeOutput {
                    exit_code: 124,
                    output: String::new(),
                    error: format!("docker compose timed out after {}s", self.timeout.as_secs()),
                    timed_out: true,
                    duration: human_duration(started.elapsed()),
                })
            }
            () = ctx.token().cancelled() => {
                Ok(ComposeOutput {
                    exit_code: 130,
                    output: String::new(),
                    error: "docker compose cancelled".to_string(),
                    timed_out: false,
                    duration: human_duration(started.elapsed()),
                })
            }
        }
    }
}

impl Default for ComposeRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

/// Walk `root` and return every directory holding a compose file.
///
/// Unreadable directories are skipped silently; permission errors never
/// fail the walk.
pub fn find_projects(ctx: &ExecutionContext, root: &Path) -> AgentResult<Vec<PathBuf>> {
    if !root.exists() {
        return Err(AgentError::Validation(format!(
            "path does not exist: {}",
            root.display()
        )));
    }

    let mut projects = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        if entry.file_type().is_file()
            && COMPOSE_FILES
                .iter()
                .any(|name| entry.file_name().to_str() == Some(*name))
        {
            if let Some(parent) = entry.path().parent() {
                let parent = parent.to_path_buf();
                if !projects.contains(&parent) {
                    projects.push(parent);
                }
            }
        }
    }

    Ok(projects)
}

/// Return the compose file contents of a directory, with the resolved file.
pub fn view(dir: &Path) -> AgentResult<(PathBuf, String)> {
    let compose_file = find_compose_file(dir)?;
    let contents = std::fs::read_to_string(&compose_file)?;
    Ok((compose_file, contents))
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
    fn test_find_compose_file_prefers_yml() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("docker-compose.yml"), "services: {}\n").unwrap();
        fs::write(dir.path().join("docker-compose.yaml"), "services: {}\n").unwrap();

        let found = find_compose_file(dir.path()).unwrap();
        assert!(found.ends_with("docker-compose.yml"));
    }

    #[test]
    fn test_find_compose_file_missing_path() {
        let err = find_compose_file(Path::new("/nonexistent")).unwrap_err();
        assert!(err.to_string().contains("path does not exist"));
    }

    #[test]
    fn test_find_compose_file_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_compose_file(dir.path()).is_err());
    }

    #[test]
    fn test_find_projects_both_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::create_dir_all(dir.path().join("c/d")).unwrap();
        fs::write(dir.path().join("a/b/docker-compose.yml"), "x").unwrap();
        fs::write(dir.path().join("c/d/docker-compose.yaml"), "y").unwrap();

        let mut projects = find_projects(&ctx(), dir.path()).unwrap();
        projects.sort();
        assert_eq!(projects.len(), 2);
        assert!(projects[0].ends_with("a/b"));
        assert!(projects[1].ends_with("c/d"));
    }

    #[test]
    fn test_view() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("docker-compose.yaml"), "services: {}\n").unwrap();

        let (file, contents) = view(dir.path()).unwrap();
        assert!(file.ends_with("docker-compose.yaml"));
        assert_eq!(contents, "services: {}\n");
    }
}

//! File operation handlers: get, copy, move, info, and the unified router.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::{
    ExecutionContext, HandlerCategory, HandlerDefinition, Payload, TokenPayload,
};
use crate::domain::ports::{CommandHandler, CommandOutput};
use crate::infrastructure::fsops::{
    self, metadata::FileMetadata, transfer, validate_path, CopyOptions,
};
use crate::infrastructure::shell::human_duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Options shared by copy and move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    pub overwrite: bool,
    pub create_dirs: bool,
    pub preserve_perm: bool,
}

/// Request shared by every file operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRequest {
    /// Subcommand; consumed by the router only.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub command: String,

    pub source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    pub recursive: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,

    pub options: FileOptions,
}

impl FileRequest {
    /// Build a request from the token form. `skip` leading positional
    /// arguments are consumed by the caller (the router's subcommand).
    pub fn from_tokens(tokens: &TokenPayload, skip: usize) -> AgentResult<Self> {
        let source = tokens
            .arg(skip)
            .ok_or_else(|| AgentError::Validation("source path required".into()))?
            .to_string();

        Ok(Self {
            command: String::new(),
            source,
            destination: tokens.arg(skip + 1).map(ToString::to_string),
            recursive: tokens.has_flag("recursive"),
            max_size: None,
            options: FileOptions {
                overwrite: tokens.has_flag("overwrite"),
                create_dirs: tokens.has_flag("create-dirs"),
                preserve_perm: tokens.has_flag("preserve-perm"),
            },
        })
    }

    /// Parse either payload form for a named (non-router) file handler.
    fn parse(payload: &str) -> AgentResult<Self> {
        match Payload::parse(payload)? {
            Payload::Json(value) => serde_json::from_value(value)
                .map_err(|e| AgentError::Parse(format!("invalid file request: {e}"))),
            Payload::Tokens(tokens) => Self::from_tokens(&tokens, 0),
        }
    }

    fn destination(&self) -> AgentResult<&str> {
        self.destination
            .as_deref()
            .ok_or_else(|| AgentError::Validation("destination path required".into()))
    }
}

/// Response for `file:get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetResponse {
    pub file_info: FileMetadata,
    pub content: String,
    pub content_b64: String,
    pub preview_only: bool,
    pub truncated: bool,
}

/// Response for `file:copy` and `file:move`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResponse {
    pub source: String,
    pub destination: String,
    pub files_count: u64,
    pub bytes_copied: u64,
    pub duration: String,
}

/// Response for `file:info`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub file_info: FileMetadata,

    /// Immediate children, when requested on a directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<FileMetadata>>,
}

fn json_output<T: Serialize>(response: &T) -> AgentResult<CommandOutput> {
    Ok(CommandOutput::success(serde_json::to_string_pretty(
        response,
    )?))
}

fn do_get(_ctx: &ExecutionContext, request: &FileRequest) -> AgentResult<CommandOutput> {
    let path = validate_path(&request.source)?;
    let file_info = fsops::metadata::gather(&path)?;

    let response = if file_info.is_dir {
        // Directories report metadata only.
        GetResponse {
            file_info,
            content: String::new(),
            content_b64: String::new(),
            preview_only: false,
            truncated: false,
        }
    } else {
        let content = fsops::read_content(&path, file_info.size, request.max_size)?;
        GetResponse {
            file_info,
            content: content.content,
            content_b64: content.content_b64,
            preview_only: content.preview_only,
            truncated: content.truncated,
        }
    };

    json_output(&response)
}

fn do_copy(ctx: &ExecutionContext, request: &FileRequest) -> AgentResult<CommandOutput> {
    let src = validate_path(&request.source)?;
    let dst = validate_path(request.destination()?)?;
    let opts = CopyOptions {
        recursive: request.recursive,
        overwrite: request.options.overwrite,
        create_dirs: request.options.create_dirs,
        preserve_perm: request.options.preserve_perm,
    };

    let started = Instant::now();
    let stats = transfer::copy(ctx, &src, &dst, opts)?;

    json_output(&TransferResponse {
        source: src.display().to_string(),
        destination: dst.display().to_string(),
        files_count: stats.files_count,
        bytes_copied: stats.bytes_copied,
        duration: human_duration(started.elapsed()),
    })
}

fn do_move(ctx: &ExecutionContext, request: &FileRequest) -> AgentResult<CommandOutput> {
    let src = validate_path(&request.source)?;
    let dst = validate_path(request.destination()?)?;
    let opts = CopyOptions {
        recursive: request.recursive,
        overwrite: request.options.overwrite,
        create_dirs: request.options.create_dirs,
        preserve_perm: request.options.preserve_perm,
    };

    let started = Instant::now();
    let stats = transfer::move_path(ctx, &src, &dst, opts)?;

    json_output(&TransferResponse {
        source: src.display().to_string(),
        destination: dst.display().to_string(),
        files_count: stats.files_count,
        bytes_copied: stats.bytes_copied,
        duration: human_duration(started.elapsed()),
    })
}

fn do_info(_ctx: &ExecutionContext, request: &FileRequest) -> AgentResult<CommandOutput> {
    let path = validate_path(&request.source)?;
    let file_info = fsops::metadata::gather(&path)?;

    let children = if file_info.is_dir && request.recursive {
        let mut entries: Vec<FileMetadata> = std::fs::read_dir(&path)?
            .filter_map(Result::ok)
            .filter_map(|entry| fsops::metadata::gather(&entry.path()).ok())
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Some(entries)
    } else {
        None
    };

    json_output(&InfoResponse {
        file_info,
        children,
    })
}

macro_rules! file_handler {
    ($handler:ident, $name:literal, $op:ident, $desc:literal, $usage:literal, $example:literal) => {
        pub struct $handler;

        #[async_trait]
        impl CommandHandler for $handler {
            async fn execute(
                &self,
                ctx: &ExecutionContext,
                payload: &str,
            ) -> AgentResult<CommandOutput> {
                let request = FileRequest::parse(payload)?;
                $op(ctx, &request)
            }

            fn metadata(&self) -> HandlerDefinition {
                HandlerDefinition::new($name, HandlerCategory::File, $desc)
                    .usage($usage)
                    .example($example)
            }
        }
    };
}

file_handler!(
    FileGetHandler,
    "file:get",
    do_get,
    "Fetch file content (with binary detection and preview caps) or directory metadata",
    "file:get <path>",
    "file:get /var/log/syslog"
);

file_handler!(
    FileCopyHandler,
    "file:copy",
    do_copy,
    "Copy a file or directory subtree",
    "file:copy <source> <destination> [--recursive] [--overwrite] [--create-dirs] [--preserve-perm]",
    "file:copy /etc/hosts /tmp/hosts.bak"
);

file_handler!(
    FileMoveHandler,
    "file:move",
    do_move,
    "Move a file or directory, falling back to copy-then-delete across devices",
    "file:move <source> <destination> [--overwrite] [--create-dirs] [--preserve-perm]",
    "file:move /tmp/old.log /var/tmp/old.log"
);

file_handler!(
    FileInfoHandler,
    "file:info",
    do_info,
    "Report metadata for a path, optionally listing a directory's children",
    "file:info <path> [--recursive]",
    "file:info /etc --recursive"
);

/// `file`: unified router delegating on the request's `command` field
/// (JSON form) or the first positional token (simple form).
pub struct FileRouterHandler;

#[async_trait]
impl CommandHandler for FileRouterHandler {
    async fn execute(&self, ctx: &ExecutionContext, payload: &str) -> AgentResult<CommandOutput> {
        let (subcommand, request) = match Payload::parse(payload)? {
            Payload::Json(value) => {
                let request: FileRequest = serde_json::from_value(value)
                    .map_err(|e| AgentError::Parse(format!("invalid file request: {e}")))?;
                (request.command.clone(), request)
            }
            Payload::Tokens(tokens) => {
                let sub = tokens
                    .arg(0)
                    .ok_or_else(|| {
                        AgentError::Validation(
                            "file requires a subcommand: get, copy, move or info".into(),
                        )
                    })?
                    .to_string();
                (sub, FileRequest::from_tokens(&tokens, 1)?)
            }
        };

        match subcommand.as_str() {
            "get" => do_get(ctx, &request),
            "copy" => do_copy(ctx, &request),
            "move" => do_move(ctx, &request),
            "info" => do_info(ctx, &request),
            other => Err(AgentError::Validation(format!(
                "unknown file subcommand: {other} (expected get, copy, move or info)"
            ))),
        }
    }

    fn metadata(&self) -> HandlerDefinition {
        HandlerDefinition::new(
            "file",
            HandlerCategory::File,
            "Route to a file operation by subcommand",
        )
        .usage("file <get|copy|move|info> <path> [destination] [flags]")
        .example("file get /etc/hostname")
        .example(r#"{"command":"copy","source":"/tmp/a","destination":"/tmp/b"}"#)
        .parameter("command", "string", true, None, "One of get, copy, move, info")
        .parameter("source", "string", true, None, "Source path")
        .parameter("destination", "string", false, None, "Destination path")
        .parameter("recursive", "bool", false, Some("false"), "Recurse into directories")
        .parameter(
            "options",
            "object",
            false,
            None,
            "overwrite, create_dirs, preserve_perm",
        )
    }
}

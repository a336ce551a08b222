//! Safe local file operations: metadata, content preview, copy and move.
//!
//! Every entry point validates its path through [`path::validate_path`]
//! before touching the filesystem.

pub mod metadata;
pub mod path;
pub mod transfer;

pub use metadata::{FileMetadata, CHECKSUM_TOO_LARGE};
pub use path::validate_path;
pub use transfer::{CopyOptions, TransferStats};

use crate::domain::errors::AgentResult;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::fs::File;
use std::io::Read;

/// Largest content preview (and checksum input) in bytes: 1 MiB.
pub const MAX_PREVIEW_SIZE: u64 = 1024 * 1024;

/// Largest file served whole: 100 MiB.
pub const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Content read for a `file:get`, classified as text or binary.
#[derive(Debug, Clone, Default)]
pub struct FileContent {
    /// Raw text; empty when the content is binary.
    pub content: String,

    /// Base64 of binary content; empty for text.
    pub content_b64: String,

    pub preview_only: bool,
    pub truncated: bool,
}

/// Read up to `min(max_size, MAX_FILE_SIZE)` bytes of a regular file.
///
/// Files above that limit are truncated to a preview of at most
/// [`MAX_PREVIEW_SIZE`] bytes. Content with a NUL byte anywhere in the
/// window is classified binary and returned base64-encoded.
pub fn read_content(
    path: &std::path::Path,
    size: u64,
    max_size: Option<u64>,
) -> AgentResult<FileContent> {
    let limit = max_size.unwrap_or(MAX_FILE_SIZE).min(MAX_FILE_SIZE);
    let (read_limit, preview_only) = if size > limit {
        (limit.min(MAX_PREVIEW_SIZE), true)
    } else {
        (size, false)
    };

    let mut bytes = Vec::with_capacity(usize::try_from(read_limit).unwrap_or(0));
    File::open(path)?
        .take(read_limit)
        .read_to_end(&mut bytes)?;

    let binary = bytes.contains(&0);
    Ok(FileContent {
        content: if binary {
            String::new()
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        },
        content_b64: if binary {
            BASE64.encode(&bytes)
        } else {
            String::new()
        },
        preview_only,
        truncated: preview_only,
    })
}

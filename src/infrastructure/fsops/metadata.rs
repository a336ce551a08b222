//! File metadata gathering.

use super::MAX_PREVIEW_SIZE;
use crate::domain::errors::{AgentError, AgentResult};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Checksum placeholder for files above the preview cap.
pub const CHECKSUM_TOO_LARGE: &str = "N/A (file too large)";

/// Metadata reported for every file or directory an operation touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    pub name: String,
    pub size: u64,
    pub mode: u32,
    pub mod_time: String,
    pub is_dir: bool,
    pub permissions: String,

    /// By extension; files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// MD5 hex digest; files only, and only up to the preview cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
}

/// Gather metadata for one path.
pub fn gather(path: &Path) -> AgentResult<FileMetadata> {
    let meta = fs::metadata(path).map_err(|e| {
        AgentError::Validation(format!("cannot stat {}: {e}", path.display()))
    })?;

    let is_dir = meta.is_dir();
    let size = meta.len();
    let mode = mode_bits(&meta);
    let mod_time = meta
        .modified()
        .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
        .unwrap_or_default();

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let content_type = if is_dir {
        None
    } else {
        Some(content_type_for(path).to_string())
    };

    let checksum = if is_dir {
        None
    } else if size > MAX_PREVIEW_SIZE {
        Some(CHECKSUM_TOO_LARGE.to_string())
    } else {
        Some(md5_hex(path)?)
    };

    let (uid, gid) = owner(&meta);

    Ok(FileMetadata {
        path: path.display().to_string(),
        name,
        size,
        mode,
        mod_time,
        is_dir,
        permissions: permissions_string(mode, is_dir),
        content_type,
        checksum,
        uid,
        gid,
    })
}

#[cfg(unix)]
fn mode_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}

#[cfg(unix)]
fn owner(meta: &fs::Metadata) -> (Option<u32>, Option<u32>) {
    use std::os::unix::fs::MetadataExt;
    (Some(meta.uid()), Some(meta.gid()))
}

#[cfg(not(unix))]
fn owner(_meta: &fs::Metadata) -> (Option<u32>, Option<u32>) {
    (None, None)
}

/// `ls`-style permission string, e.g. `drwxr-xr-x`.
pub fn permissions_string(mode: u32, is_dir: bool) -> String {
    let mut out = String::with_capacity(10);
    out.push(if is_dir { 'd' } else { '-' });
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// MD5 hex digest of a file's contents.
pub fn md5_hex(path: &Path) -> AgentResult<String> {
    let contents = fs::read(path)?;
    let mut hasher = Md5::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

/// Content type resolved from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "txt" | "log" | "md" | "cfg" | "conf" | "ini" | "toml" => "text/plain",
        "json" => "application/json",
        "yml" | "yaml" => "application/yaml",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "csv" => "text/csv",
        "sh" => "application/x-sh",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "tar" => "application/x-tar",
        "gz" => "application/gzip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

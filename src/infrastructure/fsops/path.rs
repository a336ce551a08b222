//! Path hygiene shared by every file operation.

use crate::domain::errors::{AgentError, AgentResult};
use std::path::{Component, Path, PathBuf};

/// Clean a raw path and reject traversal.
///
/// Cleaning drops `.` components and redundant separators but never
/// resolves `..`; any parent-directory segment fails validation before the
/// filesystem is touched. Absolute and relative paths are both accepted.
pub fn validate_path(raw: &str) -> AgentResult<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AgentError::Validation("path must not be empty".into()));
    }

    let mut cleaned = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::ParentDir => {
                return Err(AgentError::Validation(format!(
                    "path traversal not allowed: {trimmed}"
                )));
            }
            Component::CurDir => {}
            other => cleaned.push(other.as_os_str()),
        }
    }

    Ok(cleaned)
}

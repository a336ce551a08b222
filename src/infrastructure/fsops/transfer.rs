//! Copy and move algorithms shared by the file handlers.

use crate::domain::errors::{AgentError, AgentResult};
use crate::domain::models::ExecutionContext;
use serde::Serialize;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Options controlling a copy or the copy phase of a move.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyOptions {
    pub recursive: bool,
    pub overwrite: bool,
    pub create_dirs: bool,
    pub preserve_perm: bool,
}

/// Totals reported back to the controller.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TransferStats {
    pub files_count: u64,
    pub bytes_copied: u64,
}

/// Copy a file or (with `recursive`) a directory subtree.
pub fn copy(
    ctx: &ExecutionContext,
    src: &Path,
    dst: &Path,
    opts: CopyOptions,
) -> AgentResult<TransferStats> {
    let meta = fs::metadata(src).map_err(|e| {
        AgentError::Validation(format!("source does not exist: {}: {e}", src.display()))
    })?;

    let mut stats = TransferStats::default();
    if meta.is_dir() {
        if !opts.recursive {
            return Err(AgentError::Validation(format!(
                "source is a directory, pass recursive=true: {}",
                src.display()
            )));
        }
        copy_tree(ctx, src, dst, opts, &mut stats)?;
    } else {
        copy_file(src, dst, opts, &mut stats)?;
    }

    Ok(stats)
}

/// Move a file or directory: atomic rename first, copy-then-delete on
/// failure (e.g. cross-device). Recursion is implied for directories.
pub fn move_path(
    ctx: &ExecutionContext,
    src: &Path,
    dst: &Path,
    opts: CopyOptions,
) -> AgentResult<TransferStats> {
    let meta = fs::metadata(src).map_err(|e| {
        AgentError::Validation(format!("source does not exist: {}: {e}", src.display()))
    })?;
    let stats = tree_stats(src, &meta);

    if fs::rename(src, dst).is_ok() {
        return Ok(stats);
    }

    let copy_opts = CopyOptions {
        recursive: true,
        ..opts
    };
    let stats = if meta.is_dir() {
        let mut stats = TransferStats::default();
        copy_tree(ctx, src, dst, copy_opts, &mut stats)?;
        fs::remove_dir_all(src)?;
        stats
    } else {
        let mut stats = TransferStats::default();
        copy_file(src, dst, copy_opts, &mut stats)?;
        fs::remove_file(src)?;
        stats
    };

    Ok(stats)
}

/// Recreate `src`'s subtree under `dst`. Directories are created as
/// encountered and their modes mirrored once their contents are in place.
fn copy_tree(
    ctx: &ExecutionContext,
    src: &Path,
    dst: &Path,
    opts: CopyOptions,
    stats: &mut TransferStats,
) -> AgentResult<()> {
    let mut dir_modes: Vec<(std::path::PathBuf, u32)> = Vec::new();

    for entry in WalkDir::new(src) {
        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }

        let entry = entry.map_err(|e| AgentError::Execution(format!("walk failed: {e}")))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| AgentError::Execution(format!("walk escaped source root: {e}")))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            if let Ok(meta) = entry.metadata() {
                dir_modes.push((target, mode_of(&meta)));
            }
        } else if entry.file_type().is_file() {
            let file_opts = CopyOptions {
                // Parents were created while walking.
                create_dirs: false,
                ..opts
            };
            copy_file(entry.path(), &target, file_opts, stats)?;
        }
        // Symlinks and special files are skipped.
    }

    // Mirror directory modes deepest-first, after their contents landed.
    for (dir, mode) in dir_modes.into_iter().rev() {
        set_mode(&dir, mode);
    }

    Ok(())
}

fn copy_file(
    src: &Path,
    dst: &Path,
    opts: CopyOptions,
    stats: &mut TransferStats,
) -> AgentResult<()> {
    if dst.exists() && !opts.overwrite {
        return Err(AgentError::Validation(format!(
            "destination exists, pass overwrite=true: {}",
            dst.display()
        )));
    }

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if opts.create_dirs {
                fs::create_dir_all(parent)?;
            } else {
                return Err(AgentError::Validation(format!(
                    "destination directory does not exist, pass create_dirs=true: {}",
                    parent.display()
                )));
            }
        }
    }

    let bytes = fs::copy(src, dst)?;
    if opts.preserve_perm {
        if let Ok(meta) = fs::metadata(src) {
            set_mode(dst, mode_of(&meta));
        }
    }

    stats.files_count += 1;
    stats.bytes_copied += bytes;
    Ok(())
}

/// Pre-move totals used when the rename path succeeds.
fn tree_stats(path: &Path, meta: &fs::Metadata) -> TransferStats {
    if meta.is_dir() {
        let mut stats = TransferStats::default();
        for entry in WalkDir::new(path).into_iter().flatten() {
            if entry.file_type().is_file() {
                stats.files_count += 1;
                stats.bytes_copied += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
        stats
    } else {
        TransferStats {
            files_count: 1,
            bytes_copied: meta.len(),
        }
    }
}

#[cfg(unix)]
fn mode_of(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(_meta: &fs::Metadata) -> u32 {
    0
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    let _ = fs::set_permissions(path, fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::LevelHandle;
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
    fn test_copy_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"abc").unwrap();

        let stats = copy(&ctx(), &src, &dst, CopyOptions::default()).unwrap();
        assert_eq!(stats.files_count, 1);
        assert_eq!(stats.bytes_copied, 3);
        assert_eq!(fs::read(&dst).unwrap(), b"abc");
    }

    #[test]
    fn test_copy_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"new").unwrap();
        fs::write(&dst, b"old").unwrap();

        assert!(copy(&ctx(), &src, &dst, CopyOptions::default()).is_err());

        let stats = copy(
            &ctx(),
            &src,
            &dst,
            CopyOptions {
                overwrite: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(stats.files_count, 1);
        assert_eq!(fs::read(&dst).unwrap(), b"new");
    }

    #[test]
    fn test_copy_missing_parent_requires_create_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("deep/nested/b");
        fs::write(&src, b"x").unwrap();

        assert!(copy(&ctx(), &src, &dst, CopyOptions::default()).is_err());
        assert!(copy(
            &ctx(),
            &src,
            &dst,
            CopyOptions {
                create_dirs: true,
                ..Default::default()
            },
        )
        .is_ok());
    }

    #[test]
    fn test_copy_directory_requires_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/f"), b"1234").unwrap();
        let dst = dir.path().join("out");

        assert!(copy(&ctx(), &src, &dst, CopyOptions::default()).is_err());

        let stats = copy(
            &ctx(),
            &src,
            &dst,
            CopyOptions {
                recursive: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(stats.files_count, 1);
        assert_eq!(stats.bytes_copied, 4);
        assert_eq!(fs::read(dst.join("sub/f")).unwrap(), b"1234");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"x").unwrap();
        fs::set_permissions(&src, fs::Permissions::from_mode(0o751)).unwrap();

        copy(
            &ctx(),
            &src,
            &dst,
            CopyOptions {
                preserve_perm: true,
                ..Default::default()
            },
        )
        .unwrap();

        let mode = fs::metadata(&dst).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o751);
    }

    #[test]
    fn test_move_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        fs::write(&src, b"abc").unwrap();

        let stats = move_path(&ctx(), &src, &dst, CopyOptions::default()).unwrap();
        assert_eq!(stats.files_count, 1);
        assert_eq!(stats.bytes_copied, 3);
        assert!(!src.exists());
        assert_eq!(fs::read(&dst).unwrap(), b"abc");
    }

    #[test]
    fn test_move_directory() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("sub/f"), b"12").unwrap();
        let dst = dir.path().join("moved");

        let stats = move_path(&ctx(), &src, &dst, CopyOptions::default()).unwrap();
        assert_eq!(stats.files_count, 1);
        assert!(!src.exists());
        assert_eq!(fs::read(dst.join("sub/f")).unwrap(), b"12");
    }
}

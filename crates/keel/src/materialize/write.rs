//! Best-effort batch write of a [`FileTree`] under a root directory.
//!
//! Paths come from a model and are untrusted. Each is normalized lexically
//! (both `/` and `\` separate segments, `.` and empty segments vanish, `..`
//! pops) and rejected if it is absolute, carries a drive prefix, or climbs
//! out of the root. Directories are then created one segment at a time from
//! the canonical root, and each must canonicalize under the root before
//! anything is created inside it. A target that is already a symlink must
//! also resolve under the root.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::FileTree;
use crate::error::WriteError;

/// Result of writing one entry.
#[derive(Debug)]
pub struct EntryOutcome {
    /// The path as given in the file tree.
    pub path: String,
    /// Where the file was written, or why it was not.
    pub result: Result<PathBuf, WriteError>,
}

/// Per-entry results of [`write_file_tree`], in file-tree order.
#[derive(Debug)]
pub struct WriteReport {
    pub root: PathBuf,
    pub entries: Vec<EntryOutcome>,
}

impl WriteReport {
    /// Paths (as given) that were written.
    pub fn written(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.result.is_ok())
            .map(|e| e.path.as_str())
            .collect()
    }

    /// Entries that failed, with their errors.
    pub fn failures(&self) -> Vec<(&str, &WriteError)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|err| (e.path.as_str(), err)))
            .collect()
    }

    pub fn all_written(&self) -> bool {
        self.entries.iter().all(|e| e.result.is_ok())
    }
}

/// Write every entry of `tree` under `root`, creating `root` and any
/// intermediate directories. Existing files are overwritten.
///
/// Never stops early: each entry's outcome is recorded in the report.
pub fn write_file_tree(tree: &FileTree, root: &Path) -> WriteReport {
    let canonical_root = std::fs::create_dir_all(root).and_then(|()| root.canonicalize());

    let entries = match canonical_root {
        Ok(canonical_root) => {
            debug!("Writing {} file(s) under {}", tree.len(), canonical_root.display());
            tree.iter()
                .map(|(path, content)| EntryOutcome {
                    path: path.to_string(),
                    result: write_entry(&canonical_root, path, content),
                })
                .collect()
        }
        Err(e) => {
            warn!("Cannot prepare project root {}: {e}", root.display());
            tree.iter()
                .map(|(path, _)| EntryOutcome {
                    path: path.to_string(),
                    result: Err(WriteError::CreateRoot {
                        path: root.to_path_buf(),
                        source: io::Error::new(e.kind(), e.to_string()),
                    }),
                })
                .collect()
        }
    };

    let report = WriteReport {
        root: root.to_path_buf(),
        entries,
    };
    for (path, err) in report.failures() {
        warn!("Skipped {path}: {err}");
    }
    info!(
        "Wrote {}/{} file(s) to {}",
        report.written().len(),
        report.entries.len(),
        root.display()
    );
    report
}

fn write_entry(root: &Path, path: &str, content: &str) -> Result<PathBuf, WriteError> {
    let segments = entry_segments(path)?;
    let Some((file_name, dirs)) = segments.split_last() else {
        return Err(WriteError::EmptyPath);
    };

    let mut dir = root.to_path_buf();
    for segment in dirs {
        dir = enter_dir(root, &dir.join(segment), path)?;
    }

    let target = dir.join(file_name);
    let is_link = std::fs::symlink_metadata(&target).is_ok_and(|m| m.file_type().is_symlink());
    if is_link && !target.canonicalize().is_ok_and(|real| real.starts_with(root)) {
        return Err(WriteError::EscapesRoot(path.to_string()));
    }

    std::fs::write(&target, content).map_err(|source| WriteError::Write {
        path: target.clone(),
        source,
    })?;
    debug!("Wrote {} ({} bytes)", target.display(), content.len());
    Ok(target)
}

/// Create `dir` if missing and return its canonical form, which must lie
/// under `root`.
fn enter_dir(root: &Path, dir: &Path, entry: &str) -> Result<PathBuf, WriteError> {
    match std::fs::create_dir(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
        Err(source) => {
            return Err(WriteError::CreateDir {
                path: dir.to_path_buf(),
                source,
            });
        }
    }
    let canonical = dir.canonicalize().map_err(|source| WriteError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    if !canonical.starts_with(root) {
        return Err(WriteError::EscapesRoot(entry.to_string()));
    }
    Ok(canonical)
}

/// Lexically resolve `path` under `root`.
pub fn resolve_entry(root: &Path, path: &str) -> Result<PathBuf, WriteError> {
    let segments = entry_segments(path)?;
    Ok(segments.iter().fold(root.to_path_buf(), |acc, s| acc.join(s)))
}

/// Normalized, non-empty segments of `path`.
fn entry_segments(path: &str) -> Result<Vec<&str>, WriteError> {
    if path.trim().is_empty() {
        return Err(WriteError::EmptyPath);
    }
    if path.starts_with(['/', '\\']) {
        return Err(WriteError::EscapesRoot(path.to_string()));
    }

    let mut segments: Vec<&str> = Vec::new();
    for (i, segment) in path.split(['/', '\\']).enumerate() {
        if i == 0 && has_drive_prefix(segment) {
            return Err(WriteError::EscapesRoot(path.to_string()));
        }
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(WriteError::EscapesRoot(path.to_string()));
                }
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return Err(WriteError::EmptyPath);
    }
    Ok(segments)
}

/// `C:`, `c:foo` and the like.
fn has_drive_prefix(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    )
}

//! Model output → files on disk.
//!
//! ```text
//! raw text ─▶ strip fences ─▶ { … } span ─▶ strip block scalars ─▶ strict parse
//!                                                                  └─ on failure ─▶ repair passes ─▶ parse
//!          ─▶ FileTree ─▶ write_file_tree(root) ─▶ WriteReport
//! ```
//!
//! [`extract_file_tree`] is the pure parsing half. [`Materializer`] runs the
//! same pipeline but also saves the intermediate texts to an artifact
//! directory, which is what you want when a model keeps producing output
//! that does not parse.

pub mod clean;
pub mod repair;
pub mod write;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ParseError, SNIPPET_CHARS};

pub use repair::{REPAIR_PASSES, RepairPass, apply_repairs};
pub use write::{EntryOutcome, WriteReport, resolve_entry, write_file_tree};

/// Relative file path → file content, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTree(BTreeMap<String, String>);

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<String>) {
        self.0.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.0.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

}

impl FromIterator<(String, String)> for FileTree {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Artifact file holding the unmodified model text.
pub const RAW_ARTIFACT: &str = "raw_response.txt";
/// Artifact file holding the candidate span after cleaning.
pub const CLEANED_ARTIFACT: &str = "cleaned_response.txt";
/// Artifact file holding the candidate span after repairs.
pub const REPAIRED_ARTIFACT: &str = "repaired_response.txt";

/// Recover a [`FileTree`] from free-form model text.
pub fn extract_file_tree(raw: &str) -> Result<FileTree, ParseError> {
    extract(raw, |_, _| {})
}

/// Runs extraction, optionally keeping artifacts on disk.
#[derive(Debug, Clone, Default)]
pub struct Materializer {
    artifact_dir: Option<PathBuf>,
}

impl Materializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save intermediate texts under `dir`.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    pub fn artifact_dir(&self) -> Option<&Path> {
        self.artifact_dir.as_deref()
    }

    /// [`extract_file_tree`], saving artifacts along the way. Failing to
    /// save an artifact is logged and otherwise ignored.
    pub fn extract(&self, raw: &str) -> Result<FileTree, ParseError> {
        extract(raw, |name, text| self.save_artifact(name, text))
    }

    fn save_artifact(&self, name: &str, text: &str) {
        let Some(dir) = &self.artifact_dir else {
            return;
        };
        let path = dir.join(name);
        let result = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, text));
        match result {
            Ok(()) => debug!("Saved {} ({} bytes)", path.display(), text.len()),
            Err(e) => warn!("Failed to save artifact {}: {e}", path.display()),
        }
    }
}

fn extract(raw: &str, mut artifact: impl FnMut(&str, &str)) -> Result<FileTree, ParseError> {
    artifact(RAW_ARTIFACT, raw);

    let cleaned = clean::clean(raw).ok_or(ParseError::NoMapping)?;
    let span = cleaned.as_str();
    artifact(CLEANED_ARTIFACT, span);

    let value = match serde_json::from_str::<Value>(span) {
        Ok(value) => value,
        Err(strict) => {
            debug!("Strict parse failed ({strict}); applying repairs");
            let repaired = apply_repairs(span);
            artifact(REPAIRED_ARTIFACT, &repaired);
            serde_json::from_str::<Value>(&repaired).map_err(|e| ParseError::Malformed {
                reason: e.to_string(),
                snippet: repaired.chars().take(SNIPPET_CHARS).collect(),
            })?
        }
    };

    let tree = into_file_tree(value)?;
    debug!("Extracted {} file(s)", tree.len());
    Ok(tree)
}

fn into_file_tree(value: Value) -> Result<FileTree, ParseError> {
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(ParseError::UnexpectedStructure {
                found: json_kind(&other).to_string(),
            });
        }
    };
    map.into_iter()
        .map(|(path, content)| match content {
            Value::String(s) => Ok((path, s)),
            other => Err(ParseError::UnexpectedStructure {
                found: format!("{} value for '{path}'", json_kind(&other)),
            }),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

//! Error types for provider calls, response parsing, and file writes.

use std::path::PathBuf;

use thiserror::Error;

/// Maximum characters of offending text carried in diagnostics.
pub const SNIPPET_CHARS: usize = 500;

/// A model-provider call failed or returned unusable data.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP request could not be sent or the connection dropped.
    #[error("request failed: {0}")]
    Request(String),
    /// The provider answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// The response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
    /// The provider reported an error in-band (API error object, stream
    /// error marker).
    #[error("provider error: {0}")]
    Stream(String),
    /// The provider returned no content.
    #[error("empty response from provider")]
    Empty,
    /// The call did not finish within its deadline.
    #[error("provider call timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// No provider is available for the request (unknown model id,
    /// missing credentials).
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// No file tree could be recovered from a model response.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no structured mapping found")]
    NoMapping,
    /// Strict and repaired parsing both failed.
    #[error("malformed mapping: {reason}; text begins: {snippet}")]
    Malformed { reason: String, snippet: String },
    /// The text parsed, but not into a map of strings to strings.
    #[error("unexpected structure: {found}")]
    UnexpectedStructure { found: String },
}

/// A single file-tree entry could not be written.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("empty path")]
    EmptyPath,
    /// The path resolves outside the target root.
    #[error("path escapes the project root: {0}")]
    EscapesRoot(String),
    /// The root directory itself could not be created or resolved.
    #[error("failed to prepare root {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

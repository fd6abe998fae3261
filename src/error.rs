//! Error types for the scan2djvu library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ArchiveError`]: **Fatal**: the batch cannot continue (required tools
//!   missing, list file unreadable, network or auth failure, a conversion
//!   tool exiting non-zero). Returned as `Err(ArchiveError)` from the
//!   top-level `convert*` functions and stops the run at the current
//!   identifier.
//!
//! * [`ArticleError`]: **Non-fatal**: one article's metadata has no usable
//!   scan for some page. The identifier is written to the error log and the
//!   run moves on. Stored inside [`crate::output::SkippedArticle`].
//!
//! Only the cases listed in [`ArticleError`] are recoverable. Everything else
//! that goes wrong while fetching or parsing an article is an
//! [`ArchiveError`], so an unrelated bug can never be mistaken for a
//! malformed article.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the scan2djvu library.
#[derive(Debug, Error)]
pub enum ArchiveError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// One or more external conversion tools could not be found on PATH.
    #[error(
        "Required DjVu tools not found: {}\n\
Install DjVuLibre and make sure the tools are on PATH and executable.",
        .missing.join(", ")
    )]
    MissingTools { missing: Vec<String> },

    /// Identifier list was not found at the given path.
    #[error("Identifier list not found: '{path}'\nCheck the path passed to --list.")]
    ListNotFound { path: PathBuf },

    /// Identifier list exists but could not be read.
    #[error("Failed to read identifier list '{path}': {source}")]
    ListReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Metadata errors ───────────────────────────────────────────────────
    /// The metadata request could not be completed.
    #[error("Metadata request for '{identifier}' failed ({url}): {reason}")]
    MetadataRequestFailed {
        identifier: String,
        url: String,
        reason: String,
    },

    /// The repository rejected the configured credentials.
    #[error("Authentication rejected for '{identifier}' (HTTP {status})\nCheck --username / --password.")]
    AuthenticationFailed { identifier: String, status: u16 },

    /// The metadata response could not be understood.
    #[error("Unexpected metadata for '{identifier}': {detail}")]
    InvalidMetadata { identifier: String, detail: String },

    // ── Download errors ───────────────────────────────────────────────────
    /// A page image download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Reading or writing inside an article workspace or the output directory failed.
    #[error("I/O error at '{path}': {source}")]
    WorkspaceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Assembly errors ───────────────────────────────────────────────────
    /// The workspace holds no page images with the configured extension.
    #[error("No '*.{extension}' page images found in '{path}'")]
    EmptyWorkspace { path: PathBuf, extension: String },

    /// An external tool could not be started.
    #[error("Failed to launch '{tool}': {source}")]
    ToolLaunchFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool exited with a non-zero status.
    #[error("'{tool}' failed on '{page}' ({status}){}", format_stderr(.stderr))]
    ToolFailed {
        tool: String,
        page: PathBuf,
        status: String,
        stderr: String,
    },

    // ── Error log ─────────────────────────────────────────────────────────
    /// Could not append to the skipped-article log.
    #[error("Failed to write error log '{path}': {source}")]
    ErrorLogWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArchiveError {
    /// True when the error came from the assembly stage of one article.
    ///
    /// These are the only fatal errors that
    /// [`crate::config::ArchiveConfig::isolate_conversion_failures`] may
    /// downgrade to a per-article skip.
    pub fn is_conversion_failure(&self) -> bool {
        matches!(
            self,
            ArchiveError::ToolFailed { .. }
                | ArchiveError::ToolLaunchFailed { .. }
                | ArchiveError::EmptyWorkspace { .. }
        )
    }
}

fn format_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// A non-fatal error for a single article.
///
/// The article is skipped, its identifier is appended to the error log, and
/// the run continues with the next identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum ArticleError {
    /// A tracked record has no entry with the scan MIME type.
    #[error("record {record}: no scanned image available")]
    MissingScan { record: usize },

    /// The first scan entry of a record lacks a usable field.
    #[error("record {record}: scan entry has no usable '{field}'")]
    IncompleteScan { record: usize, field: String },

    /// The article has no tracked records at all.
    #[error("article has no pages")]
    NoPages,

    /// Conversion failed and failure isolation is enabled.
    #[error("conversion failed: {detail}")]
    ConversionFailed { detail: String },
}

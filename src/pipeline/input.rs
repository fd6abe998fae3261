//! Identifier loading: read the operator's list of article identifiers.
//!
//! The list is plain text, one identifier per line. Identifiers are opaque;
//! the loader trims surrounding whitespace and drops blank lines but performs
//! no other validation. Order and duplicates are preserved, so a duplicated
//! identifier is simply processed twice.

use crate::error::ArchiveError;
use std::path::Path;
use tracing::debug;

/// Load identifiers from `path`, one per line, in file order.
pub async fn load_identifiers(path: impl AsRef<Path>) -> Result<Vec<String>, ArchiveError> {
    let path = path.as_ref();

    let text = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ArchiveError::ListNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(ArchiveError::ListReadFailed {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    let identifiers = parse_identifiers(&text);
    debug!(
        "Read {} identifiers from {}",
        identifiers.len(),
        path.display()
    );
    Ok(identifiers)
}

/// Split list text into trimmed, non-empty identifiers.
pub fn parse_identifiers(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

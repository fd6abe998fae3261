//! Reference extraction: turn a list-endpoint response into page downloads.
//!
//! ## Response shape
//!
//! ```text
//! [
//!   { "entityType": "Resource",
//!     "properties": {
//!       "resource.originalFile": [
//!         { "value": { "mimeType": "image/tiff", "reference": "…",
//!                      "profile": "…", "originalFileName": "p001.tif" } },
//!         { "value": { "mimeType": "text/xml", … } }
//!       ] } },
//!   { "entityType": "Article", … },
//!   …
//! ]
//! ```
//!
//! Every record of the tracked entity kind is one page. Its file property
//! lists several variants of that page; the first variant with the scan MIME
//! type is the one downloaded. A page with no such variant makes the whole
//! article malformed, which is the one failure the driver recovers from.

use crate::config::ArchiveConfig;
use crate::error::ArticleError;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// One scanned page: where to fetch it and what to call it on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReference {
    /// Bare file name, never empty, no directory components.
    pub filename: String,
    /// Absolute download URL, never empty.
    pub url: String,
}

/// The subset of [`ArchiveConfig`] the extractor needs.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub entity_kind: String,
    pub file_property: String,
    pub mime_type: String,
    pub download_base: String,
}

impl From<&ArchiveConfig> for ExtractOptions {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            entity_kind: config.entity_kind.clone(),
            file_property: config.file_property.clone(),
            mime_type: config.mime_type.clone(),
            download_base: config.download_base.clone(),
        }
    }
}

/// Why extraction produced no page list.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The article lacks a usable scan. Recoverable.
    #[error(transparent)]
    Malformed(#[from] ArticleError),

    /// The response does not have the expected shape. Fatal.
    #[error("{0}")]
    Metadata(String),
}

#[derive(Debug, Deserialize)]
struct FileVariant {
    value: VariantValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariantValue {
    mime_type: String,
    #[serde(default)]
    reference: Option<String>,
    #[serde(default)]
    profile: Option<String>,
    #[serde(default)]
    original_file_name: Option<String>,
}

/// Build the image download URL for one variant.
pub fn download_url(download_base: &str, reference: &str, profile: &str, mime_type: &str) -> String {
    format!(
        "{}/binaryDownload/{}?profile={}&mimeType={}",
        download_base, reference, profile, mime_type
    )
}

/// Extract one [`PageReference`] per tracked record, in record order.
pub fn extract_page_references(
    body: &str,
    options: &ExtractOptions,
) -> Result<Vec<PageReference>, ExtractError> {
    let records: Vec<Value> = serde_json::from_str(body)
        .map_err(|e| ExtractError::Metadata(format!("expected a JSON array of records: {e}")))?;

    let mut pages = Vec::new();
    let tracked = records
        .iter()
        .enumerate()
        .filter_map(|(pos, record)| match record.get("entityType").and_then(Value::as_str) {
            Some(kind) => (kind == options.entity_kind).then_some(Ok(record)),
            None => Some(Err(ExtractError::Metadata(format!(
                "record {pos} has no entityType"
            )))),
        });

    for (index, record) in tracked.enumerate() {
        let record = record?;
        let variants = record_variants(record, index, &options.file_property)?;
        pages.push(select_scan(&variants, index, options)?);
    }

    debug!(
        "Extracted {} page references from {} records",
        pages.len(),
        records.len()
    );
    warn_on_duplicate_names(&pages);
    Ok(pages)
}

fn record_variants(
    record: &Value,
    index: usize,
    file_property: &str,
) -> Result<Vec<FileVariant>, ExtractError> {
    let raw = record
        .get("properties")
        .and_then(|props| props.get(file_property))
        .ok_or_else(|| {
            ExtractError::Metadata(format!("record {index} has no '{file_property}' property"))
        })?;

    Vec::<FileVariant>::deserialize(raw).map_err(|e| {
        ExtractError::Metadata(format!("record {index}: unreadable '{file_property}': {e}"))
    })
}

fn select_scan(
    variants: &[FileVariant],
    index: usize,
    options: &ExtractOptions,
) -> Result<PageReference, ExtractError> {
    let scan = variants
        .iter()
        .map(|v| &v.value)
        .find(|v| v.mime_type == options.mime_type)
        .ok_or(ArticleError::MissingScan { record: index })?;

    let field = |value: &Option<String>, name: &str| -> Result<String, ArticleError> {
        match value.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v.to_string()),
            _ => Err(ArticleError::IncompleteScan {
                record: index,
                field: name.to_string(),
            }),
        }
    };

    let reference = field(&scan.reference, "reference")?;
    let profile = field(&scan.profile, "profile")?;
    let filename = field(&scan.original_file_name, "originalFileName")?;
    if !is_bare_file_name(&filename) {
        return Err(ArticleError::IncompleteScan {
            record: index,
            field: "originalFileName".to_string(),
        }
        .into());
    }

    Ok(PageReference {
        url: download_url(&options.download_base, &reference, &profile, &scan.mime_type),
        filename,
    })
}

fn is_bare_file_name(name: &str) -> bool {
    let path = Path::new(name);
    path.file_name().and_then(|f| f.to_str()) == Some(name) && !name.contains('\\')
}

fn warn_on_duplicate_names(pages: &[PageReference]) {
    let mut names: Vec<&str> = pages.iter().map(|p| p.filename.as_str()).collect();
    names.sort_unstable();
    for pair in names.windows(2) {
        if pair[0] == pair[1] {
            warn!("Two pages share the file name '{}'; the later one wins", pair[0]);
        }
    }
}

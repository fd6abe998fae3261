//! # scan2djvu
//!
//! Fetch scanned article pages from a Dokumentlager repository and assemble
//! them into one DjVu document per article.
//!
//! The operator supplies a text file of article identifiers. For each one the
//! crate asks the repository's list API which page scans belong to the
//! article, downloads the TIFF master of every page into a directory named
//! after the identifier, and drives DjVuLibre's `cjb2` and `djvm` to bundle
//! the pages into `output/<identifier>.djvu`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ids.txt
//!  │
//!  ├─ 1. Input     one identifier per line, in order
//!  ├─ 2. Fetch     GET /api/list/{id}/0/500 with basic auth
//!  ├─ 3. Extract   first image/tiff variant of every Resource record
//!  ├─ 4. Download  GET /binaryDownload/{ref}?profile=…&mimeType=… → {id}/{file}
//!  └─ 5. Assemble  cjb2 -clean page → tmp;  djvm -c / -i output/{id}.djvu tmp
//! ```
//!
//! Everything runs sequentially. An article whose metadata has a page without
//! a TIFF scan is written to a timestamped error log and skipped; any other
//! failure stops the run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2djvu::{convert_list, ArchiveConfig, Credentials};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ArchiveConfig::builder()
//!         .credentials(Credentials::new("archivist", "secret"))
//!         .build()?;
//!     let summary = convert_list("ids.txt", &config).await?;
//!     eprintln!(
//!         "{} converted, {} skipped",
//!         summary.converted.len(),
//!         summary.skipped.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2djvu` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod error_log;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ArchiveConfig, ArchiveConfigBuilder, Credentials};
pub use convert::{convert_identifiers, convert_list, convert_list_sync, ArticleConverter};
pub use error::{ArchiveError, ArticleError};
pub use error_log::ErrorLog;
pub use output::{ArticleOutcome, ConvertedArticle, RunSummary, SkippedArticle};
pub use pipeline::assemble::{check_toolchain, Toolchain};
pub use pipeline::extract::PageReference;
pub use progress::{ArchiveProgressCallback, NoopProgressCallback, ProgressCallback};

//! Batch entry points: the driver that walks the identifier list.
//!
//! Each identifier goes through fetch → extract → download → assemble before
//! the next one starts. Two outcomes are possible per article:
//!
//! * **Converted**: the output document was written.
//! * **Skipped**: the article is malformed (see [`ArticleError`]); its
//!   identifier is appended to the error log and the run continues.
//!
//! Any [`ArchiveError`] ends the run immediately. Articles after the failing
//! one are not touched; a rerun starts again from the top and overwrites
//! what is already on disk.

use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, ArticleError};
use crate::error_log::ErrorLog;
use crate::output::{ArticleOutcome, ConvertedArticle, RunSummary, SkippedArticle};
use crate::pipeline::assemble::{check_toolchain, DocumentAssembler, Toolchain};
use crate::pipeline::download::ImageDownloader;
use crate::pipeline::extract::{extract_page_references, ExtractError, ExtractOptions};
use crate::pipeline::fetch::MetadataFetcher;
use crate::pipeline::input;
use crate::progress::ArchiveProgressCallback;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every identifier listed in `list_path`.
///
/// Checks for the external tools first, then loads the list and runs
/// [`convert_identifiers`].
///
/// # Errors
/// Returns `Err(ArchiveError)` for fatal errors only:
/// - encoder or merger missing from PATH
/// - list file missing or unreadable
/// - network, authentication or filesystem failure
/// - an external tool exiting non-zero (unless failure isolation is enabled)
pub async fn convert_list(
    list_path: impl AsRef<Path>,
    config: &ArchiveConfig,
) -> Result<RunSummary, ArchiveError> {
    let toolchain = check_toolchain(config)?;
    let identifiers = input::load_identifiers(list_path).await?;
    info!("Loaded {} identifiers", identifiers.len());
    run(&identifiers, config, toolchain).await
}

/// Convert the given identifiers in order.
pub async fn convert_identifiers(
    identifiers: &[String],
    config: &ArchiveConfig,
) -> Result<RunSummary, ArchiveError> {
    let toolchain = check_toolchain(config)?;
    run(identifiers, config, toolchain).await
}

/// Synchronous wrapper around [`convert_list`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_list_sync(
    list_path: impl AsRef<Path>,
    config: &ArchiveConfig,
) -> Result<RunSummary, ArchiveError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ArchiveError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert_list(list_path, config))
}

async fn run(
    identifiers: &[String],
    config: &ArchiveConfig,
    toolchain: Toolchain,
) -> Result<RunSummary, ArchiveError> {
    let start = Instant::now();
    let mut converter = ArticleConverter::new(config, toolchain)?;
    let progress = config.progress_callback.as_deref();

    if let Some(cb) = progress {
        cb.on_run_start(identifiers.len());
    }

    let mut summary = RunSummary::default();
    for (i, identifier) in identifiers.iter().enumerate() {
        if let Some(cb) = progress {
            cb.on_article_start(identifier, i + 1, identifiers.len());
        }
        let outcome = converter.convert_article(identifier).await?;
        debug!("Finished {}", outcome.identifier());
        summary.record(outcome);
    }

    let error_log = converter.error_log();
    if error_log.entries_written() > 0 {
        summary.error_log = Some(error_log.path().to_path_buf());
    }
    summary.total_duration_ms = start.elapsed().as_millis() as u64;

    info!(
        "Run complete: {} converted, {} skipped, {}ms",
        summary.converted.len(),
        summary.skipped.len(),
        summary.total_duration_ms
    );
    if let Some(cb) = progress {
        cb.on_run_complete(&summary);
    }
    Ok(summary)
}

/// Holds the per-run clients and the error log; converts one article at a time.
pub struct ArticleConverter<'a> {
    config: &'a ArchiveConfig,
    fetcher: MetadataFetcher,
    extract: ExtractOptions,
    downloader: ImageDownloader,
    assembler: DocumentAssembler,
    error_log: ErrorLog,
}

impl<'a> ArticleConverter<'a> {
    /// Build the clients for one run. The error log is named after the current time.
    pub fn new(config: &'a ArchiveConfig, toolchain: Toolchain) -> Result<Self, ArchiveError> {
        Ok(Self {
            config,
            fetcher: MetadataFetcher::new(config)?,
            extract: ExtractOptions::from(config),
            downloader: ImageDownloader::new(config)?,
            assembler: DocumentAssembler::new(config, toolchain),
            error_log: ErrorLog::for_run(&config.log_dir),
        })
    }

    /// The skipped-article log this converter appends to.
    pub fn error_log(&self) -> &ErrorLog {
        &self.error_log
    }

    fn progress(&self) -> Option<&'a dyn ArchiveProgressCallback> {
        self.config.progress_callback.as_deref()
    }

    /// Fetch, extract, download and assemble one article.
    pub async fn convert_article(&mut self, identifier: &str) -> Result<ArticleOutcome, ArchiveError> {
        info!("Processing {}", identifier);

        let body = self.fetcher.fetch(identifier).await?;
        let pages = match extract_page_references(&body, &self.extract) {
            Ok(pages) if pages.is_empty() => {
                return self.skip(identifier, ArticleError::NoPages).await;
            }
            Ok(pages) => pages,
            Err(ExtractError::Malformed(e)) => return self.skip(identifier, e).await,
            Err(ExtractError::Metadata(detail)) => {
                return Err(ArchiveError::InvalidMetadata {
                    identifier: identifier.to_string(),
                    detail,
                });
            }
        };

        self.downloader
            .download(identifier, &pages, self.progress())
            .await?;

        let workspace = self.downloader.workspace_dir(identifier);
        match self
            .assembler
            .assemble(identifier, &workspace, self.progress())
            .await
        {
            Ok((document, page_count)) => {
                info!("{}: wrote {}", identifier, document.display());
                if let Some(cb) = self.progress() {
                    cb.on_article_complete(identifier, &document);
                }
                Ok(ArticleOutcome::Converted(ConvertedArticle {
                    identifier: identifier.to_string(),
                    document,
                    pages: page_count,
                }))
            }
            Err(e) if self.config.isolate_conversion_failures && e.is_conversion_failure() => {
                let detail = e.to_string();
                self.skip(identifier, ArticleError::ConversionFailed { detail })
                    .await
            }
            Err(e) => Err(e),
        }
    }

    async fn skip(
        &mut self,
        identifier: &str,
        error: ArticleError,
    ) -> Result<ArticleOutcome, ArchiveError> {
        warn!("Skipping {}: {}", identifier, error);
        self.error_log.record(identifier).await?;
        if let Some(cb) = self.progress() {
            cb.on_article_skipped(identifier, &error);
        }
        Ok(ArticleOutcome::Skipped(SkippedArticle {
            identifier: identifier.to_string(),
            error,
        }))
    }
}

//! Progress-callback trait for per-article and per-page run events.
//!
//! Inject an [`Arc<dyn ArchiveProgressCallback>`] via
//! [`crate::config::ArchiveConfigBuilder::progress_callback`] to receive
//! events as the run works through the identifier list. The library itself
//! only emits `tracing` records; everything the operator sees on the terminal
//! is rendered by a callback implementation (the CLI uses `indicatif`).
//!
//! # Example
//!
//! ```rust
//! use scan2djvu::{ArchiveConfig, ArchiveProgressCallback, Credentials};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl ArchiveProgressCallback for PageCounter {
//!     fn on_page_downloaded(&self, _id: &str, filename: &str, n: usize, total: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{filename} ({n}/{total})");
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//!
//! let config = ArchiveConfig::builder()
//!     .credentials(Credentials::new("archivist", "secret"))
//!     .progress_callback(counter as Arc<dyn ArchiveProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::ArticleError;
use crate::output::RunSummary;
use std::path::Path;
use std::sync::Arc;

/// Called by the driver as it processes each identifier.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events arrive strictly in order; the run is
/// sequential.
pub trait ArchiveProgressCallback: Send + Sync {
    /// Called once after the identifier list is loaded.
    fn on_run_start(&self, total_articles: usize) {
        let _ = total_articles;
    }

    /// Called before the metadata request for an article.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the identifier list
    fn on_article_start(&self, identifier: &str, index: usize, total_articles: usize) {
        let _ = (identifier, index, total_articles);
    }

    /// Called after page references were extracted, before the first download.
    fn on_download_start(&self, identifier: &str, total_pages: usize) {
        let _ = (identifier, total_pages);
    }

    /// Called after each page image is written to the workspace.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed download position
    fn on_page_downloaded(&self, identifier: &str, filename: &str, page_num: usize, total_pages: usize) {
        let _ = (identifier, filename, page_num, total_pages);
    }

    /// Called before the first page is encoded.
    fn on_assembly_start(&self, identifier: &str, total_pages: usize) {
        let _ = (identifier, total_pages);
    }

    /// Called after each page is merged into the output document.
    fn on_page_assembled(&self, identifier: &str, page_num: usize, total_pages: usize) {
        let _ = (identifier, page_num, total_pages);
    }

    /// Called when an article's output document is complete.
    fn on_article_complete(&self, identifier: &str, document: &Path) {
        let _ = (identifier, document);
    }

    /// Called when an article is skipped and written to the error log.
    fn on_article_skipped(&self, identifier: &str, error: &ArticleError) {
        let _ = (identifier, error);
    }

    /// Called once after every identifier has been handled.
    fn on_run_complete(&self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ArchiveProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ArchiveConfig`].
pub type ProgressCallback = Arc<dyn ArchiveProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        downloaded: AtomicUsize,
        assembled: AtomicUsize,
        skipped: AtomicUsize,
    }

    impl ArchiveProgressCallback for TrackingCallback {
        fn on_page_downloaded(&self, _id: &str, _filename: &str, _n: usize, _total: usize) {
            self.downloaded.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_assembled(&self, _id: &str, _n: usize, _total: usize) {
            self.assembled.fetch_add(1, Ordering::SeqCst);
        }

        fn on_article_skipped(&self, _id: &str, _error: &ArticleError) {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_article_start("a1", 1, 2);
        cb.on_download_start("a1", 3);
        cb.on_page_downloaded("a1", "p1.tif", 1, 3);
        cb.on_assembly_start("a1", 3);
        cb.on_page_assembled("a1", 1, 3);
        cb.on_article_complete("a1", Path::new("output/a1.djvu"));
        cb.on_article_skipped("a2", &ArticleError::NoPages);
        cb.on_run_complete(&RunSummary::default());
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        for n in 1..=3 {
            tracker.on_page_downloaded("a1", "p.tif", n, 3);
            tracker.on_page_assembled("a1", n, 3);
        }
        tracker.on_article_skipped("a2", &ArticleError::MissingScan { record: 0 });

        assert_eq!(tracker.downloaded.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.assembled.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.skipped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn ArchiveProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_article_start("a1", 1, 10);
    }
}

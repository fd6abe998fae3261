//! Image download: fetch every page of one article into its workspace.
//!
//! Downloads are plain unauthenticated GETs, issued one after another in
//! reference order. Each body is written whole to `<workspace>/<filename>`,
//! replacing any file left by an earlier run. There is no retry and no
//! content check; a failed request stops the run.

use crate::config::ArchiveConfig;
use crate::error::ArchiveError;
use crate::pipeline::extract::PageReference;
use crate::progress::ArchiveProgressCallback;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Unauthenticated client writing page images into article workspaces.
pub struct ImageDownloader {
    client: reqwest::Client,
    work_root: PathBuf,
    renumber_pages: bool,
}

impl ImageDownloader {
    pub fn new(config: &ArchiveConfig) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scan2djvu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArchiveError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            work_root: config.work_root.clone(),
            renumber_pages: config.renumber_pages,
        })
    }

    /// Directory holding the page images of `identifier`.
    pub fn workspace_dir(&self, identifier: &str) -> PathBuf {
        self.work_root.join(identifier)
    }

    /// Name a page is stored under.
    ///
    /// With renumbering enabled the 1-based position is prefixed, so sorting
    /// the workspace by name reproduces the reference order.
    pub fn stored_name(&self, page: &PageReference, page_num: usize) -> String {
        if self.renumber_pages {
            format!("{:04}_{}", page_num, page.filename)
        } else {
            page.filename.clone()
        }
    }

    /// Download `pages` for `identifier`, returning the written paths in order.
    pub async fn download(
        &self,
        identifier: &str,
        pages: &[PageReference],
        progress: Option<&dyn ArchiveProgressCallback>,
    ) -> Result<Vec<PathBuf>, ArchiveError> {
        let workspace = self.workspace_dir(identifier);
        tokio::fs::create_dir_all(&workspace)
            .await
            .map_err(|e| ArchiveError::WorkspaceIo {
                path: workspace.clone(),
                source: e,
            })?;

        info!("Downloading {} pages of {}", pages.len(), identifier);
        if let Some(cb) = progress {
            cb.on_download_start(identifier, pages.len());
        }

        let total = pages.len();
        let mut written = Vec::with_capacity(total);
        for (i, page) in pages.iter().enumerate() {
            let page_num = i + 1;
            let path = workspace.join(self.stored_name(page, page_num));
            self.fetch_to(&page.url, &path).await?;

            if let Some(cb) = progress {
                cb.on_page_downloaded(identifier, &page.filename, page_num, total);
            }
            written.push(path);
        }

        Ok(written)
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<(), ArchiveError> {
        debug!("GET {} -> {}", url, path.display());
        let failed = |reason: String| ArchiveError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| ArchiveError::WorkspaceIo {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

//! Configuration types for a batch conversion run.
//!
//! All run behaviour is controlled through [`ArchiveConfig`], built via its
//! [`ArchiveConfigBuilder`]. Every stage of the pipeline receives the config
//! explicitly; nothing is read from process-wide state. In particular the
//! repository credentials travel inside the config and are handed to the
//! metadata fetcher when it is constructed.

use crate::error::ArchiveError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default repository API host (metadata requests).
pub const DEFAULT_API_BASE: &str = "https://dokumentlager.nordiskamuseet.se";

/// Default repository download host (page images).
pub const DEFAULT_DOWNLOAD_BASE: &str = "http://dokumentlager.nordiskamuseet.se";

/// HTTP basic-auth credentials for the metadata endpoint.
///
/// `Debug` never prints the password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configuration for one batch run.
///
/// Built via [`ArchiveConfig::builder()`].
///
/// # Example
/// ```rust
/// use scan2djvu::{ArchiveConfig, Credentials};
///
/// let config = ArchiveConfig::builder()
///     .credentials(Credentials::new("archivist", "secret"))
///     .output_dir("djvu")
///     .build()
///     .unwrap();
/// assert_eq!(config.document_extension, "djvu");
/// ```
#[derive(Clone)]
pub struct ArchiveConfig {
    /// Basic-auth credentials sent with every metadata request.
    pub credentials: Credentials,

    /// Scheme and host of the metadata API. Default: [`DEFAULT_API_BASE`].
    pub api_base: String,

    /// Scheme and host used for page image downloads. Default: [`DEFAULT_DOWNLOAD_BASE`].
    ///
    /// Image downloads are unauthenticated.
    pub download_base: String,

    /// First entry requested from the list endpoint. Default: 0.
    pub list_offset: u32,

    /// Maximum entries requested from the list endpoint. Default: 500.
    pub list_limit: u32,

    /// `entityType` of the records that carry page scans. Default: `Resource`.
    pub entity_kind: String,

    /// Record property holding the file variants. Default: `resource.originalFile`.
    pub file_property: String,

    /// MIME type of the variant to download. Default: `image/tiff`.
    pub mime_type: String,

    /// Directory under which one workspace per identifier is created. Default: `.`.
    pub work_root: PathBuf,

    /// Directory receiving the assembled documents. Default: `output`.
    pub output_dir: PathBuf,

    /// Directory receiving the timestamped skipped-article log. Default: `.`.
    pub log_dir: PathBuf,

    /// File extension (without dot) of page images picked up for assembly. Default: `tif`.
    pub page_extension: String,

    /// File extension (without dot) of assembled documents. Default: `djvu`.
    pub document_extension: String,

    /// Single-page encoder executable. Default: `cjb2`.
    pub encoder: String,

    /// Multi-page bundler executable. Default: `djvm`.
    pub merger: String,

    /// Skip an article instead of aborting the run when assembly fails. Default: false.
    ///
    /// With the default, any non-zero exit from the encoder or merger stops
    /// the whole batch. When enabled, the identifier is written to the error
    /// log and the run continues with the next identifier.
    pub isolate_conversion_failures: bool,

    /// Prefix downloaded file names with their 1-based position. Default: false.
    ///
    /// Assembly orders pages by file name. Upstream names normally embed the
    /// page number; enable this when they do not, so that on-disk order is the
    /// order the repository listed the pages in.
    pub renumber_pages: bool,

    /// Optional progress callback for per-article and per-page events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            download_base: DEFAULT_DOWNLOAD_BASE.to_string(),
            list_offset: 0,
            list_limit: 500,
            entity_kind: "Resource".to_string(),
            file_property: "resource.originalFile".to_string(),
            mime_type: "image/tiff".to_string(),
            work_root: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            log_dir: PathBuf::from("."),
            page_extension: "tif".to_string(),
            document_extension: "djvu".to_string(),
            encoder: "cjb2".to_string(),
            merger: "djvm".to_string(),
            isolate_conversion_failures: false,
            renumber_pages: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveConfig")
            .field("credentials", &self.credentials)
            .field("api_base", &self.api_base)
            .field("download_base", &self.download_base)
            .field("list_offset", &self.list_offset)
            .field("list_limit", &self.list_limit)
            .field("entity_kind", &self.entity_kind)
            .field("file_property", &self.file_property)
            .field("mime_type", &self.mime_type)
            .field("work_root", &self.work_root)
            .field("output_dir", &self.output_dir)
            .field("log_dir", &self.log_dir)
            .field("page_extension", &self.page_extension)
            .field("document_extension", &self.document_extension)
            .field("encoder", &self.encoder)
            .field("merger", &self.merger)
            .field("isolate_conversion_failures", &self.isolate_conversion_failures)
            .field("renumber_pages", &self.renumber_pages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ArchiveProgressCallback>"),
            )
            .finish()
    }
}

impl ArchiveConfig {
    /// Create a new builder for `ArchiveConfig`.
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ArchiveConfig`].
#[derive(Debug)]
pub struct ArchiveConfigBuilder {
    config: ArchiveConfig,
}

impl ArchiveConfigBuilder {
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.credentials = credentials;
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = trim_base(base.into());
        self
    }

    pub fn download_base(mut self, base: impl Into<String>) -> Self {
        self.config.download_base = trim_base(base.into());
        self
    }

    pub fn list_window(mut self, offset: u32, limit: u32) -> Self {
        self.config.list_offset = offset;
        self.config.list_limit = limit;
        self
    }

    pub fn entity_kind(mut self, kind: impl Into<String>) -> Self {
        self.config.entity_kind = kind.into();
        self
    }

    pub fn file_property(mut self, property: impl Into<String>) -> Self {
        self.config.file_property = property.into();
        self
    }

    pub fn mime_type(mut self, mime: impl Into<String>) -> Self {
        self.config.mime_type = mime.into();
        self
    }

    pub fn work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_root = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.log_dir = dir.into();
        self
    }

    pub fn page_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.page_extension = trim_extension(ext.into());
        self
    }

    pub fn document_extension(mut self, ext: impl Into<String>) -> Self {
        self.config.document_extension = trim_extension(ext.into());
        self
    }

    pub fn encoder(mut self, program: impl Into<String>) -> Self {
        self.config.encoder = program.into();
        self
    }

    pub fn merger(mut self, program: impl Into<String>) -> Self {
        self.config.merger = program.into();
        self
    }

    pub fn isolate_conversion_failures(mut self, v: bool) -> Self {
        self.config.isolate_conversion_failures = v;
        self
    }

    pub fn renumber_pages(mut self, v: bool) -> Self {
        self.config.renumber_pages = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ArchiveConfig, ArchiveError> {
        let c = &self.config;
        if c.credentials.username.is_empty() {
            return Err(ArchiveError::InvalidConfig(
                "A repository username is required".into(),
            ));
        }
        for (name, base) in [("API base", &c.api_base), ("download base", &c.download_base)] {
            reqwest::Url::parse(base).map_err(|e| {
                ArchiveError::InvalidConfig(format!("{name} '{base}' is not a valid URL: {e}"))
            })?;
        }
        if c.list_limit == 0 {
            return Err(ArchiveError::InvalidConfig(
                "List limit must be ≥ 1".into(),
            ));
        }
        if c.page_extension.is_empty() || c.document_extension.is_empty() {
            return Err(ArchiveError::InvalidConfig(
                "Page and document extensions must not be empty".into(),
            ));
        }
        if c.encoder.is_empty() || c.merger.is_empty() {
            return Err(ArchiveError::InvalidConfig(
                "Encoder and merger programs must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}

fn trim_extension(ext: String) -> String {
    ext.trim_start_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("archivist", "hunter2")
    }

    #[test]
    fn defaults_match_dokumentlager() {
        let c = ArchiveConfig::builder().credentials(creds()).build().unwrap();
        assert_eq!(c.api_base, "https://dokumentlager.nordiskamuseet.se");
        assert_eq!(c.list_offset, 0);
        assert_eq!(c.list_limit, 500);
        assert_eq!(c.mime_type, "image/tiff");
        assert_eq!(c.encoder, "cjb2");
        assert_eq!(c.merger, "djvm");
        assert!(!c.isolate_conversion_failures);
    }

    #[test]
    fn missing_username_is_rejected() {
        let err = ArchiveConfig::builder().build().unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidConfig(_)));
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let err = ArchiveConfig::builder()
            .credentials(creds())
            .api_base("not a url")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("API base"), "got: {err}");
    }

    #[test]
    fn zero_list_limit_is_rejected() {
        let err = ArchiveConfig::builder()
            .credentials(creds())
            .list_window(0, 0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidConfig(_)));
    }

    #[test]
    fn bases_and_extensions_are_normalised() {
        let c = ArchiveConfig::builder()
            .credentials(creds())
            .api_base("http://127.0.0.1:1234/")
            .page_extension(".tiff")
            .build()
            .unwrap();
        assert_eq!(c.api_base, "http://127.0.0.1:1234");
        assert_eq!(c.page_extension, "tiff");
    }

    #[test]
    fn debug_redacts_password() {
        let c = ArchiveConfig::builder().credentials(creds()).build().unwrap();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("archivist"));
        assert!(!dbg.contains("hunter2"));
    }
}

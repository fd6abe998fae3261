//! Document assembly: merge an article's page images into one DjVu file.
//!
//! ## Tool contract
//!
//! ```text
//! for each page (sorted by file name, 1-based i):
//!     <encoder> -clean <page> <intermediate>
//!     i == 1:  <merger> -c <partial> <intermediate>
//!     i  > 1:  <merger> -i <partial> <intermediate>
//! remove <intermediate>
//! rename <partial> -> <document>
//! ```
//!
//! Page order is file-name order. Upstream file names embed the page number,
//! so a lexicographic sort is reading order; when they do not, enable
//! [`crate::config::ArchiveConfig::renumber_pages`] so the downloader assigns
//! the sequence itself.
//!
//! The intermediate single-page file is one [`tempfile::NamedTempFile`]
//! inside the output directory, reused for every page and removed once the
//! last page is merged. The document itself is built in a second temporary
//! file next to its final path and only renamed into place once every page
//! has been merged, so a failing tool never leaves a truncated document
//! behind. If a tool fails midway both handles are dropped and the files go
//! with them.

use crate::config::ArchiveConfig;
use crate::error::ArchiveError;
use crate::progress::ArchiveProgressCallback;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info};

/// Resolved paths of the two external executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub encoder: PathBuf,
    pub merger: PathBuf,
}

/// Locate the encoder and merger on PATH.
///
/// Run once before any work starts; a missing tool is fatal.
pub fn check_toolchain(config: &ArchiveConfig) -> Result<Toolchain, ArchiveError> {
    let encoder = which::which(&config.encoder);
    let merger = which::which(&config.merger);

    match (encoder, merger) {
        (Ok(encoder), Ok(merger)) => {
            debug!(
                "Using encoder {} and merger {}",
                encoder.display(),
                merger.display()
            );
            Ok(Toolchain { encoder, merger })
        }
        (encoder, merger) => {
            let mut missing = Vec::new();
            if encoder.is_err() {
                missing.push(config.encoder.clone());
            }
            if merger.is_err() {
                missing.push(config.merger.clone());
            }
            Err(ArchiveError::MissingTools { missing })
        }
    }
}

/// Runs the external tools for one article at a time.
pub struct DocumentAssembler {
    toolchain: Toolchain,
    output_dir: PathBuf,
    page_extension: String,
    document_extension: String,
}

impl DocumentAssembler {
    pub fn new(config: &ArchiveConfig, toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            output_dir: config.output_dir.clone(),
            page_extension: config.page_extension.clone(),
            document_extension: config.document_extension.clone(),
        }
    }

    /// Output document path for `identifier`.
    pub fn document_path(&self, identifier: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", identifier, self.document_extension))
    }

    /// Page images in `workspace`, sorted by file name.
    pub async fn list_pages(&self, workspace: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
        let io_err = |e: std::io::Error| ArchiveError::WorkspaceIo {
            path: workspace.to_path_buf(),
            source: e,
        };

        let suffix = format!(".{}", self.page_extension);
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(workspace).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let name = entry.file_name();
            let is_page = name.to_str().is_some_and(|n| n.ends_with(&suffix));
            if is_page && entry.file_type().await.map_err(io_err)?.is_file() {
                names.push(name);
            }
        }

        names.sort();
        Ok(names.into_iter().map(|n| workspace.join(n)).collect())
    }

    /// Merge every page in `workspace` into the document for `identifier`.
    ///
    /// Returns the document path and the number of pages merged.
    pub async fn assemble(
        &self,
        identifier: &str,
        workspace: &Path,
        progress: Option<&dyn ArchiveProgressCallback>,
    ) -> Result<(PathBuf, usize), ArchiveError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ArchiveError::WorkspaceIo {
                path: self.output_dir.clone(),
                source: e,
            })?;

        let pages = self.list_pages(workspace).await?;
        if pages.is_empty() {
            return Err(ArchiveError::EmptyWorkspace {
                path: workspace.to_path_buf(),
                extension: self.page_extension.clone(),
            });
        }

        let document = self.document_path(identifier);
        let total = pages.len();
        info!("Assembling {} pages into {}", total, document.display());
        if let Some(cb) = progress {
            cb.on_assembly_start(identifier, total);
        }

        let intermediate = self.scratch_file(".page-")?;
        let partial = self.scratch_file(".part-")?;

        for (i, page) in pages.iter().enumerate() {
            let page_num = i + 1;
            self.run_tool(
                &self.toolchain.encoder,
                [OsStr::new("-clean"), page.as_os_str(), intermediate.path().as_os_str()],
                page,
            )
            .await?;

            let mode = if page_num == 1 { "-c" } else { "-i" };
            self.run_tool(
                &self.toolchain.merger,
                [OsStr::new(mode), partial.path().as_os_str(), intermediate.path().as_os_str()],
                page,
            )
            .await?;

            if let Some(cb) = progress {
                cb.on_page_assembled(identifier, page_num, total);
            }
        }

        let intermediate_path = intermediate.path().to_path_buf();
        intermediate
            .close()
            .map_err(|e| ArchiveError::WorkspaceIo {
                path: intermediate_path,
                source: e,
            })?;

        partial
            .persist(&document)
            .map_err(|e| ArchiveError::WorkspaceIo {
                path: document.clone(),
                source: e.error,
            })?;

        Ok((document, total))
    }

    /// Empty hidden file in the output directory, removed on drop.
    fn scratch_file(&self, prefix: &str) -> Result<NamedTempFile, ArchiveError> {
        tempfile::Builder::new()
            .prefix(prefix)
            .suffix(&format!(".{}", self.document_extension))
            .tempfile_in(&self.output_dir)
            .map_err(|e| ArchiveError::WorkspaceIo {
                path: self.output_dir.clone(),
                source: e,
            })
    }

    async fn run_tool<const N: usize>(
        &self,
        program: &Path,
        args: [&OsStr; N],
        page: &Path,
    ) -> Result<(), ArchiveError> {
        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| program.display().to_string());
        debug!("{} {:?}", tool, args);

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| ArchiveError::ToolLaunchFailed {
                tool: tool.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ArchiveError::ToolFailed {
                tool,
                page: page.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("{}: {}", tool, stderr.trim());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use std::os::unix::fs::PermissionsExt;

    /// Write an executable shell script that appends its arguments to `calls.log`.
    fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let log = dir.join("calls.log");
        let script = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{}'\n{body}\n",
            log.display()
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    struct Fixture {
        root: tempfile::TempDir,
        assembler: DocumentAssembler,
    }

    fn fixture(encoder_body: &str) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let bin = root.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let encoder = fake_tool(&bin, "cjb2", encoder_body);
        let merger = fake_tool(
            &bin,
            "djvm",
            "if [ \"$1\" = \"-c\" ]; then cat \"$3\" > \"$2\"; else cat \"$3\" >> \"$2\"; fi",
        );

        let config = ArchiveConfig::builder()
            .credentials(Credentials::new("user", "secret"))
            .output_dir(root.path().join("output"))
            .build()
            .unwrap();
        let assembler = DocumentAssembler::new(&config, Toolchain { encoder, merger });
        Fixture { root, assembler }
    }

    fn calls(root: &Path) -> Vec<String> {
        std::fs::read_to_string(root.join("bin/calls.log"))
            .unwrap_or_default()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[tokio::test]
    async fn creates_once_then_inserts_in_sorted_order() {
        let fx = fixture("cp \"$2\" \"$3\"");
        let ws = fx.root.path().join("a1");
        std::fs::create_dir_all(&ws).unwrap();
        // Written out of order on purpose; notes.xml must be ignored.
        for (name, body) in [("p003.tif", "C"), ("p001.tif", "A"), ("p002.tif", "B"), ("notes.xml", "x")] {
            std::fs::write(ws.join(name), body).unwrap();
        }

        let (document, pages) = fx.assembler.assemble("a1", &ws, None).await.unwrap();

        assert_eq!(pages, 3);
        assert_eq!(document, fx.root.path().join("output/a1.djvu"));
        assert_eq!(std::fs::read_to_string(&document).unwrap(), "ABC");

        let calls = calls(fx.root.path());
        let merges: Vec<&String> = calls.iter().filter(|c| c.starts_with("djvm")).collect();
        assert_eq!(merges.len(), 3);
        assert!(merges[0].starts_with("djvm -c"));
        assert!(merges[1].starts_with("djvm -i"));
        assert!(merges[2].starts_with("djvm -i"));

        let encodes: Vec<&String> = calls.iter().filter(|c| c.starts_with("cjb2")).collect();
        assert!(encodes[0].contains("-clean") && encodes[0].contains("p001.tif"));
        assert!(encodes[2].contains("p003.tif"));
    }

    #[tokio::test]
    async fn intermediate_file_is_removed() {
        let fx = fixture("cp \"$2\" \"$3\"");
        let ws = fx.root.path().join("a1");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::write(ws.join("p001.tif"), "A").unwrap();

        fx.assembler.assemble("a1", &ws, None).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(fx.root.path().join("output"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("a1.djvu")]);
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let fx = fixture("echo 'corrupt tiff' >&2; exit 3");
        let ws = fx.root.path().join("a1");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::write(ws.join("p001.tif"), "A").unwrap();

        let err = fx.assembler.assemble("a1", &ws, None).await.unwrap_err();
        match err {
            ArchiveError::ToolFailed { tool, stderr, .. } => {
                assert_eq!(tool, "cjb2");
                assert!(stderr.contains("corrupt tiff"));
            }
            other => panic!("expected ToolFailed, got {other:?}"),
        }
        assert!(!fx.root.path().join("output/a1.djvu").exists());
    }

    #[tokio::test]
    async fn failure_after_first_page_leaves_no_document() {
        let fx = fixture(
            "case \"$(basename \"$2\")\" in bad*) exit 1;; esac\ncp \"$2\" \"$3\"",
        );
        let ws = fx.root.path().join("a1");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::write(ws.join("a001.tif"), "A").unwrap();
        std::fs::write(ws.join("bad002.tif"), "B").unwrap();

        let err = fx.assembler.assemble("a1", &ws, None).await.unwrap_err();
        assert!(matches!(err, ArchiveError::ToolFailed { .. }));

        let merges = calls(fx.root.path())
            .into_iter()
            .filter(|c| c.starts_with("djvm -c"))
            .count();
        assert_eq!(merges, 1);
        let leftovers: Vec<_> = std::fs::read_dir(fx.root.path().join("output"))
            .unwrap()
            .collect();
        assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    }

    #[tokio::test]
    async fn unlaunchable_tool_is_reported() {
        let mut fx = fixture("cp \"$2\" \"$3\"");
        fx.assembler.toolchain.encoder = fx.root.path().join("bin/no-such-cjb2");
        let ws = fx.root.path().join("a1");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::write(ws.join("p001.tif"), "A").unwrap();

        let err = fx.assembler.assemble("a1", &ws, None).await.unwrap_err();
        assert!(err.is_conversion_failure());
        match err {
            ArchiveError::ToolLaunchFailed { tool, .. } => assert_eq!(tool, "no-such-cjb2"),
            other => panic!("expected ToolLaunchFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_workspace_is_an_error() {
        let fx = fixture("cp \"$2\" \"$3\"");
        let ws = fx.root.path().join("a1");
        std::fs::create_dir_all(&ws).unwrap();
        std::fs::write(ws.join("p001.tiff"), "A").unwrap();

        let err = fx.assembler.assemble("a1", &ws, None).await.unwrap_err();
        assert!(matches!(err, ArchiveError::EmptyWorkspace { .. }));
    }

    #[test]
    fn missing_tools_are_all_named() {
        let config = ArchiveConfig::builder()
            .credentials(Credentials::new("user", "secret"))
            .encoder("scan2djvu-no-such-encoder")
            .merger("scan2djvu-no-such-merger")
            .build()
            .unwrap();
        match check_toolchain(&config) {
            Err(ArchiveError::MissingTools { missing }) => {
                assert_eq!(
                    missing,
                    vec!["scan2djvu-no-such-encoder", "scan2djvu-no-such-merger"]
                );
            }
            other => panic!("expected MissingTools, got {other:?}"),
        }
    }

    #[test]
    fn explicit_tool_paths_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = fake_tool(dir.path(), "cjb2", "true");
        let merger = fake_tool(dir.path(), "djvm", "true");
        let config = ArchiveConfig::builder()
            .credentials(Credentials::new("user", "secret"))
            .encoder(encoder.to_string_lossy())
            .merger(merger.to_string_lossy())
            .build()
            .unwrap();
        let toolchain = check_toolchain(&config).unwrap();
        assert!(toolchain.encoder.ends_with("cjb2"));
        assert!(toolchain.merger.ends_with("djvm"));
    }
}

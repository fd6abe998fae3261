//! Skipped-article log.
//!
//! One file per run, named after the local time the run started
//! (`YYYYMMDD-HHMMSS.log`), holding one identifier per line. The file is
//! opened in append mode on the first skipped article, so a clean run leaves
//! nothing behind and a rerun in the same second keeps earlier entries.

use crate::error::ArchiveError;
use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// File name for a log started at `started`.
pub fn file_name_for<Tz: TimeZone>(started: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("{}.log", started.format("%Y%m%d-%H%M%S"))
}

/// Append-only record of identifiers that were skipped.
#[derive(Debug)]
pub struct ErrorLog {
    path: PathBuf,
    entries: usize,
}

impl ErrorLog {
    /// Log in `dir` named after `started`.
    pub fn new<Tz: TimeZone>(dir: impl AsRef<Path>, started: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            path: dir.as_ref().join(file_name_for(started)),
            entries: 0,
        }
    }

    /// Log in `dir` named after the current local time.
    pub fn for_run(dir: impl AsRef<Path>) -> Self {
        Self::new(dir, &Local::now())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of identifiers written by this run.
    pub fn entries_written(&self) -> usize {
        self.entries
    }

    /// Append `identifier` as one line.
    pub async fn record(&mut self, identifier: &str) -> Result<(), ArchiveError> {
        let write_failed = |e: std::io::Error| ArchiveError::ErrorLogWriteFailed {
            path: self.path.clone(),
            source: e,
        };

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(write_failed)?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_failed)?;
        file.write_all(format!("{identifier}\n").as_bytes())
            .await
            .map_err(write_failed)?;
        file.flush().await.map_err(write_failed)?;

        self.entries += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn name_is_compact_timestamp() {
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(file_name_for(&started), "20240309-070501.log");
    }

    #[tokio::test]
    async fn appends_one_line_per_identifier() {
        let dir = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        let mut log = ErrorLog::new(dir.path(), &started);

        assert!(!log.path().exists());
        log.record("a2").await.unwrap();
        log.record("b7").await.unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "a2\nb7\n");
        assert_eq!(log.entries_written(), 2);
    }

    #[tokio::test]
    async fn keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let started = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        std::fs::write(dir.path().join("20240309-070501.log"), "old\n").unwrap();

        let mut log = ErrorLog::new(dir.path(), &started);
        log.record("new").await.unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "old\nnew\n");
    }
}

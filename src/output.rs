//! Result types returned by the driver.

use crate::error::ArticleError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An article whose output document was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedArticle {
    pub identifier: String,
    /// Path of the assembled document.
    pub document: PathBuf,
    /// Number of pages merged into the document.
    pub pages: usize,
}

/// An article that was written to the error log instead of converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedArticle {
    pub identifier: String,
    pub error: ArticleError,
}

/// Outcome of one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArticleOutcome {
    Converted(ConvertedArticle),
    Skipped(SkippedArticle),
}

impl ArticleOutcome {
    pub fn identifier(&self) -> &str {
        match self {
            ArticleOutcome::Converted(c) => &c.identifier,
            ArticleOutcome::Skipped(s) => &s.identifier,
        }
    }
}

/// Totals for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Identifiers handled, in list order (duplicates included).
    pub identifiers: usize,
    pub converted: Vec<ConvertedArticle>,
    pub skipped: Vec<SkippedArticle>,
    /// Error log path, if any article was skipped.
    pub error_log: Option<PathBuf>,
    pub total_duration_ms: u64,
}

impl RunSummary {
    pub(crate) fn record(&mut self, outcome: ArticleOutcome) {
        self.identifiers += 1;
        match outcome {
            ArticleOutcome::Converted(c) => self.converted.push(c),
            ArticleOutcome::Skipped(s) => self.skipped.push(s),
        }
    }

    /// Total pages merged across all converted articles.
    pub fn total_pages(&self) -> usize {
        self.converted.iter().map(|c| c.pages).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_records_outcomes_in_order() {
        let mut summary = RunSummary::default();
        summary.record(ArticleOutcome::Converted(ConvertedArticle {
            identifier: "a1".into(),
            document: PathBuf::from("output/a1.djvu"),
            pages: 3,
        }));
        summary.record(ArticleOutcome::Skipped(SkippedArticle {
            identifier: "a2".into(),
            error: ArticleError::MissingScan { record: 0 },
        }));

        assert_eq!(summary.identifiers, 2);
        assert_eq!(summary.total_pages(), 3);
        assert_eq!(summary.skipped[0].identifier, "a2");
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let outcome = ArticleOutcome::Skipped(SkippedArticle {
            identifier: "a2".into(),
            error: ArticleError::NoPages,
        });
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["identifier"], "a2");
        assert_eq!(outcome.identifier(), "a2");
    }
}

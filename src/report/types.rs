use serde::Deserialize;

use crate::pr::types::{FileStatus, PullRequest};

/// What the posted comment contains.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentMode {
    /// Every file's review, in API order
    #[default]
    Aggregate,
    /// Only the last successfully reviewed file's text
    Last,
}

/// Outcome of reviewing a single changed file.
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    /// Text returned by the model, untouched
    Reviewed(String),
    /// The model call failed; holds the error message
    Failed(String),
    /// GitHub supplied no textual patch (binary or oversized file)
    Skipped,
}

#[derive(Debug, Clone)]
pub struct FileReview {
    pub filename: String,
    pub status: FileStatus,
    pub additions: usize,
    pub deletions: usize,
    pub outcome: ReviewOutcome,
}

impl FileReview {
    pub fn review_text(&self) -> Option<&str> {
        match &self.outcome {
            ReviewOutcome::Reviewed(text) => Some(text),
            _ => None,
        }
    }
}

/// All per-file results of one run, in the order GitHub listed the files.
#[derive(Debug, Clone)]
pub struct ReviewSummary {
    pub pull_request: PullRequest,
    pub files: Vec<FileReview>,
}

impl ReviewSummary {
    pub fn reviewed_count(&self) -> usize {
        self.files.iter().filter(|f| f.review_text().is_some()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.outcome, ReviewOutcome::Failed(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(name: &str, outcome: ReviewOutcome) -> FileReview {
        FileReview {
            filename: name.to_string(),
            status: FileStatus::Modified,
            additions: 0,
            deletions: 0,
            outcome,
        }
    }

    #[test]
    fn test_comment_mode_default_is_aggregate() {
        assert_eq!(CommentMode::default(), CommentMode::Aggregate);
    }

    #[test]
    fn test_review_text_only_for_reviewed() {
        assert_eq!(review("a", ReviewOutcome::Reviewed("ok".into())).review_text(), Some("ok"));
        assert_eq!(review("b", ReviewOutcome::Failed("boom".into())).review_text(), None);
        assert_eq!(review("c", ReviewOutcome::Skipped).review_text(), None);
    }

    #[test]
    fn test_summary_counts() {
        let summary = ReviewSummary {
            pull_request: PullRequest {
                number: 1,
                title: "t".into(),
                description: None,
                author: "a".into(),
                url: "u".into(),
            },
            files: vec![
                review("a", ReviewOutcome::Reviewed("ok".into())),
                review("b", ReviewOutcome::Failed("boom".into())),
                review("c", ReviewOutcome::Skipped),
            ],
        };
        assert_eq!(summary.reviewed_count(), 1);
        assert_eq!(summary.failed_count(), 1);
    }
}

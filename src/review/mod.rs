use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::llm::ReviewModel;
use crate::pr::{HostingApi, PrError};
use crate::prompt::ReviewTemplate;
use crate::report::{self, CommentMode, FileReview, ReportError, ReviewOutcome, ReviewSummary};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("Failed to fetch pull request: {0}")]
    FetchPullRequest(#[source] PrError),

    #[error("Failed to fetch changed files: {0}")]
    FetchFiles(#[source] PrError),

    #[error("No review could be produced: all {failed} model calls failed")]
    NoReviews { failed: usize },

    #[error("Failed to post review comment: {0}")]
    PostComment(#[source] PrError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl ReviewError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ReviewError::FetchPullRequest(_) | ReviewError::FetchFiles(_) => 3,
            ReviewError::NoReviews { .. } => 4,
            ReviewError::PostComment(_) => 5,
            ReviewError::Report(_) => 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewOptions {
    pub comment_mode: CommentMode,
    /// Also write the comment body to this markdown file
    pub output: Option<PathBuf>,
    /// Review and print, but do not post the comment
    pub dry_run: bool,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct ReviewRun {
    pub summary: ReviewSummary,
    /// Comment body, None when no file carried a reviewable patch
    pub comment: Option<String>,
    pub posted: bool,
}

/// Drives one review: fetch the PR, review each file in turn, post one comment.
pub struct Reviewer<'a> {
    hosting: &'a dyn HostingApi,
    model: &'a dyn ReviewModel,
    template: &'a ReviewTemplate,
    options: ReviewOptions,
}

impl<'a> Reviewer<'a> {
    pub fn new(
        hosting: &'a dyn HostingApi,
        model: &'a dyn ReviewModel,
        template: &'a ReviewTemplate,
        options: ReviewOptions,
    ) -> Self {
        Self {
            hosting,
            model,
            template,
            options,
        }
    }

    pub async fn run(&self, number: u64) -> Result<ReviewRun, ReviewError> {
        info!("fetching pull request");
        let pull_request = self
            .hosting
            .get_pull_request(number)
            .await
            .map_err(ReviewError::FetchPullRequest)?;
        report::print_pull_request(&pull_request);

        info!("fetching changed files");
        let files = self
            .hosting
            .get_changed_files(number)
            .await
            .map_err(ReviewError::FetchFiles)?;
        info!(files = files.len(), "fetched changed files");

        let mut reviews = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let span = info_span!("review_file", index, file = %file.filename);
            let outcome = match file.patch.as_deref() {
                None => {
                    info!(parent: &span, "no textual patch, skipping");
                    ReviewOutcome::Skipped
                }
                Some(patch) => {
                    let prompt = self.template.render(patch);
                    match self.model.review(&prompt).instrument(span.clone()).await {
                        Ok(text) => {
                            debug!(parent: &span, response_bytes = text.len(), "file reviewed");
                            ReviewOutcome::Reviewed(text)
                        }
                        Err(err) => {
                            warn!(parent: &span, error = %err, "model call failed, continuing");
                            ReviewOutcome::Failed(err.to_string())
                        }
                    }
                }
            };

            let review = FileReview {
                filename: file.filename.clone(),
                status: file.status,
                additions: file.additions,
                deletions: file.deletions,
                outcome,
            };
            report::print_file_review(&review);
            reviews.push(review);
        }

        let summary = ReviewSummary {
            pull_request,
            files: reviews,
        };

        if summary.reviewed_count() == 0 && summary.failed_count() == 0 {
            info!(files = summary.files.len(), "no reviewable changes, nothing to post");
            return Ok(ReviewRun {
                summary,
                comment: None,
                posted: false,
            });
        }

        let body = report::comment_body(&summary, self.options.comment_mode).ok_or(
            ReviewError::NoReviews {
                failed: summary.failed_count(),
            },
        )?;
        info!(
            reviewed = summary.reviewed_count(),
            failed = summary.failed_count(),
            mode = ?self.options.comment_mode,
            "built review comment"
        );

        // A failed file write must not cost the PR its comment.
        let written = match &self.options.output {
            Some(path) => report::write_markdown(&body, path).inspect_err(|err| {
                warn!(error = %err, path = %path.display(), "review file was not written");
            }),
            None => Ok(()),
        };

        if self.options.dry_run {
            info!("dry run, not posting comment");
            written?;
            return Ok(ReviewRun {
                summary,
                comment: Some(body),
                posted: false,
            });
        }

        info!("posting review comment");
        if let Err(err) = self.hosting.post_comment(number, &body).await {
            warn!(error = %err, "review comment was not posted; the review is lost");
            return Err(ReviewError::PostComment(err));
        }
        written?;

        Ok(ReviewRun {
            summary,
            comment: Some(body),
            posted: true,
        })
    }
}

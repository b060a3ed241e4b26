pub mod types;

pub use types::{CommentMode, FileReview, ReviewOutcome, ReviewSummary};

use crate::pr::PullRequest;
use colored::Colorize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Render the PR header for the terminal.
///
/// PR #42: "Add account sync"
/// Author: alice | https://github.com/acme/app/pull/42
/// Description: ...
pub fn format_pull_request(pr: &PullRequest) -> String {
    let mut out = String::new();
    let title = format!("PR #{}: \"{}\"", pr.number, pr.title);
    out.push_str(&format!("{}\n", title.bold()));
    out.push_str(&format!("Author: {} | {}\n", pr.author, pr.url));
    match pr.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => {
            out.push_str(&format!("Description: {description}\n"))
        }
        _ => out.push_str(&format!("Description: {}\n", "(none)".dimmed())),
    }
    out
}

pub fn print_pull_request(pr: &PullRequest) {
    println!();
    println!("{}", format_pull_request(pr));
}

/// Render one file's review, followed by a separator rule.
pub fn format_file_review(review: &FileReview) -> String {
    let mut out = format!(
        "═══ {} ({}, {} {}) ═══\n",
        review.filename.bold(),
        review.status,
        format!("+{}", review.additions).green(),
        format!("-{}", review.deletions).red()
    );
    match &review.outcome {
        ReviewOutcome::Reviewed(text) => out.push_str(text),
        ReviewOutcome::Failed(reason) => {
            out.push_str(&format!("{} {reason}", "Review unavailable:".red().bold()))
        }
        ReviewOutcome::Skipped => out.push_str(&format!(
            "{}",
            "No textual diff available; not reviewed.".yellow()
        )),
    }
    out.push('\n');
    out.push_str(&"=".repeat(80));
    out
}

pub fn print_file_review(review: &FileReview) {
    println!("{}", format_file_review(review));
}

/// Build the body of the PR comment for a finished run.
///
/// Returns None when no file was reviewed successfully, so a run made only
/// of failures and skips never posts a comment.
pub fn comment_body(summary: &ReviewSummary, mode: CommentMode) -> Option<String> {
    match mode {
        CommentMode::Last => summary
            .files
            .iter()
            .rev()
            .find_map(FileReview::review_text)
            .map(str::to_string),
        CommentMode::Aggregate => {
            if summary.reviewed_count() == 0 {
                return None;
            }
            Some(aggregate_markdown(summary))
        }
    }
}

fn aggregate_markdown(summary: &ReviewSummary) -> String {
    let pr = &summary.pull_request;
    let mut md = String::new();
    md.push_str(&format!(
        "## Automated code review: PR #{} \"{}\"\n",
        pr.number, pr.title
    ));

    for file in &summary.files {
        md.push_str(&format!("\n### `{}` ({})\n\n", file.filename, file.status));
        match &file.outcome {
            ReviewOutcome::Reviewed(text) => md.push_str(text.trim_end()),
            ReviewOutcome::Failed(reason) => {
                md.push_str(&format!("_Review unavailable: {reason}_"))
            }
            ReviewOutcome::Skipped => md.push_str("_No textual diff available; not reviewed._"),
        }
        md.push('\n');
    }
    md
}

/// Write the comment body as a markdown file.
#[instrument(skip(body), fields(body_bytes = body.len()))]
pub fn write_markdown(body: &str, path: &Path) -> Result<(), ReportError> {
    debug!(path = %path.display(), "writing review to file");
    std::fs::write(path, body)?;
    Ok(())
}

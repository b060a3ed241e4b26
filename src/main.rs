mod config;
mod llm;
mod pr;
mod prompt;
mod report;
mod review;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;
use tracing::{debug, error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

use config::{Config, ConfigError, Settings};
use llm::{LlmError, MistralClient, ReviewModel};
use pr::{GitHubClient, PrError};
use prompt::ReviewTemplate;
use review::{ReviewError, ReviewOptions, ReviewRun, Reviewer};

/// PR Reviewer: reviews every changed file of a GitHub Pull Request with a
/// Mistral chat model and posts the review back as a PR comment.
///
/// The repository, PR number and credentials come from the environment
/// (GITHUB_REPO, GITHUB_PR_NUMBER, GITHUB_TOKEN, MISTRAL_API_KEY); a .env
/// file in the working directory is honoured.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// Settings file (defaults to .pr-reviewer.toml in the current directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write the review comment to this markdown file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Review and print, but do not post the comment
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to set up GitHub client: {0}")]
    GitHubSetup(#[from] PrError),

    #[error("Failed to set up LLM client: {0}")]
    LlmSetup(#[from] LlmError),

    #[error(transparent)]
    Review(#[from] ReviewError),
}

impl AppError {
    fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) => 2,
            AppError::Review(err) => err.exit_code(),
            AppError::GitHubSetup(_) | AppError::LlmSetup(_) => 1,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "loaded .env file"),
        Err(err) if err.not_found() => debug!("no .env file found"),
        Err(err) => error!(error = %err, "ignoring unreadable .env file"),
    }

    match run(&cli).instrument(info_span!("pr_review")).await {
        Ok(run) => {
            info!(
                files = run.summary.files.len(),
                reviewed = run.summary.reviewed_count(),
                posted = run.posted,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = err.exit_code();
            error!(error = %err, exit_code = code, "review aborted");
            eprintln!("Error: {err}");
            ExitCode::from(code)
        }
    }
}

async fn run(cli: &Cli) -> Result<ReviewRun, AppError> {
    info!("loading configuration");
    let settings = Settings::load(cli.config.as_deref())?;
    let options = ReviewOptions {
        output: cli.output.clone(),
        dry_run: cli.dry_run,
        ..ReviewOptions::default()
    };
    review_pull_request(settings, |key| std::env::var(key).ok(), options).await
}

/// Resolve configuration, build the clients and run one review.
///
/// Configuration is validated before any client exists, so a missing
/// credential never reaches the network.
async fn review_pull_request<F>(
    settings: Settings,
    lookup: F,
    mut options: ReviewOptions,
) -> Result<ReviewRun, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let config = Config::from_lookup(settings, lookup)?;
    debug!(repo = %config.repo, pr = config.pr_number, "configuration loaded");

    let github = GitHubClient::new(&config)?;
    let model = MistralClient::new(&config)?;
    let template = ReviewTemplate::from_settings(&config.settings.review);
    options.comment_mode = config.settings.review.comment_mode;
    debug!(
        model = model.model(),
        checklist = template.checklist().len(),
        "clients ready"
    );

    let reviewer = Reviewer::new(&github, &model, &template, options);
    let run = reviewer
        .run(config.pr_number)
        .instrument(info_span!("review", repo = %config.repo, pr = config.pr_number))
        .await?;
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::{env_with, full_env};
    use crate::config::{LLM_KEY_VAR, PR_NUMBER_VAR, REPO_VAR};
    use mockito::Matcher;
    use serde_json::json;

    fn settings_for(server: &mockito::ServerGuard) -> Settings {
        let mut settings = Settings::default();
        settings.github.api_base = server.url();
        settings.llm.api_base = server.url();
        settings
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["pr-reviewer", "--dry-run", "-o", "review.md"]);
        assert!(cli.dry_run);
        assert_eq!(cli.output, Some(PathBuf::from("review.md")));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::Config(ConfigError::MissingVar(REPO_VAR)).exit_code(), 2);
        assert_eq!(
            AppError::Review(ReviewError::NoReviews { failed: 1 }).exit_code(),
            4
        );
    }

    #[tokio::test]
    async fn test_missing_token_makes_no_http_calls() {
        let mut server = mockito::Server::new_async().await;
        let any_get = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let any_post = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let lookup = env_with(&[
            (REPO_VAR, "acme/salesforce-app"),
            (PR_NUMBER_VAR, "42"),
            (LLM_KEY_VAR, "mistral-test"),
        ]);
        let err = review_pull_request(settings_for(&server), lookup, ReviewOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Config(ConfigError::MissingVar("GITHUB_TOKEN"))));
        assert_eq!(err.exit_code(), 2);
        any_get.assert_async().await;
        any_post.assert_async().await;
    }

    #[tokio::test]
    async fn test_end_to_end_review_is_posted() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/salesforce-app/pulls/42")
            .with_status(200)
            .with_body(
                json!({
                    "number": 42,
                    "title": "Add account sync",
                    "body": "Nightly sync job",
                    "user": {"login": "alice"},
                    "html_url": "https://github.com/acme/salesforce-app/pull/42",
                })
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/salesforce-app/pulls/42/files")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(
                json!([{
                    "filename": "Foo.cls",
                    "status": "modified",
                    "additions": 1,
                    "deletions": 0,
                    "patch": "+ SOQL in loop"
                }])
                .to_string(),
            )
            .create_async()
            .await;
        let llm = server
            .mock("POST", "/v1/chat/completions")
            .match_body(Matcher::Regex(r"\+ SOQL in loop".to_string()))
            .with_status(200)
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content": "Line 1: SOQL inside for loop"}}]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let comment = server
            .mock("POST", "/repos/acme/salesforce-app/issues/42/comments")
            .match_body(Matcher::Regex("Line 1: SOQL inside for loop".to_string()))
            .with_status(201)
            .with_body(r#"{"id": 7}"#)
            .expect(1)
            .create_async()
            .await;

        let run = review_pull_request(settings_for(&server), full_env(), ReviewOptions::default())
            .await
            .unwrap();

        llm.assert_async().await;
        comment.assert_async().await;
        assert!(run.posted);
        assert_eq!(run.summary.reviewed_count(), 1);
    }
}

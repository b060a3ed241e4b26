pub mod types;

pub use types::{ChangedFile, PullRequest};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use types::Repository;

/// Versioned JSON media type sent on every GitHub call.
pub const GITHUB_MEDIA_TYPE: &str = "application/vnd.github.v3+json";

const USER_AGENT: &str = "pr-reviewer";

/// The files endpoint stops listing after this many entries.
const MAX_LISTED_FILES: u32 = 3000;

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("GitHub API returned {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },
}

/// The three hosting operations a review run needs.
#[async_trait]
pub trait HostingApi: Send + Sync {
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, PrError>;

    /// Every changed file of the PR, in the order GitHub lists them.
    async fn get_changed_files(&self, number: u64) -> Result<Vec<ChangedFile>, PrError>;

    async fn post_comment(&self, number: u64, body: &str) -> Result<(), PrError>;
}

/// GitHub REST v3 client bound to one repository.
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    repo: Repository,
    token: String,
    per_page: u32,
    /// Listing ceiling; GitHub's is `MAX_LISTED_FILES`
    max_files: u32,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct PullResponse {
    number: u64,
    title: String,
    body: Option<String>,
    user: User,
    html_url: String,
}

#[derive(Serialize)]
struct CommentRequest<'a> {
    body: &'a str,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self, PrError> {
        let github = &config.settings.github;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(github.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_base: github.api_base.trim_end_matches('/').to_string(),
            repo: config.repo.clone(),
            token: config.github_token.clone(),
            per_page: github.per_page,
            max_files: MAX_LISTED_FILES,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/repos/{}{}", self.api_base, self.repo, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
    }
}

/// Turn a non-2xx response into `PrError::Status`, keeping the body for the log.
async fn ensure_success(response: Response) -> Result<Response, PrError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(PrError::Status { status, url, body })
}

#[async_trait]
impl HostingApi for GitHubClient {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest, PrError> {
        let url = self.endpoint(&format!("/pulls/{number}"));

        debug!("fetching PR metadata from GitHub API");
        let response = self.authorized(self.http.get(&url)).send().await?;
        let metadata = ensure_success(response)
            .await?
            .json::<PullResponse>()
            .await?;
        debug!(title = %metadata.title, "received PR metadata");

        Ok(PullRequest {
            number: metadata.number,
            title: metadata.title,
            description: metadata.body,
            author: metadata.user.login,
            url: metadata.html_url,
        })
    }

    #[instrument(skip(self), fields(repo = %self.repo, per_page = self.per_page))]
    async fn get_changed_files(&self, number: u64) -> Result<Vec<ChangedFile>, PrError> {
        let url = self.endpoint(&format!("/pulls/{number}/files"));
        let max_pages = self.max_files.div_ceil(self.per_page);
        let mut files = Vec::new();
        let mut page: u32 = 1;

        loop {
            debug!(page, "fetching changed files page");
            let request = self
                .http
                .get(&url)
                .query(&[("per_page", self.per_page), ("page", page)]);
            let response = self.authorized(request).send().await?;
            let batch = ensure_success(response)
                .await?
                .json::<Vec<ChangedFile>>()
                .await?;

            let received = batch.len();
            files.extend(batch);
            if received < self.per_page as usize {
                break;
            }
            if page >= max_pages {
                warn!(
                    files = files.len(),
                    max_files = self.max_files,
                    "file listing limit reached; remaining files are not reviewed"
                );
                break;
            }
            page += 1;
        }

        debug!(files = files.len(), pages = page, "received changed files");
        Ok(files)
    }

    #[instrument(skip(self, body), fields(repo = %self.repo, body_bytes = body.len()))]
    async fn post_comment(&self, number: u64, body: &str) -> Result<(), PrError> {
        let url = self.endpoint(&format!("/issues/{number}/comments"));

        debug!("posting review comment");
        let request = self.http.post(&url).json(&CommentRequest { body });
        let response = self.authorized(request).send().await?;
        ensure_success(response).await?;
        debug!("comment created");
        Ok(())
    }
}

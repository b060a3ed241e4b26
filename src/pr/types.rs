use serde::Deserialize;
use std::fmt;

/// Metadata about a pull request fetched from the GitHub API.
/// Note: Not Deserialize; built from the `PullResponse` wire struct so the
/// nested `user.login` field is flattened into `author`.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body; GitHub sends null for an empty description
    pub description: Option<String>,
    /// Author's GitHub login
    pub author: String,
    /// Browser URL of the PR
    pub url: String,
}

/// How a file was touched by the PR, as reported by the files endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
    Copied,
    Changed,
    Unchanged,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Removed => "removed",
            FileStatus::Renamed => "renamed",
            FileStatus::Copied => "copied",
            FileStatus::Changed => "changed",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A single entry of `GET /repos/{repo}/pulls/{number}/files`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChangedFile {
    /// File path (e.g., "force-app/main/default/classes/Foo.cls")
    pub filename: String,
    pub status: FileStatus,
    #[serde(default)]
    pub additions: usize,
    #[serde(default)]
    pub deletions: usize,
    /// Unified diff of the file. GitHub omits it for binary files and
    /// for diffs too large to render.
    #[serde(default)]
    pub patch: Option<String>,
}

/// Repository in `owner/name` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

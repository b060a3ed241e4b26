use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::pr::types::Repository;
use crate::prompt::ChecklistItem;
use crate::report::types::CommentMode;

/// Settings file looked up in the current directory when `--config` is not given.
pub const SETTINGS_FILE: &str = ".pr-reviewer.toml";

pub const REPO_VAR: &str = "GITHUB_REPO";
pub const TOKEN_VAR: &str = "GITHUB_TOKEN";
pub const PR_NUMBER_VAR: &str = "GITHUB_PR_NUMBER";
pub const LLM_KEY_VAR: &str = "MISTRAL_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("Invalid setting {key}: {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

/// Everything one review run needs, resolved once at start-up and passed
/// down by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub repo: Repository,
    pub github_token: String,
    pub pr_number: u64,
    pub llm_api_key: String,
    pub settings: Settings,
}

/// Optional tuning loaded from .pr-reviewer.toml.
/// All fields have defaults, so the tool works with zero config.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub github: GitHubSettings,

    #[serde(default)]
    pub llm: LlmSettings,

    #[serde(default)]
    pub review: ReviewSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// REST API root; point it at a GitHub Enterprise host if needed
    pub api_base: String,
    pub timeout_secs: u64,
    /// Page size for the changed-files listing (GitHub allows at most 100)
    pub per_page: u32,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 30,
            per_page: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_base: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.mistral.ai".to_string(),
            model: crate::llm::DEFAULT_MODEL.to_string(),
            temperature: crate::llm::DEFAULT_TEMPERATURE,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewSettings {
    #[serde(default)]
    pub comment_mode: CommentMode,

    /// Replaces the built-in issue checklist when set
    #[serde(default)]
    pub checklist: Option<Vec<ChecklistItem>>,
}

impl Settings {
    /// Load settings from `path`, or from .pr-reviewer.toml in the current
    /// directory when no path is given. Only the implicit file may be absent.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let settings = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(SETTINGS_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Settings::default()
                }
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Settings, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let settings = toml::from_str(&contents)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.github.per_page) {
            return Err(ConfigError::InvalidSetting {
                key: "github.per_page",
                reason: format!("{} is outside 1..=100", self.github.per_page),
            });
        }
        if self.github.timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "github.timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "llm.timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        if !self.llm.temperature.is_finite() || self.llm.temperature < 0.0 {
            return Err(ConfigError::InvalidSetting {
                key: "llm.temperature",
                reason: format!("{} is not a non-negative number", self.llm.temperature),
            });
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "llm.model",
                reason: "must not be empty".to_string(),
            });
        }
        if matches!(&self.review.checklist, Some(items) if items.is_empty()) {
            return Err(ConfigError::InvalidSetting {
                key: "review.checklist",
                reason: "must contain at least one item when set".to_string(),
            });
        }
        Ok(())
    }
}

impl Config {
    /// Resolve the required values through `lookup` (`std::env::var` in
    /// production), so tests can supply them without mutating the process
    /// environment.
    ///
    /// Empty values count as missing.
    pub fn from_lookup<F>(settings: Settings, lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingVar(var))
        };

        let repo = parse_repository(&required(REPO_VAR)?)?;
        let github_token = required(TOKEN_VAR)?;
        let pr_number = parse_pr_number(&required(PR_NUMBER_VAR)?)?;
        let llm_api_key = required(LLM_KEY_VAR)?;

        Ok(Config {
            repo,
            github_token,
            pr_number,
            llm_api_key,
            settings,
        })
    }
}

fn parse_repository(value: &str) -> Result<Repository, ConfigError> {
    let invalid = || ConfigError::InvalidVar {
        var: REPO_VAR,
        reason: format!("expected owner/name, got '{value}'"),
    };
    let (owner, name) = value.split_once('/').ok_or_else(invalid)?;
    if owner.is_empty() || name.is_empty() || name.contains('/') {
        return Err(invalid());
    }
    Ok(Repository {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}

fn parse_pr_number(value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(number) if number > 0 => Ok(number),
        _ => Err(ConfigError::InvalidVar {
            var: PR_NUMBER_VAR,
            reason: format!("expected a positive integer, got '{value}'"),
        }),
    }
}

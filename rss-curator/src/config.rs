//! Per-user configuration.
//!
//! The user file (default `user.toml`) carries feeds, the preference assistant
//! id, and the publish/notify targets. Secrets that identify the application
//! itself come from the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use email_notifier::{EmailSettings, SmtpOptions};
use serde::Deserialize;

use crate::types::{CommitAuthor, CuratorError, DuplicateTitlePolicy, FetchConfig, Result, SummaryFailurePolicy};

pub const DEFAULT_CONFIG_FILE: &str = "user.toml";

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CuratorConfig {
    pub user: UserProfile,

    #[serde(default)]
    pub curator: CuratorSettings,
}

/// `[user]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub top_rss_feeds: Vec<String>,

    /// Opaque id of the user's trained preference assistant.
    pub user_rec_bot_id: String,

    pub github: Option<GithubTarget>,

    pub email: Option<EmailSettings>,
}

/// `[user.github]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubTarget {
    /// `owner/name`
    pub write_repo: String,
    pub write_file: String,
    pub app_name: String,
    pub app_email: String,
}

impl GithubTarget {
    pub fn author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.app_name.clone(),
            email: self.app_email.clone(),
        }
    }
}

/// `[curator]` section: pipeline tuning, every field defaulted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CuratorSettings {
    pub window_days: u32,
    pub summary_concurrency: usize,
    pub summary_model: String,
    pub summary_word_limit: u32,
    pub duplicate_titles: DuplicateTitlePolicy,
    pub summary_failures: SummaryFailurePolicy,
    pub http_timeout_seconds: u64,
    pub classifier_timeout_seconds: u64,
    pub classifier_poll_interval_ms: u64,
    pub smtp_timeout_seconds: u64,
    pub smtp_port: u16,
    pub openai_base_url: String,
    pub github_api_url: String,
}

impl Default for CuratorSettings {
    fn default() -> Self {
        Self {
            window_days: 1,
            summary_concurrency: 4,
            summary_model: "gpt-4o-mini".to_string(),
            summary_word_limit: 60,
            duplicate_titles: DuplicateTitlePolicy::Collapse,
            summary_failures: SummaryFailurePolicy::Omit,
            http_timeout_seconds: 30,
            classifier_timeout_seconds: 300,
            classifier_poll_interval_ms: 1000,
            smtp_timeout_seconds: 15,
            smtp_port: email_notifier::DEFAULT_SMTP_PORT,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            github_api_url: "https://api.github.com".to_string(),
        }
    }
}

impl CuratorSettings {
    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            timeout_seconds: self.http_timeout_seconds,
            ..FetchConfig::default()
        }
    }

    pub fn smtp_options(&self) -> SmtpOptions {
        SmtpOptions {
            port: self.smtp_port,
            timeout: Duration::from_secs(self.smtp_timeout_seconds),
        }
    }
}

impl CuratorConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CuratorError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: CuratorConfig =
            toml::from_str(raw).map_err(|e| CuratorError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.user.user_rec_bot_id.trim().is_empty() {
            return Err(CuratorError::Config("user.user_rec_bot_id is empty".to_string()));
        }
        for feed in &self.user.top_rss_feeds {
            url::Url::parse(feed)
                .map_err(|e| CuratorError::Config(format!("bad feed url '{}': {}", feed, e)))?;
        }
        if let Some(github) = &self.user.github {
            let mut parts = github.write_repo.split('/');
            let well_formed = matches!(
                (parts.next(), parts.next(), parts.next()),
                (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
            );
            if !well_formed {
                return Err(CuratorError::Config(format!(
                    "user.github.write_repo must look like owner/name, got '{}'",
                    github.write_repo
                )));
            }
            if github.write_file.trim().is_empty() {
                return Err(CuratorError::Config("user.github.write_file is empty".to_string()));
            }
        }
        if self.curator.summary_concurrency == 0 {
            return Err(CuratorError::Config("curator.summary_concurrency must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// How the curator proves it is the configured GitHub App.
#[derive(Debug, Clone)]
pub enum GithubAuth {
    App { app_id: String, private_key_path: PathBuf },
    Token(String),
}

/// Application secrets taken from the process environment.
#[derive(Clone)]
pub struct Secrets {
    pub openai_api_key: String,
    pub github: Option<GithubAuth>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openai_api_key", &"***")
            .field("github", &self.github.as_ref().map(|auth| match auth {
                GithubAuth::App { app_id, .. } => format!("app {}", app_id),
                GithubAuth::Token(_) => "token".to_string(),
            }))
            .finish()
    }
}

impl Secrets {
    /// Reads `OPENAI_API_KEY`, then `GITHUB_TOKEN` or `GITHUB_APP_ID` + `GITHUB_APP_PRIVATE_KEY`.
    pub fn from_env() -> Result<Self> {
        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CuratorError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let github = match std::env::var("GITHUB_TOKEN") {
            Ok(token) if !token.is_empty() => Some(GithubAuth::Token(token)),
            _ => match (std::env::var("GITHUB_APP_ID"), std::env::var("GITHUB_APP_PRIVATE_KEY")) {
                (Ok(app_id), Ok(path)) => Some(GithubAuth::App {
                    app_id,
                    private_key_path: PathBuf::from(path),
                }),
                _ => None,
            },
        };

        Ok(Self { openai_api_key, github })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [user]
        top_rss_feeds = ["https://rss.arxiv.org/rss/cs.LG", "https://rss.arxiv.org/rss/q-bio.BM"]
        user_rec_bot_id = "asst_123"

        [user.github]
        write_repo = "someone/memorypalace"
        write_file = "readinglist.md"
        app_name = "curator-bot"
        app_email = "curator@example.com"

        [user.email]
        sender_smtp = "smtp.example.com"
        sender_email = "curator@example.com"
        sender_email_app_pw = "pw"
        recipient_email = "me@example.com"

        [curator]
        window_days = 2
        duplicate_titles = "keep_all"
    "#;

    #[test]
    fn parses_full_config_with_defaults() {
        let config = CuratorConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.user.top_rss_feeds.len(), 2);
        assert_eq!(config.user.user_rec_bot_id, "asst_123");
        assert_eq!(config.curator.window_days, 2);
        assert_eq!(config.curator.duplicate_titles, DuplicateTitlePolicy::KeepAll);
        assert_eq!(config.curator.summary_failures, SummaryFailurePolicy::Omit);
        assert_eq!(config.curator.summary_model, "gpt-4o-mini");
        assert_eq!(config.curator.smtp_port, 587);
        let author = config.user.github.unwrap().author();
        assert_eq!(author.name, "curator-bot");
    }

    #[test]
    fn rejects_malformed_repo() {
        let broken = SAMPLE.replace("someone/memorypalace", "memorypalace");
        let err = CuratorConfig::from_toml_str(&broken).unwrap_err();
        assert!(err.to_string().contains("owner/name"));
    }

    #[test]
    fn rejects_missing_assistant() {
        let broken = SAMPLE.replace("asst_123", " ");
        assert!(CuratorConfig::from_toml_str(&broken).is_err());
    }

    #[test]
    fn github_and_email_are_optional() {
        let minimal = r#"
            [user]
            user_rec_bot_id = "asst_1"
        "#;
        let config = CuratorConfig::from_toml_str(minimal).unwrap();
        assert!(config.user.github.is_none());
        assert!(config.user.email.is_none());
        assert!(config.user.top_rss_feeds.is_empty());
    }
}

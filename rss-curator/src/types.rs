use std::time::Duration;

use serde::{Deserialize, Serialize};
// Use the interfaces crate for the shared data model
pub use interfaces::defs::{
    normalize_title, CanonicalRecord, DailyDigestPayload, DigestLine, FeedEntry, RemoteDocument,
};

/// Returned in place of a commit hash when the remote accepted a write but did
/// not report which commit it created.
pub const COMMIT_UNCONFIRMED_MESSAGE: &str = "COMMIT ERROR: DO NOT TRY AGAIN. SEND AN EMAIL INSTEAD.";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RSS-Curator/1.0".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Name and email written as both author and committer of digest commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// What to do when two candidate entries normalize to the same title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateTitlePolicy {
    /// Keep the first entry per title. Required for a lossless classifier round-trip.
    #[default]
    Collapse,
    KeepAll,
}

/// What to do with a record whose summary could not be produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFailurePolicy {
    #[default]
    Omit,
    Abort,
}

#[derive(Debug, thiserror::Error)]
pub enum CuratorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("ERROR: {status}")]
    ClassifierRun { status: String },

    #[error("Summarizer failed for '{title}': {reason}")]
    Summarizer { title: String, reason: String },

    #[error("Remote document {path} changed since revision {sha}; re-read and retry")]
    PublishConflict { path: String, sha: String },

    #[error("{}", COMMIT_UNCONFIRMED_MESSAGE)]
    CommitUnconfirmed,

    #[error("LLM service error (HTTP {status}): {message}")]
    Llm { status: u16, message: String },

    #[error("Remote store error (HTTP {status}): {message}")]
    RemoteStore { status: u16, message: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Timed out after {seconds}s while {operation}")]
    Timeout { operation: String, seconds: u64 },

    #[error("Workflow error: {0}")]
    Workflow(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("General error: {0}")]
    General(String),
}

impl CuratorError {
    /// True for errors where repeating the same call could duplicate a side effect.
    pub fn forbids_retry(&self) -> bool {
        matches!(self, CuratorError::CommitUnconfirmed)
    }
}

pub type Result<T> = std::result::Result<T, CuratorError>;

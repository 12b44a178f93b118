use crate::types::{CommitAuthor, DailyDigestPayload, FeedEntry, RemoteDocument, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use email_notifier::{Notifier, NotifyOutcome, SmtpConnector};

/// Reads syndication feeds.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Returns at most `max_count` entries in feed order.
    ///
    /// Unreachable or malformed feeds yield an empty list instead of an error.
    async fn read(&self, url: &str, max_count: Option<usize>) -> Vec<FeedEntry>;
}

/// Final state of one exchange with the preference assistant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantReply {
    /// Terminal run status as reported by the service, e.g. `completed` or `failed`.
    pub status: String,
    /// The assistant's text answer, present when the run completed.
    pub text: Option<String>,
}

impl AssistantReply {
    pub fn completed(text: impl Into<String>) -> Self {
        Self {
            status: "completed".to_string(),
            text: Some(text.into()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// The user's stateful preference model, addressed by assistant id.
#[async_trait]
pub trait PreferenceAssistant: Send + Sync {
    /// Posts one message and waits for the run to reach a terminal state.
    async fn evaluate(&self, assistant_id: &str, prompt: &str) -> Result<AssistantReply>;
}

/// Stateless summarization model.
#[async_trait]
pub trait SummaryModel: Send + Sync {
    async fn summarize(&self, title: &str, abstract_text: &str) -> Result<String>;
}

/// A versioned document store with conditional writes.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<RemoteDocument>;

    /// Replaces the content of `document`, conditioned on `document.sha`.
    ///
    /// Fails with `CuratorError::PublishConflict` when the remote revision moved.
    /// Returns the new commit id when the store reports one.
    async fn update(
        &self,
        document: &RemoteDocument,
        new_content: &str,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<Option<String>>;
}

/// Delivers the digest out of band. Failures are reported, never raised.
#[async_trait]
pub trait DigestNotifier: Send + Sync {
    async fn notify(&self, payload: &DailyDigestPayload, today: NaiveDate) -> NotifyOutcome;
}

#[async_trait]
impl<C: SmtpConnector> DigestNotifier for Notifier<C> {
    async fn notify(&self, payload: &DailyDigestPayload, today: NaiveDate) -> NotifyOutcome {
        Notifier::notify(self, payload, today).await
    }
}

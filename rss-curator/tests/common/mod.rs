#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rss_curator::config::CuratorConfig;
use rss_curator::types::*;
use rss_curator::{AssistantReply, DocumentStore, FeedSource, PreferenceAssistant, SummaryModel};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .try_init()
            .ok();
    });
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 17).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn entry(title: &str, updated: Option<DateTime<Utc>>) -> FeedEntry {
    let slug: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    FeedEntry {
        title: title.to_string(),
        summary: format!("Abstract of {}", title),
        link: format!("https://arxiv.org/abs/{}", slug),
        updated,
        authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
        feed_title: "cs.LG updates on arXiv.org".to_string(),
    }
}

pub const FEED_URL: &str = "https://rss.arxiv.org/rss/cs.LG";

pub fn config_toml(extra_curator: &str) -> String {
    format!(
        r#"
        [user]
        top_rss_feeds = ["{}"]
        user_rec_bot_id = "asst_test"

        [user.github]
        write_repo = "someone/memorypalace"
        write_file = "readinglist.md"
        app_name = "curator-bot"
        app_email = "curator@example.com"

        [curator]
        {}
        "#,
        FEED_URL, extra_curator
    )
}

pub fn config(extra_curator: &str) -> CuratorConfig {
    CuratorConfig::from_toml_str(&config_toml(extra_curator)).unwrap()
}

/// Feeds served from memory, keyed by URL.
#[derive(Default)]
pub struct StaticFeeds {
    feeds: HashMap<String, Vec<FeedEntry>>,
}

impl StaticFeeds {
    pub fn with(mut self, url: &str, entries: Vec<FeedEntry>) -> Self {
        self.feeds.insert(url.to_string(), entries);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeeds {
    async fn read(&self, url: &str, max_count: Option<usize>) -> Vec<FeedEntry> {
        let mut entries = self.feeds.get(url).cloned().unwrap_or_default();
        if let Some(max) = max_count {
            entries.truncate(max);
        }
        entries
    }
}

/// Replies with a fixed answer and records every prompt it was sent.
pub struct ScriptedAssistant {
    reply: AssistantReply,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedAssistant {
    pub fn answering(text: &str) -> Self {
        Self::with_reply(AssistantReply::completed(text))
    }

    pub fn with_reply(reply: AssistantReply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl PreferenceAssistant for ScriptedAssistant {
    async fn evaluate(&self, _assistant_id: &str, prompt: &str) -> Result<AssistantReply> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Summaries derived from the title; titles in `failing` return an error.
#[derive(Default)]
pub struct EchoSummaries {
    pub failing: HashSet<String>,
}

impl EchoSummaries {
    pub fn failing_on(titles: &[&str]) -> Self {
        Self {
            failing: titles.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SummaryModel for EchoSummaries {
    async fn summarize(&self, title: &str, _abstract_text: &str) -> Result<String> {
        if self.failing.contains(title) {
            return Err(CuratorError::Llm {
                status: 500,
                message: "upstream exploded".to_string(),
            });
        }
        Ok(format!("Summary of {}.", title))
    }
}

/// How the in-memory store answers writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBehavior {
    Normal,
    /// Another writer commits between our read and our write.
    ConcurrentWriter,
    /// Write lands but no commit id comes back.
    OmitCommitId,
}

#[derive(Debug)]
struct StoreState {
    content: String,
    sha: String,
    revision: u32,
    writes: u32,
}

/// A versioned single-document store with compare-and-swap writes.
pub struct MemoryStore {
    path: String,
    behavior: StoreBehavior,
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new(path: &str, content: &str) -> Self {
        Self::with_behavior(path, content, StoreBehavior::Normal)
    }

    pub fn with_behavior(path: &str, content: &str, behavior: StoreBehavior) -> Self {
        Self {
            path: path.to_string(),
            behavior,
            state: Mutex::new(StoreState {
                content: content.to_string(),
                sha: "sha-0".to_string(),
                revision: 0,
                writes: 0,
            }),
        }
    }

    pub fn content(&self) -> String {
        self.state.lock().unwrap().content.clone()
    }

    pub fn writes(&self) -> u32 {
        self.state.lock().unwrap().writes
    }

    fn bump(state: &mut StoreState, content: String) -> String {
        state.revision += 1;
        state.sha = format!("sha-{}", state.revision);
        state.content = content;
        format!("commit-{}", state.revision)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch(&self, path: &str) -> Result<RemoteDocument> {
        if path != self.path {
            return Err(CuratorError::RemoteStore {
                status: 404,
                message: format!("{} not found", path),
            });
        }
        let state = self.state.lock().unwrap();
        Ok(RemoteDocument {
            path: self.path.clone(),
            content: state.content.clone(),
            sha: state.sha.clone(),
        })
    }

    async fn update(
        &self,
        document: &RemoteDocument,
        new_content: &str,
        _message: &str,
        _author: &CommitAuthor,
    ) -> Result<Option<String>> {
        let mut state = self.state.lock().unwrap();
        if self.behavior == StoreBehavior::ConcurrentWriter {
            let racing = format!("{}\n- someone else's edit  \n", state.content);
            Self::bump(&mut state, racing);
        }
        if state.sha != document.sha {
            return Err(CuratorError::PublishConflict {
                path: document.path.clone(),
                sha: document.sha.clone(),
            });
        }
        state.writes += 1;
        let commit = Self::bump(&mut state, new_content.to_string());
        match self.behavior {
            StoreBehavior::OmitCommitId => Ok(None),
            _ => Ok(Some(commit)),
        }
    }
}

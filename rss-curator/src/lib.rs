pub mod types;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod sources;
pub mod traits;
pub mod processing;
pub mod relevance;
pub mod llm_adapter;
pub mod summarizer;
pub mod digest;
pub mod publisher;
pub mod github;
pub mod pipeline;

pub use types::*;
pub use config::{CuratorConfig, CuratorSettings, GithubAuth, GithubTarget, Secrets, UserProfile};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use sources::RssFeedReader;
pub use traits::{AssistantReply, DigestNotifier, DocumentStore, FeedSource, PreferenceAssistant, SummaryModel};
pub use relevance::RelevanceClassifier;
pub use llm_adapter::{OpenAiAdapter, OpenAiConfig};
pub use publisher::DigestPublisher;
pub use github::GithubDocumentStore;
pub use pipeline::{Capabilities, CurationStage, Curator, Delivery, RunReport, ToolCall, ToolOutput};

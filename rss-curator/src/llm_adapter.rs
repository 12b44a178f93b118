use crate::traits::{AssistantReply, PreferenceAssistant, SummaryModel};
use crate::types::{CuratorError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Runs in these states will not change any more.
const TERMINAL_RUN_STATES: &[&str] = &[
    "completed",
    "failed",
    "cancelled",
    "expired",
    "incomplete",
    "requires_action",
];

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub summary_model: String,
    pub summary_word_limit: u32,
    pub request_timeout: Duration,
    pub run_timeout: Duration,
    pub poll_interval: Duration,
}

/// OpenAI-backed preference assistant and summarizer.
pub struct OpenAiAdapter {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Run {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Deserialize)]
struct ThreadMessage {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Vec<MessageContent>,
}

#[derive(Debug, Deserialize)]
struct MessageContent {
    text: Option<MessageText>,
}

#[derive(Debug, Deserialize)]
struct MessageText {
    value: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent("RSS-Curator/1.0")
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn assistants(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.config.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CuratorError::Llm {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<T>().await?)
    }

    async fn start_run(&self, assistant_id: &str, prompt: &str) -> Result<(String, Run)> {
        let thread: Created = Self::read_json(
            self.assistants(self.client.post(self.url("threads")))
                .json(&json!({}))
                .send()
                .await?,
        )
        .await?;
        debug!("Created thread {}", thread.id);

        let _: Created = Self::read_json(
            self.assistants(self.client.post(self.url(&format!("threads/{}/messages", thread.id))))
                .json(&json!({ "role": "user", "content": prompt }))
                .send()
                .await?,
        )
        .await?;

        let run: Run = Self::read_json(
            self.assistants(self.client.post(self.url(&format!("threads/{}/runs", thread.id))))
                .json(&json!({ "assistant_id": assistant_id }))
                .send()
                .await?,
        )
        .await?;
        debug!("Started run {} on thread {}", run.id, thread.id);

        Ok((thread.id, run))
    }

    async fn poll_until_terminal(&self, thread_id: &str, mut run: Run) -> Result<Run> {
        while !TERMINAL_RUN_STATES.contains(&run.status.as_str()) {
            tokio::time::sleep(self.config.poll_interval).await;
            run = Self::read_json(
                self.assistants(
                    self.client
                        .get(self.url(&format!("threads/{}/runs/{}", thread_id, run.id))),
                )
                .send()
                .await?,
            )
            .await?;
            debug!("Run {} is {}", run.id, run.status);
        }
        Ok(run)
    }

    async fn latest_reply(&self, thread_id: &str) -> Result<Option<String>> {
        let messages: MessageList = Self::read_json(
            self.assistants(
                self.client
                    .get(self.url(&format!("threads/{}/messages", thread_id)))
                    .query(&[("order", "desc"), ("limit", "1")]),
            )
            .send()
            .await?,
        )
        .await?;

        Ok(messages
            .data
            .into_iter()
            .find(|m| m.role.is_empty() || m.role == "assistant")
            .and_then(|m| m.content.into_iter().find_map(|c| c.text))
            .map(|t| t.value))
    }

    async fn exchange(&self, assistant_id: &str, prompt: &str) -> Result<AssistantReply> {
        let (thread_id, run) = self.start_run(assistant_id, prompt).await?;
        let run = self.poll_until_terminal(&thread_id, run).await?;
        if run.status != "completed" {
            return Ok(AssistantReply {
                status: run.status,
                text: None,
            });
        }
        let text = self.latest_reply(&thread_id).await?;
        Ok(AssistantReply {
            status: run.status,
            text,
        })
    }

    fn summary_instructions(&self) -> String {
        format!(
            "Summarize the following paper from its title and abstract. \
             Make sure to highlight any datasets, methods, and results that are mentioned. \
             Keep your summary to fewer than {} words",
            self.config.summary_word_limit
        )
    }
}

#[async_trait]
impl PreferenceAssistant for OpenAiAdapter {
    async fn evaluate(&self, assistant_id: &str, prompt: &str) -> Result<AssistantReply> {
        let exchange = self.exchange(assistant_id, prompt);

        match tokio::time::timeout(self.config.run_timeout, exchange).await {
            Ok(reply) => {
                if let Ok(reply) = &reply {
                    info!("Assistant run finished with status {}", reply.status);
                }
                reply
            }
            Err(_) => Err(CuratorError::Timeout {
                operation: "waiting for the preference assistant".to_string(),
                seconds: self.config.run_timeout.as_secs(),
            }),
        }
    }
}

#[async_trait]
impl SummaryModel for OpenAiAdapter {
    async fn summarize(&self, title: &str, abstract_text: &str) -> Result<String> {
        let messages = [
            ChatMessage {
                role: "system",
                content: self.summary_instructions(),
            },
            ChatMessage {
                role: "user",
                content: format!("The paper title is {}\nThe abstract is {}", title, abstract_text),
            },
        ];

        let completion: ChatCompletion = Self::read_json(
            self.client
                .post(self.url("chat/completions"))
                .bearer_auth(&self.config.api_key)
                .json(&json!({ "model": self.config.summary_model, "messages": messages }))
                .send()
                .await?,
        )
        .await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| CuratorError::General("completion contained no summary".to_string()))
    }
}

//! Batch relevance classification against the user's preference assistant.
//!
//! All candidate titles go out in one message and come back as one
//! line-oriented answer, one `- <title>: True|False` line per title. The
//! exchange is all-or-nothing: a run that does not complete fails the step.

use crate::traits::PreferenceAssistant;
use crate::types::{normalize_title, CuratorError, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const PROMPT_PREAMBLE: &str = "This is a list of papers, determine whether each paper is interesting:";

/// Builds the single request sent to the assistant.
pub fn build_prompt(titles: &[String]) -> String {
    let listing = titles
        .iter()
        .map(|title| format!("- {}", title))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n{}", PROMPT_PREAMBLE, listing)
}

/// Extracts the titles the assistant marked `True`.
///
/// A line counts when, once trimmed, it ends with the token `True`. The title is
/// what remains after dropping a leading `-`/`*` bullet and the trailing
/// `: True`.
pub fn parse_verdicts(response: &str) -> HashSet<String> {
    response
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let head = line.strip_suffix("True")?;
            let head = head.trim_end();
            let head = head.strip_suffix(':').unwrap_or(head);
            let title = head
                .trim_start_matches(|c: char| c == '-' || c == '*' || c.is_whitespace())
                .trim();
            if title.is_empty() {
                None
            } else {
                Some(normalize_title(title))
            }
        })
        .collect()
}

/// Classifies titles for one user. Results align positionally with `titles`.
pub struct RelevanceClassifier<'a> {
    assistant: &'a dyn PreferenceAssistant,
    assistant_id: &'a str,
}

impl<'a> RelevanceClassifier<'a> {
    pub fn new(assistant: &'a dyn PreferenceAssistant, assistant_id: &'a str) -> Self {
        Self {
            assistant,
            assistant_id,
        }
    }

    /// The set of accepted (normalized) titles.
    pub async fn accepted_titles(&self, titles: &[String]) -> Result<HashSet<String>> {
        if titles.is_empty() {
            debug!("No candidate titles, skipping classification");
            return Ok(HashSet::new());
        }

        info!("Classifying {} titles with assistant {}", titles.len(), self.assistant_id);
        let reply = self
            .assistant
            .evaluate(self.assistant_id, &build_prompt(titles))
            .await?;

        if !reply.is_completed() {
            warn!("Classification run ended with status {}", reply.status);
            return Err(CuratorError::ClassifierRun { status: reply.status });
        }

        let text = reply.text.unwrap_or_default();
        let known: HashSet<String> = titles.iter().map(|t| normalize_title(t)).collect();
        let verdicts = parse_verdicts(&text);

        let (accepted, unknown): (HashSet<String>, HashSet<String>) =
            verdicts.into_iter().partition(|title| known.contains(title));
        for title in &unknown {
            warn!("Assistant accepted a title that was not asked about: {}", title);
        }

        info!("Assistant accepted {}/{} titles", accepted.len(), titles.len());
        Ok(accepted)
    }

    /// One verdict per input title.
    pub async fn classify(&self, titles: &[String]) -> Result<Vec<bool>> {
        let accepted = self.accepted_titles(titles).await?;
        Ok(titles
            .iter()
            .map(|title| accepted.contains(&normalize_title(title)))
            .collect())
    }
}

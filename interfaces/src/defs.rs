use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry as parsed from a syndication feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
    pub link: String,
    /// `None` when the feed carried no usable timestamp.
    pub updated: Option<DateTime<Utc>>,
    pub authors: Vec<String>,
    pub feed_title: String,
}

impl FeedEntry {
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Normalizes a title into the join key shared by the classifier and the enricher.
///
/// Newlines become spaces, periods are dropped and whitespace runs collapse to
/// a single space, so `"Foo.\nBar"` and `"Foo Bar"` compare equal.
pub fn normalize_title(title: &str) -> String {
    title
        .replace(['\r', '\n'], " ")
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A curated entry, ready to be summarized and published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Normalized title; unique within a run unless duplicates are kept on purpose.
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub link: String,
    pub date: String,
    pub authors: Vec<String>,
    pub source: String,
}

/// A single rendered markdown list item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestLine(String);

impl DigestLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DigestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered digest lines produced by one run; handed to the publisher and the notifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDigestPayload {
    lines: Vec<DigestLine>,
}

impl DailyDigestPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: DigestLine) {
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[DigestLine] {
        &self.lines
    }

    /// The payload as one markdown block, one list item after another.
    pub fn to_markdown(&self) -> String {
        self.lines
            .iter()
            .map(DigestLine::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<DigestLine> for DailyDigestPayload {
    fn from_iter<I: IntoIterator<Item = DigestLine>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DailyDigestPayload {
    type Item = &'a DigestLine;
    type IntoIter = std::slice::Iter<'a, DigestLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

/// A versioned document held by an external store.
///
/// `sha` is the revision observed at read time; writes are conditioned on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteDocument {
    pub path: String,
    pub content: String,
    pub sha: String,
}

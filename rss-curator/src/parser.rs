use crate::types::{CuratorError, FeedEntry, Result};
use feed_rs::parser;
use tracing::{debug, info};

pub struct FeedParser;

impl FeedParser {
    /// Parses RSS or Atom content into entries in document order.
    /// `fallback_source` names the entries' feed when the document carries no
    /// title of its own.
    pub fn parse_feed(content: &str, fallback_source: &str) -> Result<Vec<FeedEntry>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| CuratorError::Parse(format!("Failed to parse feed: {}", e)))?;

        let feed_title = feed
            .title
            .map(|t| t.content)
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| fallback_source.to_string());

        let entries: Vec<FeedEntry> = feed
            .entries
            .into_iter()
            .filter_map(|entry| Self::parse_entry(entry, &feed_title))
            .collect();

        info!("Parsed feed '{}' with {} entries", feed_title, entries.len());

        Ok(entries)
    }

    fn parse_entry(entry: feed_rs::model::Entry, feed_title: &str) -> Option<FeedEntry> {
        let title = entry.title.map(|t| t.content).unwrap_or_default();

        // Every digest line links to its paper
        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            debug!("Skipping entry without link: {}", title);
            return None;
        };

        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .unwrap_or_default();

        // RSS 2.0 only carries pubDate, which feed-rs reports as `published`
        let updated = entry.updated.or(entry.published);

        let authors = entry
            .authors
            .into_iter()
            .map(|a| a.name)
            .filter(|name| !name.trim().is_empty())
            .collect();

        Some(FeedEntry {
            title,
            summary,
            link,
            updated,
            authors,
            feed_title: feed_title.to_string(),
        })
    }
}

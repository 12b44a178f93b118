use crate::traits::FeedSource;
use crate::types::{FeedEntry, FetchConfig, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{info, warn};

/// Feed reader over HTTP. One fetch attempt per call, no retries.
pub struct RssFeedReader {
    fetcher: Fetcher,
}

impl RssFeedReader {
    pub fn new(fetch_config: FetchConfig) -> Result<Self> {
        Ok(Self {
            fetcher: Fetcher::new(fetch_config)?,
        })
    }
}

#[async_trait]
impl FeedSource for RssFeedReader {
    async fn read(&self, url: &str, max_count: Option<usize>) -> Vec<FeedEntry> {
        let content = match self.fetcher.fetch_feed(url).await {
            Ok(content) => content,
            Err(e) => {
                warn!("Could not fetch feed {}: {}", url, e);
                return Vec::new();
            }
        };

        let mut entries = match FeedParser::parse_feed(&content, url) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Malformed feed {}: {}", url, e);
                return Vec::new();
            }
        };

        if let Some(max) = max_count {
            entries.truncate(max);
        }

        info!("Read {} entries from {}", entries.len(), url);
        entries
    }
}

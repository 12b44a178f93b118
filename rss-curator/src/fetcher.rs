use crate::types::{CuratorError, FetchConfig, Result};
use reqwest::Client;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Single-shot HTTP fetcher for feed documents.
///
/// Every request is bounded by the configured timeout; failed requests are not
/// retried.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout())
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        url::Url::parse(url)?;

        debug!("Fetching feed: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CuratorError::Timeout {
                    operation: format!("fetching {}", url),
                    seconds: self.config.timeout_seconds,
                }
            } else {
                CuratorError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Feed {} answered HTTP {}", url, status);
            return Err(CuratorError::General(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(CuratorError::General(format!("Feed too large: {}MB", size_mb)));
            }
        }

        let content = response.text().await?;
        info!(
            "Fetched feed {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }
}

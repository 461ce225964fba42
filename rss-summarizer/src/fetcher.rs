use crate::types::{FetchConfig, Result, SummarizerError};
use reqwest::{Client, Response};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Shared HTTP client for feed documents and article pages.
///
/// No retries: a failed request is reported once and the caller decides
/// what to skip.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    /// Download a feed document, enforcing the configured size limit.
    pub async fn fetch_feed_document(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let response = self
            .get(url)
            .await
            .map_err(|e| feed_fetch_error(url, e))?;

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(SummarizerError::FeedFetch {
                    url: url.to_string(),
                    reason: format!("Feed too large: {}MB", size_mb),
                });
            }
        }

        let content = response
            .text()
            .await
            .map_err(|e| feed_fetch_error(url, e.into()))?;

        info!(
            "Successfully fetched feed: {} ({} bytes in {}ms)",
            url,
            content.len(),
            start_time.elapsed().as_millis()
        );
        Ok(content)
    }

    /// Download an article page as text.
    pub async fn fetch_full_content(&self, url: &str) -> Result<String> {
        debug!("Fetching full content from: {}", url);

        let response = self.get(url).await?;
        let content = response.text().await?;
        Ok(content)
    }

    async fn get(&self, url: &str) -> Result<Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(SummarizerError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response)
    }
}

fn feed_fetch_error(url: &str, error: SummarizerError) -> SummarizerError {
    SummarizerError::FeedFetch {
        url: url.to_string(),
        reason: error.to_string(),
    }
}

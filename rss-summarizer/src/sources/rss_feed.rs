use crate::traits::FeedSource;
use crate::types::{FeedItem, Result};
use crate::{FeedParser, Fetcher};
use async_trait::async_trait;
use tracing::{error, info};

/// Feed source that downloads a feed over HTTP and parses it with [`FeedParser`].
pub struct RssFeedSource {
    fetcher: Fetcher,
}

impl RssFeedSource {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    async fn pull(&self, url: &str) -> Result<Vec<FeedItem>> {
        let content = self.fetcher.fetch_feed_document(url).await?;
        FeedParser::parse_feed(&content, url)
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_feed(&self, url: &str) -> Vec<FeedItem> {
        info!("Pulling RSS feed: {}", url);

        match self.pull(url).await {
            Ok(items) => {
                info!("Successfully pulled {} items from RSS feed {}", items.len(), url);
                items
            }
            Err(e) => {
                error!("Skipping feed {}: {}", url, e);
                Vec::new()
            }
        }
    }
}

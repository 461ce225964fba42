use crate::types::{FeedItem, Result, SummarizedFeedItem};
use async_trait::async_trait;

/// Source of feed items for a single feed URL.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch and parse the feed at `url`.
    ///
    /// Never fails: an unreachable or malformed feed yields no items and is
    /// logged by the implementation.
    async fn fetch_feed(&self, url: &str) -> Vec<FeedItem>;
}

/// Turns a feed item's linked page into readable Markdown text.
#[async_trait]
pub trait ArticleExtractor: Send + Sync {
    async fn extract(&self, item: &FeedItem) -> Result<String>;
}

/// Produces a one-sentence summary of article text.
#[async_trait]
pub trait Summarizer: Send + Sync {
    fn summarizer_name(&self) -> String;

    async fn summarize(&self, text: &str) -> Result<String>;
}

/// Durable per-item records plus the aggregate catalogue.
#[async_trait]
pub trait CatalogueStore: Send + Sync {
    /// Whether a record already exists under the item's storage key.
    async fn exists(&self, item: &FeedItem) -> Result<bool>;

    /// Write the record under its storage key, replacing any previous one.
    async fn put(&self, item: &SummarizedFeedItem) -> Result<()>;

    /// Rewrite the aggregate catalogue from every persisted record.
    /// Returns the number of records in the new catalogue.
    async fn rebuild_catalogue(&self) -> Result<usize>;
}

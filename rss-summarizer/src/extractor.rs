use crate::fetcher::Fetcher;
use crate::readable::extract_readable;
use crate::traits::ArticleExtractor;
use crate::types::{FeedItem, Result, SummarizerError};
use async_trait::async_trait;
use tracing::debug;
use url::Url;

/// Fetches an item's linked page and reduces it to readable Markdown.
pub struct HttpArticleExtractor {
    fetcher: Fetcher,
}

impl HttpArticleExtractor {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

fn extraction_error(link: &str, reason: impl ToString) -> SummarizerError {
    SummarizerError::Extraction {
        link: link.to_string(),
        reason: reason.to_string(),
    }
}

#[async_trait]
impl ArticleExtractor for HttpArticleExtractor {
    async fn extract(&self, item: &FeedItem) -> Result<String> {
        let link = item.link.trim();
        if link.is_empty() {
            return Err(extraction_error(link, format!("item \"{}\" has no link", item.title)));
        }
        let url = Url::parse(link).map_err(|e| extraction_error(link, e))?;

        let html = self
            .fetcher
            .fetch_full_content(url.as_str())
            .await
            .map_err(|e| extraction_error(link, e))?;
        debug!("Fetched {} bytes of HTML from {}", html.len(), link);

        let markdown = extract_readable(&html)
            .ok_or_else(|| extraction_error(link, "no readable content found"))?;

        debug!(
            "Extracted {} chars of Markdown for \"{}\"",
            markdown.len(),
            item.title
        );
        Ok(markdown)
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// One article as discovered in a feed.
///
/// Transient: produced by a [`crate::traits::FeedSource`] and consumed within
/// a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub feed_url: String,
    pub feed_title: String,
    pub link: String,
    /// Feed-native timestamp, kept as an opaque string.
    #[serde(rename = "pubDate")]
    pub publication_date: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

impl FeedItem {
    /// The feed-provided summary, if it carries any text.
    pub fn embedded_summary(&self) -> Option<&str> {
        self.summary
            .as_deref()
            .filter(|summary| !summary.trim().is_empty())
    }

    /// Promote this item to its persisted form, dropping the raw content.
    pub fn into_summarized(self, summary: String) -> SummarizedFeedItem {
        SummarizedFeedItem {
            feed_url: self.feed_url,
            feed_title: self.feed_title,
            link: self.link,
            publication_date: self.publication_date,
            title: self.title,
            summary,
            categories: self.categories,
        }
    }
}

/// The unit of persistence and the record shape read by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizedFeedItem {
    pub feed_url: String,
    pub feed_title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub publication_date: String,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "RSS-Summarizer/1.0".to_string(),
            timeout_seconds: 30,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

/// Everything a pipeline run needs, passed in at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of items processed concurrently per batch.
    pub batch_size: usize,
    /// Pause between consecutive batches; paces calls to the summarization API.
    pub batch_delay: Duration,
    pub catalogue_dir: PathBuf,
    pub catalogue_file_name: String,
    pub model: String,
    pub api_key: Option<String>,
    pub fetch: FetchConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_secs(1),
            catalogue_dir: PathBuf::from("assets/summaries"),
            catalogue_file_name: "catalogue.json".to_string(),
            model: "gemini-2.0-flash-lite".to_string(),
            api_key: None,
            fetch: FetchConfig::default(),
        }
    }
}

/// Counters describing what one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub feeds: usize,
    pub items: usize,
    pub already_present: usize,
    pub embedded_summaries: usize,
    pub generated_summaries: usize,
    pub failed: usize,
    pub catalogue_size: usize,
}

impl RunReport {
    pub fn persisted(&self) -> usize {
        self.embedded_summaries + self.generated_summaries
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    #[error("Failed to fetch feed {url}: {reason}")]
    FeedFetch { url: String, reason: String },

    #[error("Invalid feed item: missing {field}")]
    ItemValidation { field: &'static str },

    #[error("Extraction failed for {link}: {reason}")]
    Extraction { link: String, reason: String },

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("Store error at {path}: {reason}")]
    Store { path: PathBuf, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, SummarizerError>;

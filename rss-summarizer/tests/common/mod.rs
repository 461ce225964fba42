#![allow(dead_code)]

use async_trait::async_trait;
use rss_summarizer::{
    ArticleExtractor, FeedItem, FeedSource, FsCatalogueStore, PipelineBuilder, PipelineConfig, Result,
    Summarizer, SummarizerError, SummaryPipeline,
};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const PUB_DATE: &str = "Mon, 06 Jan 2025 10:00:00 +0000";

pub fn feed_item(feed_url: &str, title: &str, summary: Option<&str>) -> FeedItem {
    FeedItem {
        feed_url: feed_url.to_string(),
        feed_title: "Example News".to_string(),
        link: format!("https://news.example.com/{}", title.to_lowercase().replace(' ', "-")),
        publication_date: PUB_DATE.to_string(),
        title: title.to_string(),
        summary: summary.map(str::to_string),
        content: format!("<p>Raw feed body for {}</p>", title),
        categories: Some(vec!["news".to_string()]),
    }
}

/// Serves canned items per feed URL; unknown URLs behave like a broken feed.
#[derive(Default)]
pub struct StaticFeedSource {
    feeds: HashMap<String, Vec<FeedItem>>,
    pub calls: AtomicUsize,
}

impl StaticFeedSource {
    pub fn with_feed(mut self, url: &str, items: Vec<FeedItem>) -> Self {
        self.feeds.insert(url.to_string(), items);
        self
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn fetch_feed(&self, url: &str) -> Vec<FeedItem> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feeds.get(url).cloned().unwrap_or_default()
    }
}

/// Returns fixed article text, failing for chosen titles, and records how
/// many extractions overlapped.
#[derive(Default)]
pub struct FakeExtractor {
    failing_titles: HashSet<String>,
    delay: Duration,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeExtractor {
    pub fn failing_for(mut self, title: &str) -> Self {
        self.failing_titles.insert(title.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl ArticleExtractor for FakeExtractor {
    async fn extract(&self, item: &FeedItem) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_titles.contains(&item.title) {
            return Err(SummarizerError::Extraction {
                link: item.link.clone(),
                reason: "no readable content found".to_string(),
            });
        }
        Ok(format!("# {}\n\nArticle text about {}.", item.title, item.title))
    }
}

/// Deterministic summarizer that counts its invocations.
pub struct CountingSummarizer {
    reply: Option<String>,
    pub calls: AtomicUsize,
}

impl CountingSummarizer {
    pub fn new() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Summarizer for CountingSummarizer {
    fn summarizer_name(&self) -> String {
        "counting".to_string()
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .reply
            .clone()
            .unwrap_or_else(|| format!("An article of {} characters.", text.len())))
    }
}

pub fn test_config(dir: &Path) -> PipelineConfig {
    PipelineConfig {
        batch_size: 5,
        batch_delay: Duration::ZERO,
        catalogue_dir: dir.to_path_buf(),
        api_key: None,
        ..PipelineConfig::default()
    }
}

pub struct Harness {
    pub pipeline: SummaryPipeline,
    pub store: Arc<FsCatalogueStore>,
    pub feeds: Arc<StaticFeedSource>,
    pub extractor: Arc<FakeExtractor>,
    pub summarizer: Arc<CountingSummarizer>,
}

pub async fn harness(
    config: PipelineConfig,
    feeds: StaticFeedSource,
    extractor: FakeExtractor,
    summarizer: CountingSummarizer,
) -> Harness {
    let store = Arc::new(
        FsCatalogueStore::open(&config.catalogue_dir, config.catalogue_file_name.clone())
            .await
            .unwrap(),
    );
    let feeds = Arc::new(feeds);
    let extractor = Arc::new(extractor);
    let summarizer = Arc::new(summarizer);

    let pipeline = PipelineBuilder::new(config)
        .with_feed_source(feeds.clone())
        .with_extractor(extractor.clone())
        .with_summarizer(summarizer.clone())
        .with_store(store.clone())
        .build()
        .await
        .unwrap();

    Harness {
        pipeline,
        store,
        feeds,
        extractor,
        summarizer,
    }
}

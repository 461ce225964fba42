use crate::extractor::HttpArticleExtractor;
use crate::feed_list::load_feed_urls;
use crate::fetcher::Fetcher;
use crate::sources::RssFeedSource;
use crate::store::FsCatalogueStore;
use crate::summarizer::GeminiSummarizer;
use crate::traits::{ArticleExtractor, CatalogueStore, FeedSource, Summarizer};
use crate::types::{FeedItem, PipelineConfig, Result, RunReport, SummarizerError};
use futures::future::join_all;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Stages of one run. Runs only move forward; item failures never change
/// the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    ExtractUrls,
    FetchFeeds,
    BatchProcess,
    RebuildCatalogue,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::ExtractUrls => "extract-urls",
            RunStage::FetchFeeds => "fetch-feeds",
            RunStage::BatchProcess => "batch-process",
            RunStage::RebuildCatalogue => "rebuild-catalogue",
            RunStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    AlreadyPresent,
    Embedded,
    Generated,
}

/// Fetches feeds, summarizes new items in paced batches and rebuilds the
/// catalogue.
pub struct SummaryPipeline {
    config: PipelineConfig,
    feed_source: Arc<dyn FeedSource>,
    extractor: Arc<dyn ArticleExtractor>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn CatalogueStore>,
}

impl SummaryPipeline {
    pub fn new(
        config: PipelineConfig,
        feed_source: Arc<dyn FeedSource>,
        extractor: Arc<dyn ArticleExtractor>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn CatalogueStore>,
    ) -> Self {
        Self {
            config,
            feed_source,
            extractor,
            summarizer,
            store,
        }
    }

    /// Run starting from a feed-list document.
    ///
    /// An unreadable feed list is logged and treated as empty, so the
    /// catalogue is still rebuilt from what is already persisted.
    pub async fn run_from_feed_list(&self, feed_list: &Path) -> Result<RunReport> {
        info!(stage = %RunStage::ExtractUrls, "Extracting feed URLs from {}", feed_list.display());

        let feed_urls = match load_feed_urls(feed_list).await {
            Ok(urls) => urls,
            Err(e) => {
                error!("Failed to read feed list {}: {}", feed_list.display(), e);
                Vec::new()
            }
        };

        self.run(&feed_urls).await
    }

    /// Run the pipeline over `feed_urls`.
    ///
    /// Only a failure to rebuild the catalogue is returned as an error;
    /// feed and item failures are logged and counted.
    pub async fn run(&self, feed_urls: &[String]) -> Result<RunReport> {
        let mut report = RunReport {
            feeds: feed_urls.len(),
            ..RunReport::default()
        };

        info!(stage = %RunStage::FetchFeeds, "Fetching {} feeds", feed_urls.len());
        let items = self.fetch_all(feed_urls).await;
        report.items = items.len();

        info!(stage = %RunStage::BatchProcess, "Processing {} feed items", items.len());
        self.process_batches(&items, &mut report).await;

        info!(stage = %RunStage::RebuildCatalogue, "Rebuilding catalogue");
        report.catalogue_size = self.store.rebuild_catalogue().await?;

        info!(
            stage = %RunStage::Done,
            feeds = report.feeds,
            items = report.items,
            already_present = report.already_present,
            embedded = report.embedded_summaries,
            generated = report.generated_summaries,
            failed = report.failed,
            catalogue = report.catalogue_size,
            "Run complete"
        );
        Ok(report)
    }

    /// Fetch every feed concurrently and flatten the results.
    async fn fetch_all(&self, feed_urls: &[String]) -> Vec<FeedItem> {
        let fetches = feed_urls
            .iter()
            .map(|url| self.feed_source.fetch_feed(url));

        join_all(fetches).await.into_iter().flatten().collect()
    }

    /// Batches run one after another; items within a batch run concurrently.
    async fn process_batches(&self, items: &[FeedItem], report: &mut RunReport) {
        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<&[FeedItem]> = items.chunks(batch_size).collect();
        let total = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            info!(
                "Processing batch {} out of {} with {} items",
                index + 1,
                total,
                batch.len()
            );

            let outcomes = join_all(batch.iter().map(|item| async move {
                (item, self.process_item(item).await)
            }))
            .await;

            for (item, outcome) in outcomes {
                match outcome {
                    Ok(ItemOutcome::AlreadyPresent) => report.already_present += 1,
                    Ok(ItemOutcome::Embedded) => report.embedded_summaries += 1,
                    Ok(ItemOutcome::Generated) => report.generated_summaries += 1,
                    Err(e @ SummarizerError::Store { .. }) => {
                        report.failed += 1;
                        error!(title = %item.title, "Failed to persist summary: {}", e);
                    }
                    Err(e) => {
                        report.failed += 1;
                        warn!(title = %item.title, "Error summarizing article: {}", e);
                    }
                }
            }

            if index + 1 < total && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }
    }

    async fn process_item(&self, item: &FeedItem) -> Result<ItemOutcome> {
        if self.store.exists(item).await? {
            info!("Already have a summary of article: \"{}\"", item.title);
            return Ok(ItemOutcome::AlreadyPresent);
        }

        if let Some(summary) = item.embedded_summary() {
            let record = item.clone().into_summarized(summary.to_string());
            self.store.put(&record).await?;
            info!("Used existing summary of article: \"{}\"", item.title);
            return Ok(ItemOutcome::Embedded);
        }

        let text = self.extractor.extract(item).await?;
        let summary = self.summarizer.summarize(&text).await?;
        if summary.trim().is_empty() {
            return Err(SummarizerError::Summarization(format!(
                "{} returned an empty summary",
                self.summarizer.summarizer_name()
            )));
        }

        self.store.put(&item.clone().into_summarized(summary)).await?;
        info!("Summarized article: \"{}\"", item.title);
        Ok(ItemOutcome::Generated)
    }
}

/// Assembles a [`SummaryPipeline`], filling any component not supplied with
/// the production implementation derived from the config.
pub struct PipelineBuilder {
    config: PipelineConfig,
    feed_source: Option<Arc<dyn FeedSource>>,
    extractor: Option<Arc<dyn ArticleExtractor>>,
    summarizer: Option<Arc<dyn Summarizer>>,
    store: Option<Arc<dyn CatalogueStore>>,
}

impl PipelineBuilder {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            feed_source: None,
            extractor: None,
            summarizer: None,
            store: None,
        }
    }

    pub fn with_feed_source(mut self, feed_source: Arc<dyn FeedSource>) -> Self {
        self.feed_source = Some(feed_source);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn ArticleExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn CatalogueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fails if the HTTP client cannot be built or the catalogue directory
    /// cannot be created.
    pub async fn build(self) -> Result<SummaryPipeline> {
        let fetcher = Fetcher::new(self.config.fetch.clone())?;

        let feed_source: Arc<dyn FeedSource> = match self.feed_source {
            Some(source) => source,
            None => Arc::new(RssFeedSource::new(fetcher.clone())),
        };
        let extractor: Arc<dyn ArticleExtractor> = match self.extractor {
            Some(extractor) => extractor,
            None => Arc::new(HttpArticleExtractor::new(fetcher)),
        };
        let summarizer: Arc<dyn Summarizer> = match self.summarizer {
            Some(summarizer) => summarizer,
            None => {
                let summarizer = GeminiSummarizer::new(
                    self.config.api_key.clone(),
                    self.config.model.clone(),
                    &self.config.fetch,
                )?;
                info!("Using summarizer: {}", summarizer.summarizer_name());
                Arc::new(summarizer)
            }
        };
        let store: Arc<dyn CatalogueStore> = match self.store {
            Some(store) => store,
            None => Arc::new(
                FsCatalogueStore::open(&self.config.catalogue_dir, self.config.catalogue_file_name.clone())
                    .await?,
            ),
        };

        Ok(SummaryPipeline::new(
            self.config,
            feed_source,
            extractor,
            summarizer,
            store,
        ))
    }
}

pub mod types;
pub mod traits;
pub mod fetcher;
pub mod parser;
pub mod feed_list;
pub mod readable;
pub mod extractor;
pub mod summarizer;
pub mod store;
pub mod sources;
pub mod pipeline;

pub use types::*;
pub use traits::{ArticleExtractor, CatalogueStore, FeedSource, Summarizer};
pub use fetcher::Fetcher;
pub use parser::FeedParser;
pub use feed_list::{load_feed_urls, parse_feed_list};
pub use extractor::HttpArticleExtractor;
pub use summarizer::GeminiSummarizer;
pub use store::{storage_key, FsCatalogueStore};
pub use sources::RssFeedSource;
pub use pipeline::{PipelineBuilder, RunStage, SummaryPipeline};

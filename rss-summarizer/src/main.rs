use anyhow::Context;
use clap::Parser;
use rss_summarizer::{FetchConfig, PipelineBuilder, PipelineConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Summarize every article of the feeds in a feed list and rebuild the catalogue.
#[derive(Debug, Parser)]
#[command(name = "summarize-feeds", version)]
struct Args {
    /// OPML document (or plain list, one URL per line) naming the feeds
    #[arg(long)]
    feed: PathBuf,

    /// Directory holding per-item summaries and the catalogue
    #[arg(long, env = "SUMMARIES_DIR", default_value = "assets/summaries")]
    catalogue_dir: PathBuf,

    #[arg(long, default_value = "catalogue.json")]
    catalogue_file: String,

    /// Items processed concurrently per batch
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Pause between batches, in milliseconds
    #[arg(long, default_value_t = 1000)]
    batch_delay_ms: u64,

    #[arg(long, env = "SUMMARIZER_MODEL", default_value = "gemini-2.0-flash-lite")]
    model: String,

    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!("Starting feed summarizer");

    if args.api_key.is_none() {
        warn!("GOOGLE_API_KEY is not set; only items with embedded summaries can be processed");
    }

    let config = PipelineConfig {
        batch_size: args.batch_size,
        batch_delay: Duration::from_millis(args.batch_delay_ms),
        catalogue_dir: args.catalogue_dir,
        catalogue_file_name: args.catalogue_file,
        model: args.model,
        api_key: args.api_key,
        fetch: FetchConfig::default(),
    };

    let pipeline = PipelineBuilder::new(config)
        .build()
        .await
        .context("Failed to initialise pipeline")?;

    let report = pipeline
        .run_from_feed_list(&args.feed)
        .await
        .context("Failed to rebuild catalogue")?;

    info!(
        "Feed summarizer finished: {} new summaries, {} already present, {} failed, {} in catalogue",
        report.persisted(),
        report.already_present,
        report.failed,
        report.catalogue_size
    );
    Ok(())
}

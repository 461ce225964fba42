mod common;

use common::*;
use rss_summarizer::{CatalogueStore, PipelineConfig};
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tempfile::TempDir;

const FEED_URL: &str = "https://feeds.example.com/rss";

#[tokio::test]
async fn test_end_to_end_embedded_and_generated_summaries() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let feeds = StaticFeedSource::default().with_feed(
        FEED_URL,
        vec![
            feed_item(FEED_URL, "Alpha", Some("A.")),
            feed_item(FEED_URL, "Beta", None),
        ],
    );
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;

    let report = h.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();

    assert_eq!(report.feeds, 1);
    assert_eq!(report.items, 2);
    assert_eq!(report.embedded_summaries, 1);
    assert_eq!(report.generated_summaries, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.catalogue_size, 2);

    let catalogue = h.store.load_catalogue().await.unwrap();
    assert_eq!(catalogue.len(), 2);
    assert_eq!(catalogue[0].title, "Alpha");
    assert_eq!(catalogue[0].summary, "A.");
    assert_eq!(catalogue[1].title, "Beta");
    assert!(!catalogue[1].summary.is_empty());

    // Only the item without an embedded summary reached the extractor and model.
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_persisted_records_drop_content() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let feeds = StaticFeedSource::default()
        .with_feed(FEED_URL, vec![feed_item(FEED_URL, "Alpha", None)]);
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;

    h.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();

    let raw = std::fs::read_to_string(h.store.record_path("Alpha", PUB_DATE)).unwrap();
    let record: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(record.get("content").is_none());
    assert_eq!(record["pubDate"], PUB_DATE);
    assert!(!record["summary"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let feeds = StaticFeedSource::default().with_feed(
        FEED_URL,
        vec![
            feed_item(FEED_URL, "Alpha", Some("A.")),
            feed_item(FEED_URL, "Beta", None),
            feed_item(FEED_URL, "Gamma", None),
        ],
    );
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;
    let urls = vec![FEED_URL.to_string()];

    h.pipeline.run(&urls).await.unwrap();
    let first_catalogue = std::fs::read(h.store.catalogue_path()).unwrap();
    let extractions = h.extractor.calls.load(Ordering::SeqCst);
    let summaries = h.summarizer.calls.load(Ordering::SeqCst);

    let second = h.pipeline.run(&urls).await.unwrap();
    let second_catalogue = std::fs::read(h.store.catalogue_path()).unwrap();

    assert_eq!(second.already_present, 3);
    assert_eq!(second.persisted(), 0);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), extractions);
    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), summaries);
    assert_eq!(first_catalogue, second_catalogue);
}

#[tokio::test]
async fn test_embedded_summary_is_used_verbatim() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let embedded = "  Already summarized, kept exactly as published.  ";

    let feeds = StaticFeedSource::default()
        .with_feed(FEED_URL, vec![feed_item(FEED_URL, "Alpha", Some(embedded))]);
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;

    h.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();

    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.extractor.calls.load(Ordering::SeqCst), 0);
    let catalogue = h.store.load_catalogue().await.unwrap();
    assert_eq!(catalogue[0].summary, embedded);
}

#[tokio::test]
async fn test_blank_embedded_summary_is_regenerated() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let feeds = StaticFeedSource::default()
        .with_feed(FEED_URL, vec![feed_item(FEED_URL, "Alpha", Some("   "))]);
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default(),
        CountingSummarizer::replying("A generated sentence."),
    )
    .await;

    h.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();

    assert_eq!(h.summarizer.calls.load(Ordering::SeqCst), 1);
    let catalogue = h.store.load_catalogue().await.unwrap();
    assert_eq!(catalogue[0].summary, "A generated sentence.");
}

#[tokio::test]
async fn test_failed_extraction_only_drops_that_item() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let feeds = StaticFeedSource::default().with_feed(
        FEED_URL,
        vec![
            feed_item(FEED_URL, "Alpha", None),
            feed_item(FEED_URL, "Broken", None),
            feed_item(FEED_URL, "Gamma", None),
        ],
    );
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default().failing_for("Broken"),
        CountingSummarizer::new(),
    )
    .await;

    let report = h.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.generated_summaries, 2);
    assert!(!h.store.record_path("Broken", PUB_DATE).exists());

    let titles: Vec<String> = h
        .store
        .load_catalogue()
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.title)
        .collect();
    assert_eq!(titles, vec!["Alpha", "Gamma"]);
}

#[tokio::test]
async fn test_failed_item_is_retried_on_next_run() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let items = vec![feed_item(FEED_URL, "Flaky", None)];

    let first = harness(
        test_config(dir.path()),
        StaticFeedSource::default().with_feed(FEED_URL, items.clone()),
        FakeExtractor::default().failing_for("Flaky"),
        CountingSummarizer::new(),
    )
    .await;
    let report = first.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.catalogue_size, 0);

    let second = harness(
        test_config(dir.path()),
        StaticFeedSource::default().with_feed(FEED_URL, items),
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;
    let report = second.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();
    assert_eq!(report.generated_summaries, 1);
    assert_eq!(report.catalogue_size, 1);
}

#[tokio::test]
async fn test_empty_generated_summary_is_a_failure() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let feeds = StaticFeedSource::default()
        .with_feed(FEED_URL, vec![feed_item(FEED_URL, "Alpha", None)]);
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default(),
        CountingSummarizer::replying(" "),
    )
    .await;

    let report = h.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.catalogue_size, 0);
    assert!(!h.store.record_path("Alpha", PUB_DATE).exists());
}

#[tokio::test]
async fn test_broken_feed_does_not_abort_run() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let feeds = StaticFeedSource::default()
        .with_feed(FEED_URL, vec![feed_item(FEED_URL, "Alpha", Some("A."))]);
    let h = harness(
        test_config(dir.path()),
        feeds,
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;

    let urls = vec![
        "https://unreachable.example.com/rss".to_string(),
        FEED_URL.to_string(),
    ];
    let report = h.pipeline.run(&urls).await.unwrap();

    assert_eq!(h.feeds.calls.load(Ordering::SeqCst), 2);
    assert_eq!(report.feeds, 2);
    assert_eq!(report.items, 1);
    assert_eq!(report.catalogue_size, 1);
}

#[tokio::test]
async fn test_batches_bound_concurrency_and_are_paced() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let items: Vec<_> = (0..5)
        .map(|i| feed_item(FEED_URL, &format!("Story {}", i), None))
        .collect();
    let config = PipelineConfig {
        batch_size: 2,
        batch_delay: Duration::from_millis(60),
        ..test_config(dir.path())
    };
    let h = harness(
        config,
        StaticFeedSource::default().with_feed(FEED_URL, items),
        FakeExtractor::default().with_delay(Duration::from_millis(10)),
        CountingSummarizer::new(),
    )
    .await;

    let started = Instant::now();
    let report = h.pipeline.run(&[FEED_URL.to_string()]).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.generated_summaries, 5);
    // Three batches means two pauses; none after the last batch.
    assert!(elapsed >= Duration::from_millis(120), "elapsed {:?}", elapsed);
    let max_in_flight = h.extractor.max_in_flight.load(Ordering::SeqCst);
    assert!((1..=2).contains(&max_in_flight), "max in flight {}", max_in_flight);
}

#[tokio::test]
async fn test_missing_feed_list_still_rebuilds_catalogue() {
    init_tracing();
    let dir = TempDir::new().unwrap();

    let h = harness(
        test_config(dir.path()),
        StaticFeedSource::default(),
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;
    h.store
        .put(&feed_item(FEED_URL, "Alpha", None).into_summarized("A.".to_string()))
        .await
        .unwrap();

    let report = h
        .pipeline
        .run_from_feed_list(&dir.path().join("does-not-exist.opml"))
        .await
        .unwrap();

    assert_eq!(report.feeds, 0);
    assert_eq!(report.catalogue_size, 1);
    assert!(h.store.catalogue_path().exists());
}

#[tokio::test]
async fn test_run_from_opml_feed_list() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let opml_path = dir.path().join("feeds.opml");
    std::fs::write(
        &opml_path,
        format!(
            r#"<?xml version="1.0"?>
<opml version="2.0"><body>
  <outline text="News" xmlUrl="{}"/>
</body></opml>"#,
            FEED_URL
        ),
    )
    .unwrap();

    let store_dir = dir.path().join("summaries");
    let h = harness(
        test_config(&store_dir),
        StaticFeedSource::default().with_feed(FEED_URL, vec![feed_item(FEED_URL, "Alpha", Some("A."))]),
        FakeExtractor::default(),
        CountingSummarizer::new(),
    )
    .await;

    let report = h.pipeline.run_from_feed_list(&opml_path).await.unwrap();

    assert_eq!(report.feeds, 1);
    assert_eq!(report.catalogue_size, 1);
}

//! Two-level discovery against a fake bucket

use std::sync::Arc;
use std::time::Duration;
use vision_sync::crawler::{
    BucketListingCrawler, DiscoveryError, KeyPattern, ListingError, SegmentGlob,
};
use vision_sync::fetcher::{RetryPolicy, RetryingFetcher, Transport};
use vision_sync::ledger::FailureLedger;

use crate::support::transport::MockTransport;
use crate::support::vision::{listing_xml, FakeVision, BASE};

const ROOT: &str = "data/spot/daily/klines/";
const PATTERN: &str = "data/spot/daily/klines/SYMBOL/1m/";

fn crawler(transport: Arc<dyn Transport>, ledger: Arc<FailureLedger>) -> BucketListingCrawler {
    let policy = RetryPolicy::new().with_backoff_unit(Duration::from_millis(10));
    BucketListingCrawler::new(RetryingFetcher::new(transport, policy, ledger), BASE)
}

fn temp_ledger(dir: &tempfile::TempDir) -> Arc<FailureLedger> {
    Arc::new(FailureLedger::new(dir.path().join("discovery.failed")))
}

#[tokio::test(start_paused = true)]
async fn test_glob_selects_segments_and_expands_urls() {
    let dir = tempfile::TempDir::new().unwrap();
    let transport = FakeVision::new()
        .dirs(ROOT, &["BTCUSDT", "ETHUSDT", "BTCBUSD"])
        .archives(
            "data/spot/daily/klines/BTCUSDT/1m/",
            &["BTCUSDT-1m-2024-01-01.zip", "BTCUSDT-1m-2024-01-02.zip"],
        )
        .archives("data/spot/daily/klines/BTCBUSD/1m/", &["BTCBUSD-1m-2024-01-01.zip"])
        .archives("data/spot/daily/klines/ETHUSDT/1m/", &["ETHUSDT-1m-2024-01-01.zip"])
        .into_transport();

    let discovery = crawler(transport.clone(), temp_ledger(&dir))
        .discover(
            &KeyPattern::parse(PATTERN).unwrap(),
            &SegmentGlob::new("BTC*").unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        discovery.urls,
        vec![
            format!("{BASE}/data/spot/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-01-01.zip"),
            format!("{BASE}/data/spot/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-01-02.zip"),
            format!("{BASE}/data/spot/daily/klines/BTCBUSD/1m/BTCBUSD-1m-2024-01-01.zip"),
        ]
    );
    assert_eq!(discovery.report.total_segments, 3);
    assert_eq!(discovery.report.matched_segments, 2);
    assert!(discovery.report.failed_prefixes.is_empty());
    // ETHUSDT never listed
    assert_eq!(transport.calls_containing("ETHUSDT"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_pagination_issues_one_request_per_page() {
    let dir = tempfile::TempDir::new().unwrap();
    let prefix = "data/futures/um/monthly/trades/BTCUSDT/";
    let page = |n: usize| format!("{prefix}BTCUSDT-trades-2024-{n:02}.zip");

    // Page 1 carries an explicit marker, page 2 relies on its last key
    let transport = FakeVision::new()
        .page(
            prefix,
            None,
            listing_xml(prefix, &[], &[page(1)], true, Some(&page(1))),
        )
        .page(
            prefix,
            Some(&page(1)),
            listing_xml(prefix, &[], &[page(2), format!("{}.CHECKSUM", page(2))], true, None),
        )
        .page(
            prefix,
            Some(&format!("{}.CHECKSUM", page(2))),
            listing_xml(prefix, &[], &[page(3)], false, None),
        )
        .into_transport();

    let entries = crawler(transport.clone(), temp_ledger(&dir))
        .list_prefix(prefix)
        .await
        .unwrap();

    assert_eq!(
        entries,
        vec![
            "BTCUSDT-trades-2024-01.zip",
            "BTCUSDT-trades-2024-02.zip",
            "BTCUSDT-trades-2024-03.zip"
        ]
    );
    assert_eq!(transport.calls_containing("https://bucket.test/"), 3);
}

#[tokio::test(start_paused = true)]
async fn test_truncated_page_without_marker_ends_listing() {
    let dir = tempfile::TempDir::new().unwrap();
    let prefix = "data/spot/monthly/klines/";
    let transport = FakeVision::new()
        .page(
            prefix,
            None,
            listing_xml(prefix, &[format!("{prefix}BTCUSDT/")], &[], true, None),
        )
        .into_transport();

    let entries = crawler(transport.clone(), temp_ledger(&dir))
        .list_prefix(prefix)
        .await
        .unwrap();

    assert_eq!(entries, vec!["BTCUSDT"]);
    assert_eq!(transport.calls_containing("https://bucket.test/"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_marker_ends_listing() {
    let dir = tempfile::TempDir::new().unwrap();
    let prefix = "p/";
    let key = "p/a.zip".to_string();
    let transport = FakeVision::new()
        .page(prefix, None, listing_xml(prefix, &[], &[key.clone()], true, None))
        .page(prefix, Some("p/a.zip"), listing_xml(prefix, &[], &[key], true, None))
        .into_transport();

    let entries = crawler(transport.clone(), temp_ledger(&dir))
        .list_prefix(prefix)
        .await
        .unwrap();

    assert_eq!(entries, vec!["a.zip", "a.zip"]);
    assert_eq!(transport.calls_containing("https://bucket.test/"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failing_sub_prefix_does_not_abort_siblings() {
    let dir = tempfile::TempDir::new().unwrap();
    let ledger = temp_ledger(&dir);
    let transport = FakeVision::new()
        .dirs(ROOT, &["BTCUSDT", "BTCBUSD"])
        .failing_listing("data/spot/daily/klines/BTCUSDT/1m/")
        .archives("data/spot/daily/klines/BTCBUSD/1m/", &["BTCBUSD-1m-2024-01-01.zip"])
        .into_transport();

    let discovery = crawler(transport, ledger.clone())
        .discover(
            &KeyPattern::parse(PATTERN).unwrap(),
            &SegmentGlob::new("BTC*").unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        discovery.urls,
        vec![format!("{BASE}/data/spot/daily/klines/BTCBUSD/1m/BTCBUSD-1m-2024-01-01.zip")]
    );
    assert_eq!(
        discovery.report.failed_prefixes,
        vec!["data/spot/daily/klines/BTCUSDT/1m/"]
    );
    // The exhausted listing request is in the ledger
    let entries = ledger.entries().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].contains("BTCUSDT"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_bucket_url_fails_that_prefix_only() {
    let dir = tempfile::TempDir::new().unwrap();
    let fake = FakeVision::new()
        .dirs(ROOT, &["BTCUSDT"])
        .without_bucket_url("data/spot/daily/klines/BTCUSDT/1m/");
    let transport = fake.clone().into_transport();

    let c = crawler(transport, temp_ledger(&dir));
    let err = c
        .list_prefix("data/spot/daily/klines/BTCUSDT/1m/")
        .await
        .unwrap_err();
    assert!(matches!(err, ListingError::MissingBucketUrl(_)));

    let discovery = c
        .discover(
            &KeyPattern::parse(PATTERN).unwrap(),
            &SegmentGlob::new("*").unwrap(),
        )
        .await
        .unwrap();
    assert!(discovery.urls.is_empty());
    assert_eq!(discovery.report.failed_prefixes.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_root_listing_failure_fails_discovery() {
    let dir = tempfile::TempDir::new().unwrap();
    let transport = FakeVision::new().without_bucket_url(ROOT).into_transport();

    let result = crawler(transport, temp_ledger(&dir))
        .discover(
            &KeyPattern::parse(PATTERN).unwrap(),
            &SegmentGlob::new("*").unwrap(),
        )
        .await;

    match result {
        Err(DiscoveryError::RootListing { prefix, source }) => {
            assert_eq!(prefix, ROOT);
            assert!(matches!(source, ListingError::MissingBucketUrl(_)));
        }
        other => panic!("expected root listing failure, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sub_prefix_listings_respect_concurrency_limit() {
    let dir = tempfile::TempDir::new().unwrap();
    let symbols: Vec<String> = (0..20).map(|i| format!("SYM{i:02}USDT")).collect();
    let symbol_refs: Vec<&str> = symbols.iter().map(String::as_str).collect();

    let mut fake = FakeVision::new().dirs(ROOT, &symbol_refs);
    for symbol in &symbols {
        let prefix = format!("{ROOT}{symbol}/1m/");
        let name = format!("{symbol}-1m-2024-01-01.zip");
        fake = fake.archives(&prefix, &[name.as_str()]);
    }
    let transport = Arc::new(
        MockTransport::new(move |url, _| fake.respond(url)).with_delay(Duration::from_millis(20)),
    );

    let c = crawler(transport.clone(), temp_ledger(&dir)).with_max_concurrency(3);
    let discovery = c
        .discover(
            &KeyPattern::parse(PATTERN).unwrap(),
            &SegmentGlob::new("SYM*").unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(discovery.urls.len(), 20);
    assert_eq!(c.gate().peak(), 3);
    assert!(transport.peak() <= 3);
    // Output follows segment order regardless of completion order
    assert!(discovery.urls[0].contains("SYM00USDT"));
    assert!(discovery.urls[19].contains("SYM19USDT"));
}

//! Bucket listing crawler
//!
//! Discovery runs in two levels. The pattern's fixed prefix is listed to find
//! candidate segment values (one per dataset, e.g. a trading pair); the ones
//! matching the segment glob are then listed to completion, each behind the
//! admission gate, and their archive entries expanded into absolute URLs.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vision_sync::crawler::{BucketListingCrawler, KeyPattern, SegmentGlob};
//! use vision_sync::fetcher::{ReqwestTransport, RetryPolicy, RetryingFetcher};
//! use vision_sync::ledger::FailureLedger;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let ledger = Arc::new(FailureLedger::new("klines.failed"));
//! let fetcher = RetryingFetcher::new(Arc::new(ReqwestTransport::new()?), RetryPolicy::default(), ledger);
//! let crawler = BucketListingCrawler::new(fetcher, "https://data.binance.vision");
//!
//! let pattern = KeyPattern::parse("data/spot/daily/klines/SYMBOL/1m/")?;
//! let discovery = crawler.discover(&pattern, &SegmentGlob::new("BTC*")?).await?;
//! println!("{} urls", discovery.urls.len());
//! # Ok(())
//! # }
//! ```

pub mod bucket;
pub mod listing;
pub mod pattern;

use futures::future::join_all;
use metrics::counter;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::downloader::config::{CONTENT_EXTENSION, DEFAULT_DISCOVERY_CONCURRENCY, MAX_LISTING_PAGES};
use crate::fetcher::{RetryingFetcher, Unavailable};
use crate::gate::{AdmissionGate, GateClosed};
use crate::metrics::record_gate_peak;

pub use bucket::{extract_bucket_url, resolve_bucket_url};
pub use listing::{listing_request_url, ListingPage};
pub use pattern::{KeyPattern, PatternError, SegmentGlob, PLACEHOLDER};

/// Errors listing a single prefix
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    /// Bootstrap page or a listing page could not be fetched
    #[error(transparent)]
    Unavailable(#[from] Unavailable),

    /// Bootstrap page did not embed a backend endpoint
    #[error("bootstrap page for prefix '{0}' has no BUCKET_URL")]
    MissingBucketUrl(String),

    /// Listing root element carried no namespace
    #[error("listing document root has no namespace")]
    MissingNamespace,

    /// Listing document was not well-formed
    #[error("malformed listing document: {0}")]
    Xml(String),

    /// Base or backend URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Gate(#[from] GateClosed),
}

/// Errors failing a whole discovery run
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The pattern's fixed prefix could not be listed
    #[error("failed to list segments under '{prefix}': {source}")]
    RootListing {
        prefix: String,
        #[source]
        source: ListingError,
    },
}

/// Summary of one discovery run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub pattern: String,
    pub symbol_glob: String,
    /// Segments found under the fixed prefix
    pub total_segments: usize,
    /// Segments accepted by the glob
    pub matched_segments: usize,
    /// Sub-prefixes whose listing failed and were skipped
    pub failed_prefixes: Vec<String>,
    pub urls: usize,
    /// Manifest the URLs were written to, once written
    pub manifest: Option<PathBuf>,
}

/// URLs found by a discovery run, in segment then listing order
#[derive(Debug, Clone)]
pub struct Discovery {
    pub urls: Vec<String>,
    pub report: DiscoveryReport,
}

/// Two-level bucket listing crawler
#[derive(Clone)]
pub struct BucketListingCrawler {
    fetcher: RetryingFetcher,
    base_url: String,
    gate: AdmissionGate,
    extension: String,
}

impl BucketListingCrawler {
    /// Crawler against `base_url` with the default concurrency and `.zip` filter
    pub fn new(fetcher: RetryingFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            gate: AdmissionGate::new(DEFAULT_DISCOVERY_CONCURRENCY),
            extension: CONTENT_EXTENSION.to_string(),
        }
    }

    /// Bound concurrent sub-prefix listings
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.gate = AdmissionGate::new(limit);
        self
    }

    /// Extension content keys must carry to be kept
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Gate bounding sub-prefix listings
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Public base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve the backend for `prefix`, then list it to completion
    pub async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, ListingError> {
        let bucket_url = resolve_bucket_url(&self.fetcher, &self.base_url, prefix).await?;
        self.list_bucket_prefix(&bucket_url, prefix).await
    }

    /// Follow the pagination chain of `prefix` on a known backend
    ///
    /// Stops when a page is not truncated or no new continuation marker can
    /// be derived; both end the listing normally.
    pub async fn list_bucket_prefix(
        &self,
        bucket_url: &str,
        prefix: &str,
    ) -> Result<Vec<String>, ListingError> {
        let mut entries = Vec::new();
        let mut marker: Option<String> = None;

        for page_number in 1..=MAX_LISTING_PAGES {
            let url = listing_request_url(bucket_url, prefix, marker.as_deref())?;
            let body = self.fetcher.fetch_text(url.as_str()).await?;
            let page = ListingPage::parse(&body)?;
            counter!("listing_pages_total").increment(1);

            let found = page.entries(prefix, &self.extension);
            debug!(prefix = %prefix, page = page_number, entries = found.len(), "Parsed listing page");
            entries.extend(found);

            if !page.is_truncated {
                return Ok(entries);
            }
            match page.continuation_token() {
                None => {
                    debug!(prefix = %prefix, "Truncated page without continuation marker, listing ends here");
                    return Ok(entries);
                }
                Some(token) if marker.as_deref() == Some(token) => {
                    warn!(prefix = %prefix, marker = %token, "Continuation marker did not advance, listing ends here");
                    return Ok(entries);
                }
                Some(token) => marker = Some(token.to_string()),
            }
        }

        warn!(prefix = %prefix, pages = MAX_LISTING_PAGES, "Listing page limit reached");
        Ok(entries)
    }

    /// Discover every archive URL for `pattern` whose segment matches `glob`
    ///
    /// A failing sub-prefix is logged and reported in
    /// [`DiscoveryReport::failed_prefixes`]; only a failure to list the fixed
    /// prefix fails the run.
    pub async fn discover(
        &self,
        pattern: &KeyPattern,
        glob: &SegmentGlob,
    ) -> Result<Discovery, DiscoveryError> {
        let span = info_span!("discover", pattern = %pattern, glob = %glob);
        self.discover_inner(pattern, glob).instrument(span).await
    }

    async fn discover_inner(
        &self,
        pattern: &KeyPattern,
        glob: &SegmentGlob,
    ) -> Result<Discovery, DiscoveryError> {
        let root = pattern.prefix();
        let segments = self
            .list_prefix(root)
            .await
            .map_err(|source| DiscoveryError::RootListing {
                prefix: root.to_string(),
                source,
            })?;

        let matched: Vec<&String> = segments.iter().filter(|s| glob.matches(s)).collect();
        info!(
            matched = matched.len(),
            total = segments.len(),
            "Matched segments"
        );

        let listings = matched.iter().map(|segment| {
            let sub_prefix = pattern.expand(segment);
            async move {
                let result = self.list_sub_prefix(&sub_prefix).await;
                (sub_prefix, result)
            }
        });
        let results = join_all(listings).await;
        record_gate_peak("discovery", &self.gate);

        let mut urls = Vec::new();
        let mut failed_prefixes = Vec::new();
        for (sub_prefix, result) in results {
            match result {
                Ok(found) => urls.extend(found),
                Err(e) => {
                    error!(prefix = %sub_prefix, error = %e, "Sub-prefix listing failed, skipping");
                    failed_prefixes.push(sub_prefix);
                }
            }
        }

        info!(
            urls = urls.len(),
            failed_prefixes = failed_prefixes.len(),
            "Discovery complete"
        );

        let report = DiscoveryReport {
            pattern: pattern.to_string(),
            symbol_glob: glob.to_string(),
            total_segments: segments.len(),
            matched_segments: matched.len(),
            failed_prefixes,
            urls: urls.len(),
            manifest: None,
        };
        Ok(Discovery { urls, report })
    }

    async fn list_sub_prefix(&self, sub_prefix: &str) -> Result<Vec<String>, ListingError> {
        let _permit = self.gate.admit().await?;
        info!(prefix = %sub_prefix, "Listing sub-prefix");

        let entries = self.list_prefix(sub_prefix).await?;
        Ok(entries
            .into_iter()
            .map(|entry| format!("{}/{}{}", self.base_url, sub_prefix, entry))
            .collect())
    }
}

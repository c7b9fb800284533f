//! # vision-sync
//!
//! Bulk mirroring of the archives published on `https://data.binance.vision`.
//!
//! The host exposes no list API. Its objects are enumerated through an S3-style
//! bucket listing whose backend endpoint is embedded in the site's HTML, then
//! downloaded in bulk with bounded parallelism, exponential-backoff retry,
//! sentinel-based resumability and an append-only failure ledger.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use vision_sync::catalog::{manifest_path, write_manifest};
//! use vision_sync::crawler::{BucketListingCrawler, KeyPattern, SegmentGlob};
//! use vision_sync::downloader::DownloadExecutor;
//! use vision_sync::fetcher::{ReqwestTransport, RetryPolicy, RetryingFetcher, Transport};
//! use vision_sync::ledger::FailureLedger;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport: Arc<dyn Transport> = Arc::new(ReqwestTransport::new()?);
//! let pattern = "data/futures/um/monthly/klines/SYMBOL/1h/";
//! let manifest = manifest_path(Path::new("."), pattern, "BTC*");
//!
//! // 1. Discover
//! let ledger = Arc::new(FailureLedger::new("discovery.failed"));
//! let fetcher = RetryingFetcher::new(transport.clone(), RetryPolicy::default(), ledger);
//! let crawler = BucketListingCrawler::new(fetcher, "https://data.binance.vision");
//! let discovery = crawler
//!     .discover(&KeyPattern::parse(pattern)?, &SegmentGlob::new("BTC*")?)
//!     .await?;
//! write_manifest(&manifest, &discovery.urls).await?;
//!
//! // 2. Download
//! let report = DownloadExecutor::new(transport, RetryPolicy::for_downloads())
//!     .execute(&manifest)
//!     .await?;
//! assert_eq!(report.total, discovery.urls.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Transport seam and the retrying fetcher shared by both phases
//! - [`crawler`] - Bucket-host resolution, listing pages and two-level discovery
//! - [`catalog`] - Manifest naming, writing and reading
//! - [`downloader`] - Concurrent manifest downloads, checksums and progress
//! - [`output`] - Artifact paths, completion markers and atomic writes
//! - [`ledger`] - Append-only failure ledger
//! - [`gate`] - Counting admission gate bounding in-flight requests
//! - [`metrics`] - Prometheus exporter

#![warn(clippy::all)]

/// URL manifests
pub mod catalog;

/// CLI command implementations
pub mod cli;

/// Bucket listing crawler
pub mod crawler;

/// Manifest download orchestration
pub mod downloader;

/// HTTP fetching with retry
pub mod fetcher;

/// Admission gate
pub mod gate;

/// Failure ledger
pub mod ledger;

/// Metrics collection and export
pub mod metrics;

/// Local artifact output
pub mod output;

pub use crawler::{BucketListingCrawler, KeyPattern, SegmentGlob};
pub use downloader::{DownloadExecutor, DownloadReport};
pub use fetcher::{RetryPolicy, RetryingFetcher, Transport, TransportError};
pub use gate::AdmissionGate;
pub use ledger::FailureLedger;

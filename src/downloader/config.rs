//! Default tuning constants shared by discovery and download

use std::time::Duration;

/// Public file host serving both the bootstrap page and the archives
pub const DEFAULT_BASE_URL: &str = "https://data.binance.vision";

/// Attempts per logical GET (initial request included)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Backoff unit in milliseconds; attempt `n` waits `unit * 2^n`
pub const DEFAULT_BACKOFF_UNIT_MS: u64 = 1000;

/// Per-attempt timeout in seconds for bootstrap pages and listings
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 10;

/// Per-attempt timeout in seconds for archive and checksum downloads
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// TCP connect timeout for the HTTP client
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Concurrent sub-prefix listings during discovery
pub const DEFAULT_DISCOVERY_CONCURRENCY: usize = 5;

/// Concurrent file downloads
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 10;

/// Upper bound accepted on the command line for either gate
pub const MAX_CONCURRENCY: usize = 64;

/// Bucket listing page size requested from the backend
pub const LISTING_PAGE_SIZE: u32 = 1000;

/// Hard stop for a single prefix's pagination chain
pub const MAX_LISTING_PAGES: usize = 100_000;

/// Extension of the data objects worth downloading
pub const CONTENT_EXTENSION: &str = ".zip";

/// Default backoff unit as a [`Duration`]
pub fn default_backoff_unit() -> Duration {
    Duration::from_millis(DEFAULT_BACKOFF_UNIT_MS)
}

/// Default per-attempt timeout as a [`Duration`]
pub fn default_attempt_timeout() -> Duration {
    Duration::from_secs(DEFAULT_ATTEMPT_TIMEOUT_SECS)
}

/// Default per-attempt download timeout as a [`Duration`]
pub fn default_download_timeout() -> Duration {
    Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS)
}

//! Archive checksum verification
//!
//! Every archive on the host has a sibling `<archive>.CHECKSUM` holding its
//! SHA-256 as `"<hex>  <file name>"`.

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::fetcher::RetryingFetcher;

/// Checksum URL for an archive URL
pub fn checksum_url(archive_url: &str) -> String {
    format!("{archive_url}.CHECKSUM")
}

/// First whitespace-separated token, lowercased
pub fn parse_checksum(contents: &str) -> Option<String> {
    contents
        .split_whitespace()
        .next()
        .map(str::to_lowercase)
}

/// Lowercase hex SHA-256 of `data`
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Result of checking one body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumOutcome {
    Verified,
    Mismatch { expected: String, actual: String },
    /// Checksum file could not be fetched; the fetcher recorded its URL
    Unavailable,
    /// Checksum file held no hash
    Malformed,
}

/// Fetch the checksum for `url` and compare it with `body`
pub async fn verify(fetcher: &RetryingFetcher, url: &str, body: &[u8]) -> ChecksumOutcome {
    let checksum_url = checksum_url(url);
    let expected = match fetcher.fetch_text(&checksum_url).await {
        Ok(text) => match parse_checksum(&text) {
            Some(hash) => hash,
            None => return ChecksumOutcome::Malformed,
        },
        Err(_) => return ChecksumOutcome::Unavailable,
    };

    let actual = compute_sha256(body);
    if actual == expected {
        debug!(url = %url, "Checksum verified");
        ChecksumOutcome::Verified
    } else {
        ChecksumOutcome::Mismatch { expected, actual }
    }
}

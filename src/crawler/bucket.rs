//! Backend host resolution
//!
//! The public host does not answer listing requests itself. Its HTML index
//! page embeds the object-store endpoint as `var BUCKET_URL = '...';`, which
//! is the only place the crawler depends on how the site is hosted.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::ListingError;
use crate::fetcher::RetryingFetcher;

static BUCKET_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"var BUCKET_URL = '(.*?)';").expect("bucket URL pattern is valid")
});

/// Bootstrap page URL for `prefix` (`<base>/?prefix=<prefix>`)
pub fn bootstrap_url(base_url: &str, prefix: &str) -> Result<Url, ListingError> {
    let mut url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;
    url.query_pairs_mut().append_pair("prefix", prefix);
    Ok(url)
}

/// Extract the embedded backend endpoint from a bootstrap page
pub fn extract_bucket_url(html: &str) -> Option<&str> {
    BUCKET_URL_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|value| !value.is_empty())
}

/// Fetch the bootstrap page for `prefix` and return the backend endpoint
pub async fn resolve_bucket_url(
    fetcher: &RetryingFetcher,
    base_url: &str,
    prefix: &str,
) -> Result<String, ListingError> {
    let url = bootstrap_url(base_url, prefix)?;
    let html = fetcher.fetch_text(url.as_str()).await?;

    let bucket = extract_bucket_url(&html)
        .ok_or_else(|| ListingError::MissingBucketUrl(prefix.to_string()))?;
    debug!(prefix = %prefix, bucket = %bucket, "Resolved bucket endpoint");
    Ok(bucket.to_string())
}

//! Fake Binance Vision host: bootstrap page, bucket listings and archives

use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use url::Url;

use super::transport::{MockTransport, Reply};

pub const BASE: &str = "https://vision.test";
pub const BUCKET: &str = "https://bucket.test/vision";
pub const S3_NS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

pub fn bootstrap_html(bucket: &str) -> String {
    format!(
        "<html><head><script>\nvar BUCKET_NAME = 'vision';\nvar BUCKET_URL = '{bucket}';\n</script></head></html>"
    )
}

/// One `ListBucketResult` page
pub fn listing_xml(
    prefix: &str,
    common_prefixes: &[String],
    keys: &[String],
    truncated: bool,
    next_marker: Option<&str>,
) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><ListBucketResult xmlns="{S3_NS}"><Name>vision</Name><Prefix>{prefix}</Prefix><MaxKeys>1000</MaxKeys><Delimiter>/</Delimiter><IsTruncated>{truncated}</IsTruncated>"#
    );
    if let Some(marker) = next_marker {
        xml.push_str(&format!("<NextMarker>{marker}</NextMarker>"));
    }
    for key in keys {
        xml.push_str(&format!(
            "<Contents><Key>{key}</Key><LastModified>2024-01-02T00:00:00.000Z</LastModified><Size>42</Size></Contents>"
        ));
    }
    for common in common_prefixes {
        xml.push_str(&format!("<CommonPrefixes><Prefix>{common}</Prefix></CommonPrefixes>"));
    }
    xml.push_str("</ListBucketResult>");
    xml
}

/// Scriptable fake of the public host and its bucket backend
#[derive(Default, Clone)]
pub struct FakeVision {
    listings: HashMap<(String, Option<String>), String>,
    no_bucket_url: HashSet<String>,
    failing: HashSet<String>,
    files: HashMap<String, Bytes>,
}

impl FakeVision {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw listing page answered for `prefix` at `marker`
    pub fn page(mut self, prefix: &str, marker: Option<&str>, xml: String) -> Self {
        self.listings
            .insert((prefix.to_string(), marker.map(str::to_string)), xml);
        self
    }

    /// Single-page listing of sub-directories under `prefix`
    pub fn dirs(self, prefix: &str, segments: &[&str]) -> Self {
        let commons: Vec<String> = segments.iter().map(|s| format!("{prefix}{s}/")).collect();
        let xml = listing_xml(prefix, &commons, &[], false, None);
        self.page(prefix, None, xml)
    }

    /// Single-page listing of archives under `prefix`; each archive and its
    /// `.CHECKSUM` sibling are listed, and the archive body is served
    pub fn archives(mut self, prefix: &str, names: &[&str]) -> Self {
        let mut keys = Vec::new();
        for name in names {
            keys.push(format!("{prefix}{name}"));
            keys.push(format!("{prefix}{name}.CHECKSUM"));
            self.files.insert(
                format!("{BASE}/{prefix}{name}"),
                Bytes::from(format!("archive {name}")),
            );
        }
        let xml = listing_xml(prefix, &[], &keys, false, None);
        self.page(prefix, None, xml)
    }

    /// Bootstrap page for `prefix` lacks the bucket assignment
    pub fn without_bucket_url(mut self, prefix: &str) -> Self {
        self.no_bucket_url.insert(prefix.to_string());
        self
    }

    /// Every listing request for `prefix` answers 500
    pub fn failing_listing(mut self, prefix: &str) -> Self {
        self.failing.insert(prefix.to_string());
        self
    }

    pub fn file(mut self, url: &str, body: impl Into<Bytes>) -> Self {
        self.files.insert(url.to_string(), body.into());
        self
    }

    pub fn respond(&self, url: &str) -> Reply {
        let Ok(parsed) = Url::parse(url) else {
            return Reply::Status(400);
        };
        let query: HashMap<String, String> = parsed.query_pairs().into_owned().collect();

        if url.starts_with(&format!("{BASE}/?")) {
            let prefix = query.get("prefix").cloned().unwrap_or_default();
            if self.no_bucket_url.contains(&prefix) {
                return Reply::text("<html>maintenance</html>");
            }
            return Reply::text(bootstrap_html(BUCKET));
        }

        if url.starts_with(BUCKET) {
            let prefix = query.get("prefix").cloned().unwrap_or_default();
            if self.failing.contains(&prefix) {
                return Reply::Status(500);
            }
            let marker = query.get("marker").cloned();
            return match self.listings.get(&(prefix, marker)) {
                Some(xml) => Reply::text(xml.clone()),
                None => Reply::Status(404),
            };
        }

        match self.files.get(url) {
            Some(body) => Reply::Body(body.clone()),
            None => Reply::Status(404),
        }
    }

    pub fn into_transport(self) -> Arc<MockTransport> {
        Arc::new(MockTransport::new(move |url, _| self.respond(url)))
    }
}

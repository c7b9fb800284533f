//! Bucket listing pages
//!
//! The backend answers `?delimiter=/&prefix=..` requests with an S3-style
//! `ListBucketResult` document. Element names are matched within the root
//! element's namespace; anything in another namespace is ignored.

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use url::Url;

use super::ListingError;
use crate::downloader::config::LISTING_PAGE_SIZE;

const COMMON_PREFIX: &[&[u8]] = &[b"CommonPrefixes", b"Prefix"];
const CONTENT_KEY: &[&[u8]] = &[b"Contents", b"Key"];
const IS_TRUNCATED: &[&[u8]] = &[b"IsTruncated"];
const NEXT_MARKER: &[&[u8]] = &[b"NextMarker"];

/// One parsed listing response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Full `CommonPrefixes/Prefix` values in document order
    pub common_prefixes: Vec<String>,
    /// Full `Contents/Key` values in document order
    pub keys: Vec<String>,
    /// `IsTruncated` compared case-insensitively with `true`
    pub is_truncated: bool,
    /// `NextMarker`, when present
    pub next_marker: Option<String>,
}

impl ListingPage {
    /// Parse one listing document
    pub fn parse(xml: &str) -> Result<Self, ListingError> {
        let mut reader = NsReader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut root_ns: Option<Vec<u8>> = None;
        let mut path: Vec<Vec<u8>> = Vec::new();
        let mut text = String::new();
        let mut page = ListingPage::default();

        loop {
            match reader.read_resolved_event() {
                Ok((ns, Event::Start(e))) => {
                    let name = scoped_name(&mut root_ns, &ns, e.local_name().as_ref())?;
                    path.push(name);
                    text.clear();
                }
                Ok((ns, Event::Empty(e))) => {
                    scoped_name(&mut root_ns, &ns, e.local_name().as_ref())?;
                }
                Ok((_, Event::Text(t))) => {
                    let unescaped = t.unescape().map_err(|e| ListingError::Xml(e.to_string()))?;
                    text.push_str(&unescaped);
                }
                Ok((_, Event::CData(c))) => {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
                Ok((_, Event::End(_))) => {
                    page.absorb(&path, text.trim());
                    path.pop();
                    text.clear();
                }
                Ok((_, Event::Eof)) => break,
                Ok(_) => {}
                Err(e) => return Err(ListingError::Xml(e.to_string())),
            }
        }

        if root_ns.is_none() {
            return Err(ListingError::Xml("document has no root element".to_string()));
        }
        Ok(page)
    }

    fn absorb(&mut self, path: &[Vec<u8>], text: &str) {
        if tail_is(path, COMMON_PREFIX) {
            if !text.is_empty() {
                self.common_prefixes.push(text.to_string());
            }
        } else if tail_is(path, CONTENT_KEY) {
            if !text.is_empty() {
                self.keys.push(text.to_string());
            }
        } else if tail_is(path, IS_TRUNCATED) {
            self.is_truncated = text.eq_ignore_ascii_case("true");
        } else if tail_is(path, NEXT_MARKER) && !text.is_empty() {
            self.next_marker = Some(text.to_string());
        }
    }

    /// Marker for the next request: `NextMarker`, else the last key of any kind
    pub fn continuation_token(&self) -> Option<&str> {
        self.next_marker
            .as_deref()
            .or_else(|| self.keys.last().map(String::as_str))
    }

    /// Trailing segments below `prefix`
    ///
    /// Common prefixes lose the request prefix and surrounding `/`; content
    /// keys lose the request prefix and are kept only when they end with
    /// `extension`. Entries outside `prefix` or empty after stripping are
    /// dropped.
    pub fn entries(&self, prefix: &str, extension: &str) -> Vec<String> {
        let dirs = self
            .common_prefixes
            .iter()
            .filter_map(|p| p.strip_prefix(prefix))
            .map(|rest| rest.trim_matches('/'))
            .filter(|rest| !rest.is_empty())
            .map(str::to_owned);

        let files = self
            .keys
            .iter()
            .filter(|key| key.ends_with(extension))
            .filter_map(|key| key.strip_prefix(prefix))
            .filter(|rest| !rest.is_empty())
            .map(str::to_owned);

        dirs.chain(files).collect()
    }
}

/// Listing request URL for one page
pub fn listing_request_url(
    bucket_url: &str,
    prefix: &str,
    marker: Option<&str>,
) -> Result<Url, ListingError> {
    let mut url = Url::parse(bucket_url)?;
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("delimiter", "/")
            .append_pair("prefix", prefix)
            .append_pair("max-keys", &LISTING_PAGE_SIZE.to_string());
        if let Some(marker) = marker {
            query.append_pair("marker", marker);
        }
    }
    Ok(url)
}

fn scoped_name(
    root_ns: &mut Option<Vec<u8>>,
    resolved: &ResolveResult<'_>,
    local: &[u8],
) -> Result<Vec<u8>, ListingError> {
    let ns = match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(*ns),
        _ => None,
    };
    let Some(root) = root_ns.as_deref() else {
        let ns = ns.ok_or(ListingError::MissingNamespace)?;
        *root_ns = Some(ns.to_vec());
        return Ok(local.to_vec());
    };
    if ns == Some(root) {
        Ok(local.to_vec())
    } else {
        // Foreign namespace: keep the depth, never match
        Ok(Vec::new())
    }
}

fn tail_is(path: &[Vec<u8>], tail: &[&[u8]]) -> bool {
    path.len() >= tail.len()
        && path[path.len() - tail.len()..]
            .iter()
            .zip(tail)
            .all(|(seen, want)| seen.as_slice() == *want)
}

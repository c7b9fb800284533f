//! HTTP fetching with retry and failure accounting
//!
//! [`Transport`] is the single seam to the network: one GET, one body or one
//! error. [`RetryingFetcher`] layers the retry budget, exponential backoff and
//! failure-ledger bookkeeping on top and is shared by the crawler (listing
//! pages) and the downloader (archive bodies).

use async_trait::async_trait;
use bytes::Bytes;

pub mod http;
pub mod retry;
pub mod retry_formatter;

pub use http::ReqwestTransport;
pub use retry::{RetryPolicy, RetryingFetcher, Unavailable};

/// Errors from a single GET attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Non-2xx response
    #[error("HTTP status {0}")]
    Status(u16),

    /// Attempt exceeded its timeout
    #[error("request timed out")]
    Timeout,

    /// Connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// Any other network or body read failure
    #[error("network error: {0}")]
    Network(String),
}

/// One HTTP GET against a remote host
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`, returning the raw body of a 2xx response
    async fn get(&self, url: &str) -> Result<Bytes, TransportError>;
}

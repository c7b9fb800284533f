//! reqwest-backed [`Transport`]

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{Transport, TransportError};
use crate::downloader::config::HTTP_CONNECT_TIMEOUT_SECS;

/// Transport over a shared [`reqwest::Client`]
///
/// Per-attempt timeouts are enforced by the retrying fetcher, so the client
/// only carries a connect timeout.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with the default client configuration
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(HTTP_CONNECT_TIMEOUT_SECS))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        debug!(url = %url, bytes = body.len(), "GET succeeded");
        Ok(body)
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else if let Some(status) = err.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Network(err.to_string())
    }
}

//! Retrying GET with exponential backoff
//!
//! One logical fetch makes up to `max_attempts` GETs. Every failure (network
//! error, non-2xx status, per-attempt timeout) is logged, then followed by a
//! `backoff_unit * 2^attempt` wait before the next attempt. When the budget is
//! spent the URL goes to the failure ledger and the caller receives
//! [`Unavailable`] instead of a transport error.

use bytes::Bytes;
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

use super::retry_formatter::RetryContext;
use super::{Transport, TransportError};
use crate::downloader::config::{
    default_attempt_timeout, default_backoff_unit, default_download_timeout, DEFAULT_MAX_ATTEMPTS,
};
use crate::ledger::FailureLedger;

/// Retry budget and timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per fetch (minimum 1)
    pub max_attempts: u32,
    /// Base backoff; attempt `n` (0-based) waits `backoff_unit * 2^n`
    pub backoff_unit: Duration,
    /// Timeout applied to each attempt individually
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_unit: default_backoff_unit(),
            attempt_timeout: default_attempt_timeout(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff unit.
    pub fn with_backoff_unit(mut self, backoff_unit: Duration) -> Self {
        self.backoff_unit = backoff_unit;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// Wait after the failed attempt `attempt` (0-based)
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.backoff_unit.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Defaults with the longer timeout used for whole archive bodies
    pub fn for_downloads() -> Self {
        Self::default().with_attempt_timeout(default_download_timeout())
    }
}

/// Every attempt for a URL failed; the URL has been written to the ledger
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{url} unavailable after {attempts} attempts: {last_error}")]
pub struct Unavailable {
    /// URL that could not be fetched
    pub url: String,
    /// Attempts made
    pub attempts: u32,
    /// Error from the final attempt
    pub last_error: TransportError,
}

/// GET with a fixed retry budget, backoff and failure accounting
#[derive(Clone)]
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    ledger: Arc<FailureLedger>,
}

impl RetryingFetcher {
    /// Create a fetcher recording exhausted URLs in `ledger`
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: RetryPolicy,
        ledger: Arc<FailureLedger>,
    ) -> Self {
        Self {
            transport,
            policy,
            ledger,
        }
    }

    /// Retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Ledger receiving exhausted URLs
    pub fn ledger(&self) -> &Arc<FailureLedger> {
        &self.ledger
    }

    /// Fetch the raw body of `url`
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, Unavailable> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_error = TransportError::Network("no attempt made".to_string());

        for attempt in 0..max_attempts {
            counter!("http_requests_total").increment(1);
            let started = Instant::now();

            let outcome =
                match tokio::time::timeout(self.policy.attempt_timeout, self.transport.get(url))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout),
                };
            histogram!("http_request_duration_seconds").record(started.elapsed().as_secs_f64());

            match outcome {
                Ok(body) => {
                    if attempt > 0 {
                        debug!(url = %url, attempt = attempt + 1, "Request succeeded after retry");
                    }
                    return Ok(body);
                }
                Err(err) => {
                    let backoff =
                        (attempt + 1 < max_attempts).then(|| self.policy.backoff_for(attempt));
                    let ctx = RetryContext::new(attempt + 1, max_attempts, &err, backoff, url);
                    warn!(
                        url = %url,
                        attempt = attempt + 1,
                        max_attempts = max_attempts,
                        "{}",
                        ctx.format_retry()
                    );
                    last_error = err;

                    if let Some(delay) = backoff {
                        counter!("http_retries_total").increment(1);
                        histogram!("retry_backoff_duration_seconds").record(delay.as_secs_f64());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        let ctx = RetryContext::new(max_attempts, max_attempts, &last_error, None, url);
        error!(url = %url, "{}", ctx.format_failure());
        counter!("fetch_unavailable_total").increment(1);
        self.ledger.record(url).await;

        Err(Unavailable {
            url: url.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }

    /// Fetch `url` as UTF-8 text (invalid sequences are replaced)
    pub async fn fetch_text(&self, url: &str) -> Result<String, Unavailable> {
        let body = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

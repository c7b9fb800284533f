//! Retry message formatting
//!
//! Classifies failed attempts and renders the per-attempt and final-failure
//! log lines emitted by [`super::RetryingFetcher`].

use std::time::Duration;

use super::TransportError;

/// Classification of retry errors for user messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Attempt exceeded its timeout
    NetworkTimeout,
    /// Connection refused, DNS failure, or other offline scenarios
    NetworkOffline,
    /// HTTP 5xx server error
    ServerError(u16),
    /// HTTP 4xx client error
    ClientError(u16),
    /// Generic fallback when no better classification fits
    NetworkGeneric,
}

impl RetryErrorType {
    /// User-friendly description string used inside retry log messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::ClientError(code) => match code {
                403 => "access denied",
                404 => "object not found",
                429 => "rate limit exceeded",
                _ => "client error",
            },
            Self::NetworkGeneric => "network error",
        }
    }
}

/// Map a transport error onto a [`RetryErrorType`]
pub fn classify(err: &TransportError) -> RetryErrorType {
    match err {
        TransportError::Timeout => RetryErrorType::NetworkTimeout,
        TransportError::Connect(_) => RetryErrorType::NetworkOffline,
        TransportError::Status(code) if (500..600).contains(code) => {
            RetryErrorType::ServerError(*code)
        }
        TransportError::Status(code) if (400..500).contains(code) => {
            RetryErrorType::ClientError(*code)
        }
        TransportError::Status(_) | TransportError::Network(_) => RetryErrorType::NetworkGeneric,
    }
}

/// Context for formatting retry messages.
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Type of error that triggered retry
    pub error_type: RetryErrorType,
    /// Wait before the next attempt; `None` once the budget is spent
    pub backoff: Option<Duration>,
    /// URL that failed
    pub url: String,
    /// Original error message for details
    pub error_message: String,
}

impl RetryContext {
    /// Build the context for one failed attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        err: &TransportError,
        backoff: Option<Duration>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type: classify(err),
            backoff,
            url: url.into(),
            error_message: err.to_string(),
        }
    }

    /// Format the per-attempt message
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Attempt {}/{} failed for {}: {} ({})",
            self.attempt,
            self.max_attempts,
            self.url,
            self.error_type.description(),
            self.error_message
        );
        if let Some(backoff) = self.backoff {
            message.push_str(&format!(
                " - retrying in {:.1} seconds",
                backoff.as_secs_f64()
            ));
        }
        message
    }

    /// Format the final failure summary
    pub fn format_failure(&self) -> String {
        format!(
            "Failed to fetch {} after {} attempts: {}",
            self.url, self.max_attempts, self.error_message
        )
    }
}

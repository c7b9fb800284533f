//! CLI error types and conversions

use std::path::PathBuf;

use crate::catalog::CatalogError;
use crate::crawler::{DiscoveryError, PatternError};
use crate::downloader::DownloadError;
use crate::fetcher::TransportError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Pattern or glob rejected
    #[error("pattern error: {0}")]
    PatternError(#[from] PatternError),

    /// Discovery failed
    #[error("discovery error: {0}")]
    DiscoveryError(#[from] DiscoveryError),

    /// Manifest could not be written
    #[error("catalog error: {0}")]
    CatalogError(#[from] CatalogError),

    /// Download failed
    #[error("download error: {0}")]
    DownloadError(#[from] DownloadError),

    /// HTTP client could not be built
    #[error("transport error: {0}")]
    TransportError(#[from] TransportError),

    /// Failure ledger could not be prepared
    #[error("failed to reset ledger {path}: {source}")]
    LedgerError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(String),
}

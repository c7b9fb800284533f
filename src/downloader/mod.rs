//! Manifest downloads
//!
//! [`executor::DownloadExecutor`] takes a manifest written by discovery and
//! brings every URL in it onto local disk:
//!
//! 1. **Skip**: entries whose artifact or `.done` marker exists cost nothing
//! 2. **Fetch**: the rest go through the retrying fetcher behind the gate
//! 3. **Persist**: bodies are written atomically, then marked done
//! 4. **Settle**: once every entry has finished, the manifest is deleted if
//!    nothing landed in the failure ledger
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use vision_sync::downloader::DownloadExecutor;
//! use vision_sync::fetcher::{ReqwestTransport, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let executor = DownloadExecutor::new(Arc::new(ReqwestTransport::new()?), RetryPolicy::for_downloads())
//!     .with_output_root("./vision")
//!     .with_max_concurrency(10);
//! let report = executor.execute(Path::new("data_spot_daily_klines_SYMBOL_1m_$BTC*.txt")).await?;
//! println!("{} downloaded, {} failed", report.downloaded, report.failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Remote failures never surface as errors: they end up in the ledger and
//! keep the manifest alive for the next run. Only local problems (manifest
//! unreadable, artifact not writable) fail [`DownloadExecutor::execute`].

use std::path::PathBuf;

pub mod checksum;
pub mod config;
pub mod executor;
pub mod progress;

pub use executor::{DownloadExecutor, DownloadReport};
pub use progress::{BatchProgress, ItemOutcome};

use crate::catalog::CatalogError;
use crate::gate::GateClosed;
use crate::output::OutputError;

/// Errors failing a download run
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Manifest could not be read or removed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Artifact could not be checked or written
    #[error(transparent)]
    Output(#[from] OutputError),

    /// Other local IO failure
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Gate(#[from] GateClosed),
}

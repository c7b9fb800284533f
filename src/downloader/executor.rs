//! Concurrent manifest download executor

use futures::future::join_all;
use metrics::counter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::checksum::{self, ChecksumOutcome};
use super::config::{CONTENT_EXTENSION, DEFAULT_DOWNLOAD_CONCURRENCY};
use super::progress::{BatchProgress, ItemOutcome};
use super::DownloadError;
use crate::catalog::{read_manifest, remove_manifest};
use crate::fetcher::{RetryPolicy, RetryingFetcher, Transport};
use crate::gate::AdmissionGate;
use crate::ledger::FailureLedger;
use crate::metrics::record_gate_peak;
use crate::output::LocalArtifact;

/// Summary of one manifest run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadReport {
    pub manifest: PathBuf,
    pub total: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub failed: usize,
    /// Whether the manifest was deleted as fully satisfied
    pub manifest_removed: bool,
    /// Ledger holding this run's failures, when there were any
    pub ledger: Option<PathBuf>,
}

/// Downloads every URL of a manifest with bounded concurrency
#[derive(Clone)]
pub struct DownloadExecutor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    output_root: PathBuf,
    gate: AdmissionGate,
    verify_checksum: bool,
    show_progress: bool,
}

impl DownloadExecutor {
    /// Executor writing below the current directory, 10 downloads at a time
    ///
    /// `policy` applies to whole archive bodies; see
    /// [`RetryPolicy::for_downloads`].
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            output_root: PathBuf::from("."),
            gate: AdmissionGate::new(DEFAULT_DOWNLOAD_CONCURRENCY),
            verify_checksum: false,
            show_progress: false,
        }
    }

    /// Root directory artifacts are mirrored under
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Bound simultaneous downloads
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.gate = AdmissionGate::new(limit);
        self
    }

    /// Check each archive against its published SHA-256 before persisting
    pub fn with_checksum_verification(mut self, enabled: bool) -> Self {
        self.verify_checksum = enabled;
        self
    }

    /// Draw a terminal progress bar
    pub fn with_progress_bar(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    /// Gate bounding downloads
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Download every entry of `manifest`
    ///
    /// The ledger `<manifest>.failed` is cleared first and collects this
    /// run's failures. All entries finish before the manifest is deleted (no
    /// failures) or kept (any failure).
    pub async fn execute(&self, manifest: &Path) -> Result<DownloadReport, DownloadError> {
        let span = info_span!("download", manifest = %manifest.display());
        self.execute_inner(manifest).instrument(span).await
    }

    async fn execute_inner(&self, manifest: &Path) -> Result<DownloadReport, DownloadError> {
        let urls = read_manifest(manifest).await?;
        info!(total = urls.len(), "Loaded manifest");

        let ledger = Arc::new(FailureLedger::for_catalog(manifest));
        ledger.reset().await.map_err(|source| DownloadError::Io {
            path: ledger.path().to_path_buf(),
            source,
        })?;
        let fetcher = RetryingFetcher::new(self.transport.clone(), self.policy.clone(), ledger.clone());

        let mut progress = BatchProgress::new(urls.len());
        if self.show_progress {
            progress = progress.with_bar(format!("Downloading {}", manifest.display()));
        }

        let results = join_all(
            urls.iter()
                .map(|url| self.process_one(&fetcher, url, &progress)),
        )
        .await;
        progress.finish();
        record_gate_peak("download", &self.gate);

        // Local failures are fatal, but only surface after the join
        for result in results {
            result?;
        }

        let manifest_removed = if ledger.has_failures() {
            warn!(
                failures = ledger.recorded(),
                ledger = %ledger.path().display(),
                "Batch incomplete, keeping manifest"
            );
            false
        } else {
            remove_manifest(manifest).await?;
            info!("All entries present, removed manifest");
            true
        };

        info!("{}", progress.format_progress());
        Ok(DownloadReport {
            manifest: manifest.to_path_buf(),
            total: urls.len(),
            skipped: progress.skipped(),
            downloaded: progress.downloaded(),
            failed: progress.failed(),
            manifest_removed,
            ledger: (!manifest_removed).then(|| ledger.path().to_path_buf()),
        })
    }

    async fn process_one(
        &self,
        fetcher: &RetryingFetcher,
        url: &str,
        progress: &BatchProgress,
    ) -> Result<(), DownloadError> {
        let result = self.fetch_one(fetcher, url).await;
        let outcome = match &result {
            Ok(outcome) => *outcome,
            Err(e) => {
                error!(url = %url, error = %e, "Local failure while processing entry");
                ItemOutcome::Failed
            }
        };

        match outcome {
            ItemOutcome::Skipped => counter!("downloads_skipped_total").increment(1),
            ItemOutcome::Downloaded => counter!("downloads_completed_total").increment(1),
            ItemOutcome::Failed => counter!("downloads_failed_total").increment(1),
        }
        progress.record(outcome);
        result.map(|_| ())
    }

    async fn fetch_one(
        &self,
        fetcher: &RetryingFetcher,
        url: &str,
    ) -> Result<ItemOutcome, DownloadError> {
        let artifact = match LocalArtifact::for_url(&self.output_root, url) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(url = %url, error = %e, "Rejecting manifest entry");
                fetcher.ledger().record(url).await;
                return Ok(ItemOutcome::Failed);
            }
        };

        if artifact.is_complete().await? {
            debug!(url = %url, "Already present, skipping");
            return Ok(ItemOutcome::Skipped);
        }

        let _permit = self.gate.admit().await?;

        let Ok(body) = fetcher.fetch_bytes(url).await else {
            return Ok(ItemOutcome::Failed);
        };

        if self.verify_checksum && url.ends_with(CONTENT_EXTENSION) {
            match checksum::verify(fetcher, url, &body).await {
                ChecksumOutcome::Verified => {}
                ChecksumOutcome::Unavailable => {
                    warn!(url = %url, "Checksum unavailable, not persisting");
                    fetcher.ledger().record(url).await;
                    return Ok(ItemOutcome::Failed);
                }
                ChecksumOutcome::Malformed => {
                    warn!(url = %url, "Checksum file is empty, not persisting");
                    fetcher.ledger().record(url).await;
                    return Ok(ItemOutcome::Failed);
                }
                ChecksumOutcome::Mismatch { expected, actual } => {
                    error!(url = %url, expected = %expected, actual = %actual, "Checksum mismatch");
                    fetcher.ledger().record(url).await;
                    return Ok(ItemOutcome::Failed);
                }
            }
        }

        artifact.persist(body).await?;
        info!(url = %url, path = %artifact.path().display(), "Downloaded");
        Ok(ItemOutcome::Downloaded)
    }
}

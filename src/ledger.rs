//! Failure ledger (append-only record of unavailable URLs)
//!
//! Every URL that exhausts its retry budget is appended to a plain-text ledger
//! named after the manifest or catalog it belongs to (`<catalog>.failed`).
//! Appends from concurrent tasks are serialised in-process by a mutex and
//! across processes by an exclusive `fd-lock` on the ledger file, so every
//! record lands as one whole line.

use fd_lock::RwLock;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Suffix appended to a manifest path to name its download ledger
pub const LEDGER_SUFFIX: &str = ".failed";

/// Suffix appended to a manifest path to name the ledger of the discovery
/// run that produced it
pub const DISCOVERY_LEDGER_SUFFIX: &str = ".discovery.failed";

/// Download ledger path associated with a manifest file
pub fn ledger_path_for(catalog: &Path) -> PathBuf {
    with_suffix(catalog, LEDGER_SUFFIX)
}

/// Discovery ledger path associated with a manifest file
pub fn discovery_ledger_path_for(catalog: &Path) -> PathBuf {
    with_suffix(catalog, DISCOVERY_LEDGER_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Append-only failure ledger
#[derive(Debug)]
pub struct FailureLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
    recorded: AtomicUsize,
}

impl FailureLedger {
    /// Create a ledger writing to `path`. The file is created on first record.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            recorded: AtomicUsize::new(0),
        }
    }

    /// Create the ledger associated with a catalog or manifest file
    pub fn for_catalog(catalog: &Path) -> Self {
        Self::new(ledger_path_for(catalog))
    }

    /// Ledger file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records appended through this handle
    pub fn recorded(&self) -> usize {
        self.recorded.load(Ordering::SeqCst)
    }

    /// Whether any record was appended through this handle
    pub fn has_failures(&self) -> bool {
        self.recorded() > 0
    }

    /// Append one URL.
    ///
    /// The in-memory count is bumped before the write so callers deciding on
    /// batch success see the failure even if the ledger file cannot be written.
    pub async fn record(&self, url: &str) {
        self.recorded.fetch_add(1, Ordering::SeqCst);

        let _guard = self.write_lock.lock().await;
        let path = self.path.clone();
        let line = format!("{url}\n");

        match tokio::task::spawn_blocking(move || append_line(&path, &line)).await {
            Ok(Ok(())) => debug!(url = %url, ledger = %self.path.display(), "Recorded failure"),
            Ok(Err(e)) => error!(
                url = %url,
                ledger = %self.path.display(),
                error = %e,
                "Failed to append to failure ledger"
            ),
            Err(e) => error!(url = %url, error = %e, "Failure ledger writer panicked"),
        }
    }

    /// Remove any ledger left by a previous run and reset the counter
    pub async fn reset(&self) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;
        self.recorded.store(0, Ordering::SeqCst);
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(ledger = %self.path.display(), "Removed stale failure ledger");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Read back every recorded URL. A missing ledger reads as empty.
    pub async fn entries(&self) -> std::io::Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut lock = RwLock::new(file);
    let mut guard = lock.write()?;
    guard.write_all(line.as_bytes())?;
    guard.flush()
}

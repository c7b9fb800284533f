//! URL manifests
//!
//! Discovery writes its URLs to a manifest named after the pattern and glob
//! (`data/spot/daily/klines/SYMBOL/1m/` + `BTC*` gives
//! `data_spot_daily_klines_SYMBOL_1m_$BTC*.txt`), so repeating a discovery
//! overwrites the same file. The downloader reads it back and deletes it once
//! every URL is on disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::output::atomic_write;

/// Extension of manifest files
pub const MANIFEST_EXTENSION: &str = "txt";

/// Manifest errors (always local I/O)
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove manifest {path}: {source}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Deterministic manifest file name for a pattern and glob
pub fn manifest_file_name(pattern: &str, symbol_glob: &str) -> String {
    format!(
        "{}${}.{}",
        pattern.replace('/', "_"),
        symbol_glob,
        MANIFEST_EXTENSION
    )
}

/// Manifest path below `dir`
pub fn manifest_path(dir: &Path, pattern: &str, symbol_glob: &str) -> PathBuf {
    dir.join(manifest_file_name(pattern, symbol_glob))
}

/// Overwrite `path` with one URL per line, in the given order
pub async fn write_manifest(path: &Path, urls: &[String]) -> Result<(), CatalogError> {
    let mut contents = String::with_capacity(urls.iter().map(|u| u.len() + 1).sum());
    for url in urls {
        contents.push_str(url);
        contents.push('\n');
    }

    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || atomic_write(&target, contents.as_bytes()))
        .await
        .map_err(std::io::Error::other)
        .and_then(|r| r)
        .map_err(|source| CatalogError::Write {
            path: path.to_path_buf(),
            source,
        })?;

    info!(path = %path.display(), urls = urls.len(), "Wrote manifest");
    Ok(())
}

/// Read a manifest, trimming lines and dropping empty ones
///
/// A missing manifest is an error: the caller asked for a batch that is not
/// there.
pub async fn read_manifest(path: &Path) -> Result<Vec<String>, CatalogError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let urls: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();
    debug!(path = %path.display(), urls = urls.len(), "Read manifest");
    Ok(urls)
}

/// Delete a satisfied manifest. Already gone counts as removed.
pub async fn remove_manifest(path: &Path) -> Result<(), CatalogError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CatalogError::Remove {
            path: path.to_path_buf(),
            source,
        }),
    }
}

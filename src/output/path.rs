//! Artifact paths mirroring remote keys
//!
//! `https://data.binance.vision/data/spot/daily/klines/BTCUSDT/1m/x.zip`
//! lands at `<root>/data.binance.vision/data/spot/daily/klines/BTCUSDT/1m/x.zip`
//! with its completion marker next to it as `x.zip.done`.

use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use super::{atomic_write, OutputError, OutputResult};

/// Suffix of the sentinel written once an artifact is fully persisted
pub const COMPLETION_MARKER_SUFFIX: &str = ".done";

/// On-disk destination of one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalArtifact {
    path: PathBuf,
}

impl LocalArtifact {
    /// Map `url` below `root` by stripping its scheme
    ///
    /// Query strings and fragments are part of the key as far as the host is
    /// concerned and are kept verbatim. Paths with `..`, a root or a prefix
    /// component are rejected.
    pub fn for_url(root: &Path, url: &str) -> OutputResult<Self> {
        let (_, rest) = url
            .split_once("://")
            .ok_or_else(|| OutputError::MissingScheme(url.to_string()))?;

        let relative = Path::new(rest);
        let safe = !rest.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(OutputError::UnsafePath(url.to_string()));
        }

        Ok(Self {
            path: root.join(relative),
        })
    }

    /// Artifact path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Completion marker path (`<artifact>.done`)
    pub fn marker_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(COMPLETION_MARKER_SUFFIX);
        PathBuf::from(name)
    }

    /// Whether the artifact or its marker exists
    pub async fn is_complete(&self) -> OutputResult<bool> {
        for candidate in [self.path.clone(), self.marker_path()] {
            let exists = tokio::fs::try_exists(&candidate)
                .await
                .map_err(|source| OutputError::Io {
                    path: candidate.clone(),
                    source,
                })?;
            if exists {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Persist `body` atomically, then write the completion marker
    pub async fn persist(&self, body: Bytes) -> OutputResult<()> {
        let path = self.path.clone();
        let marker = self.marker_path();

        let result = tokio::task::spawn_blocking(move || {
            atomic_write(&path, &body).map_err(|source| OutputError::Io {
                path: path.clone(),
                source,
            })?;
            std::fs::File::create(&marker).map_err(|source| OutputError::Io {
                path: marker.clone(),
                source,
            })?;
            Ok::<_, OutputError>(body.len())
        })
        .await
        .map_err(|e| OutputError::Io {
            path: self.path.clone(),
            source: std::io::Error::other(e),
        })?;

        let bytes = result?;
        debug!(path = %self.path.display(), bytes, "Persisted artifact");
        Ok(())
    }
}

//! Local persistence of downloaded artifacts

use std::io::Write;
use std::path::{Path, PathBuf};

pub mod path;

pub use path::{LocalArtifact, COMPLETION_MARKER_SUFFIX};

/// Output errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// URL has no `scheme://` part to strip
    #[error("URL has no scheme: {0}")]
    MissingScheme(String),

    /// URL would map outside the output root
    #[error("URL maps outside the output root: {0}")]
    UnsafePath(String),

    /// IO error on a local path
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Replace `path` with `contents` atomically
///
/// Missing parent directories are created. The bytes go to a temporary file
/// in the same directory, which is synced and renamed over `path`, so readers
/// see either the old file or the complete new one.
pub fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(contents)?;
    temp_file.flush()?;
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

//! CLI command implementations

pub mod discover;
pub mod download;
pub mod error;
pub mod sync;

pub use discover::DiscoverArgs;
pub use download::{Cli, Commands, DownloadArgs, OutputFormat};
pub use error::CliError;
pub use sync::SyncArgs;

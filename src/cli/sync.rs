//! Sync command: discover, then download the manifest just written

use clap::Parser;
use std::path::PathBuf;

use super::discover::{print_discovery, run_discovery};
use super::download::{parse_concurrency, print_download, run_download, Cli};
use super::CliError;
use crate::downloader::config::{DEFAULT_DISCOVERY_CONCURRENCY, DEFAULT_DOWNLOAD_CONCURRENCY};

/// Sync command arguments
#[derive(Parser, Debug)]
pub struct SyncArgs {
    /// Key pattern with one SYMBOL placeholder
    #[arg(long)]
    pub pattern: String,

    /// Shell-style glob selecting which symbols to list
    #[arg(long)]
    pub symbol_glob: String,

    /// Directory the manifest is written to
    #[arg(long, default_value = ".")]
    pub catalog_dir: PathBuf,

    /// Root directory artifacts are mirrored under
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Simultaneous sub-prefix listings (default: 5, max: 64)
    #[arg(long, default_value_t = DEFAULT_DISCOVERY_CONCURRENCY, value_parser = parse_concurrency)]
    pub discovery_concurrency: usize,

    /// Simultaneous downloads (default: 10, max: 64)
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_CONCURRENCY, value_parser = parse_concurrency)]
    pub download_concurrency: usize,

    /// Verify each archive against its published .CHECKSUM
    #[arg(long, default_value_t = false)]
    pub verify_checksum: bool,
}

impl SyncArgs {
    /// Run discovery then download, printing each outcome
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let discovery = run_discovery(
            cli,
            &self.pattern,
            &self.symbol_glob,
            &self.catalog_dir,
            self.discovery_concurrency,
        )
        .await;
        print_discovery(cli.output_format, &discovery);

        let Some(manifest) = discovery?.manifest else {
            return Err(CliError::ConfigurationError(
                "discovery finished without a manifest".to_string(),
            ));
        };

        let download = run_download(
            cli,
            &manifest,
            &self.output_dir,
            self.download_concurrency,
            self.verify_checksum,
        )
        .await;
        print_download(cli.output_format, &download);
        download.map(|_| ())
    }
}

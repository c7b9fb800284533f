//! Top-level CLI definition and the download command

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use super::{CliError, DiscoverArgs, SyncArgs};
use crate::downloader::config::{
    DEFAULT_ATTEMPT_TIMEOUT_SECS, DEFAULT_BACKOFF_UNIT_MS, DEFAULT_BASE_URL,
    DEFAULT_DOWNLOAD_CONCURRENCY, DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_MAX_ATTEMPTS,
    MAX_CONCURRENCY,
};
use crate::downloader::{DownloadExecutor, DownloadReport};
use crate::fetcher::{ReqwestTransport, RetryPolicy, Transport};

/// Parse and validate a concurrency value
pub(crate) fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

/// Binance Vision bulk downloader
#[derive(Parser, Debug)]
#[command(name = "vision-sync")]
#[command(about = "Discover and download archives published on data.binance.vision", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Public host serving the bootstrap page and the archives
    #[arg(long, global = true, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Attempts per request before a URL is given up (range: 1-20)
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..=20))]
    pub max_retries: u32,

    /// Per-attempt timeout in seconds for bootstrap pages and listings
    #[arg(long, global = true, default_value_t = DEFAULT_ATTEMPT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Per-attempt timeout in seconds for archive and checksum downloads
    #[arg(long, global = true, default_value_t = DEFAULT_DOWNLOAD_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub download_timeout_secs: u64,

    /// Backoff unit in milliseconds; attempt n waits unit * 2^n
    #[arg(long, global = true, default_value_t = DEFAULT_BACKOFF_UNIT_MS)]
    pub backoff_ms: u64,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Retry policy for discovery requests
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new()
            .with_max_attempts(self.max_retries)
            .with_attempt_timeout(Duration::from_secs(self.timeout_secs))
            .with_backoff_unit(Duration::from_millis(self.backoff_ms))
    }

    /// Retry policy for manifest downloads; same budget, longer timeout
    pub fn download_policy(&self) -> RetryPolicy {
        self.retry_policy()
            .with_attempt_timeout(Duration::from_secs(self.download_timeout_secs))
    }

    /// Shared HTTP transport
    pub fn transport(&self) -> Result<Arc<dyn Transport>, CliError> {
        Ok(Arc::new(ReqwestTransport::new()?))
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the bucket and write a URL manifest
    Discover(DiscoverArgs),

    /// Download every URL of a manifest
    Download(DownloadArgs),

    /// Discover, then download the resulting manifest
    Sync(SyncArgs),
}

/// Download command arguments
#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// Manifest produced by `discover`
    #[arg(long)]
    pub url_file: PathBuf,

    /// Root directory artifacts are mirrored under
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Simultaneous downloads (default: 10, max: 64)
    #[arg(long, default_value_t = DEFAULT_DOWNLOAD_CONCURRENCY, value_parser = parse_concurrency)]
    pub max_concurrency: usize,

    /// Verify each archive against its published .CHECKSUM
    #[arg(long, default_value_t = false)]
    pub verify_checksum: bool,
}

impl DownloadArgs {
    /// Run the command and print its outcome
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let result = run_download(
            cli,
            &self.url_file,
            &self.output_dir,
            self.max_concurrency,
            self.verify_checksum,
        )
        .await;
        print_download(cli.output_format, &result);
        result.map(|_| ())
    }
}

/// Download `manifest` below `output_dir`
pub async fn run_download(
    cli: &Cli,
    manifest: &Path,
    output_dir: &Path,
    max_concurrency: usize,
    verify_checksum: bool,
) -> Result<DownloadReport, CliError> {
    info!(
        manifest = %manifest.display(),
        output_dir = %output_dir.display(),
        max_concurrency,
        "Starting download"
    );

    let executor = DownloadExecutor::new(cli.transport()?, cli.download_policy())
        .with_output_root(output_dir)
        .with_max_concurrency(max_concurrency)
        .with_checksum_verification(verify_checksum)
        .with_progress_bar(cli.output_format == OutputFormat::Human);

    Ok(executor.execute(manifest).await?)
}

pub(crate) fn print_download(format: OutputFormat, result: &Result<DownloadReport, CliError>) {
    match format {
        OutputFormat::Json => {
            let output = match result {
                Ok(report) => serde_json::json!({ "success": true, "download": report }),
                Err(e) => serde_json::json!({ "success": false, "error": e.to_string() }),
            };
            println!("{output}");
        }
        OutputFormat::Human => match result {
            Ok(report) => {
                println!("\nDownload finished: {}", report.manifest.display());
                println!("Total: {}", report.total);
                println!("Downloaded: {}", report.downloaded);
                println!("Skipped: {}", report.skipped);
                if report.failed > 0 {
                    println!("Failed: {}", report.failed);
                }
                if let Some(ledger) = &report.ledger {
                    println!("Manifest kept; failures recorded in {}", ledger.display());
                } else {
                    println!("Manifest removed");
                }
            }
            Err(e) => {
                eprintln!("\nDownload failed!");
                eprintln!("Error: {e}");
                error!("Download failed: {}", e);
            }
        },
    }
}

//! Discover command: list the bucket and write a manifest

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

use super::download::{parse_concurrency, Cli, OutputFormat};
use super::CliError;
use crate::catalog::{manifest_path, write_manifest};
use crate::crawler::{BucketListingCrawler, DiscoveryReport, KeyPattern, SegmentGlob};
use crate::downloader::config::DEFAULT_DISCOVERY_CONCURRENCY;
use crate::fetcher::RetryingFetcher;
use crate::ledger::{discovery_ledger_path_for, FailureLedger};

/// Discover command arguments
#[derive(Parser, Debug)]
pub struct DiscoverArgs {
    /// Key pattern with one SYMBOL placeholder
    /// (e.g. data/spot/daily/klines/SYMBOL/1m/)
    #[arg(long)]
    pub pattern: String,

    /// Shell-style glob selecting which symbols to list (e.g. BTC*)
    #[arg(long)]
    pub symbol_glob: String,

    /// Directory the manifest is written to
    #[arg(long, default_value = ".")]
    pub catalog_dir: PathBuf,

    /// Simultaneous sub-prefix listings (default: 5, max: 64)
    #[arg(long, default_value_t = DEFAULT_DISCOVERY_CONCURRENCY, value_parser = parse_concurrency)]
    pub max_concurrency: usize,
}

impl DiscoverArgs {
    /// Run the command and print its outcome
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let result = run_discovery(
            cli,
            &self.pattern,
            &self.symbol_glob,
            &self.catalog_dir,
            self.max_concurrency,
        )
        .await;
        print_discovery(cli.output_format, &result);
        result.map(|_| ())
    }
}

/// List `pattern` filtered by `symbol_glob` and write the manifest below
/// `catalog_dir`
pub async fn run_discovery(
    cli: &Cli,
    pattern: &str,
    symbol_glob: &str,
    catalog_dir: &Path,
    max_concurrency: usize,
) -> Result<DiscoveryReport, CliError> {
    let key_pattern = KeyPattern::parse(pattern)?;
    let glob = SegmentGlob::new(symbol_glob)?;
    let manifest = manifest_path(catalog_dir, pattern, symbol_glob);

    info!(
        pattern = %key_pattern,
        symbol_glob = %glob,
        manifest = %manifest.display(),
        "Starting discovery"
    );

    let ledger = Arc::new(FailureLedger::new(discovery_ledger_path_for(&manifest)));
    ledger.reset().await.map_err(|source| CliError::LedgerError {
        path: ledger.path().to_path_buf(),
        source,
    })?;

    let fetcher = RetryingFetcher::new(cli.transport()?, cli.retry_policy(), ledger);
    let crawler =
        BucketListingCrawler::new(fetcher, cli.base_url.as_str()).with_max_concurrency(max_concurrency);

    let discovery = crawler.discover(&key_pattern, &glob).await?;
    write_manifest(&manifest, &discovery.urls).await?;

    let mut report = discovery.report;
    report.manifest = Some(manifest);
    Ok(report)
}

pub(crate) fn print_discovery(format: OutputFormat, result: &Result<DiscoveryReport, CliError>) {
    match format {
        OutputFormat::Json => {
            let output = match result {
                Ok(report) => serde_json::json!({ "success": true, "discovery": report }),
                Err(e) => serde_json::json!({ "success": false, "error": e.to_string() }),
            };
            println!("{output}");
        }
        OutputFormat::Human => match result {
            Ok(report) => {
                println!("\nDiscovery finished: {}", report.pattern);
                println!(
                    "Matched symbols: {}, all symbols: {}",
                    report.matched_segments, report.total_segments
                );
                if !report.failed_prefixes.is_empty() {
                    println!("Failed prefixes: {}", report.failed_prefixes.len());
                    for prefix in &report.failed_prefixes {
                        println!("  {prefix}");
                    }
                }
                if let Some(manifest) = &report.manifest {
                    println!("Generated {} URLs, saved to {}", report.urls, manifest.display());
                }
            }
            Err(e) => {
                eprintln!("\nDiscovery failed!");
                eprintln!("Error: {e}");
                error!("Discovery failed: {}", e);
            }
        },
    }
}

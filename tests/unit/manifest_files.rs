//! Naming and lifecycle of the files kept next to a manifest

use std::path::Path;
use vision_sync::catalog::{
    manifest_file_name, manifest_path, read_manifest, remove_manifest, write_manifest,
    CatalogError,
};
use vision_sync::ledger::{discovery_ledger_path_for, ledger_path_for, FailureLedger};
use vision_sync::output::LocalArtifact;

#[test]
fn manifest_name_is_deterministic() {
    assert_eq!(
        manifest_file_name("data/futures/um/monthly/klines/SYMBOL/1h/", "*USDT"),
        "data_futures_um_monthly_klines_SYMBOL_1h_$*USDT.txt"
    );
    assert_eq!(
        manifest_path(Path::new("catalogs"), "data/spot/SYMBOL/", "BTC*"),
        Path::new("catalogs/data_spot_SYMBOL_$BTC*.txt")
    );
}

#[test]
fn ledgers_sit_beside_the_manifest() {
    let manifest = Path::new("catalogs/data_spot_SYMBOL_$BTC*.txt");
    assert_eq!(
        ledger_path_for(manifest),
        Path::new("catalogs/data_spot_SYMBOL_$BTC*.txt.failed")
    );
    assert_eq!(
        discovery_ledger_path_for(manifest),
        Path::new("catalogs/data_spot_SYMBOL_$BTC*.txt.discovery.failed")
    );
}

#[test]
fn artifact_mirrors_url_path_below_root() {
    let artifact = LocalArtifact::for_url(
        Path::new("/mirror"),
        "https://data.binance.vision/data/spot/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-01-01.zip",
    )
    .unwrap();
    assert_eq!(
        artifact.path(),
        Path::new("/mirror/data.binance.vision/data/spot/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-01-01.zip")
    );
    assert_eq!(
        artifact.marker_path(),
        Path::new("/mirror/data.binance.vision/data/spot/daily/klines/BTCUSDT/1m/BTCUSDT-1m-2024-01-01.zip.done")
    );
}

#[tokio::test]
async fn manifest_round_trip_then_removal() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = manifest_path(dir.path(), "data/spot/SYMBOL/", "*");
    let urls = vec![
        "https://data.binance.vision/data/spot/b.zip".to_string(),
        "https://data.binance.vision/data/spot/a.zip".to_string(),
    ];

    write_manifest(&path, &urls).await.unwrap();
    assert_eq!(read_manifest(&path).await.unwrap(), urls);

    // Rewriting replaces, never appends
    write_manifest(&path, &urls[..1]).await.unwrap();
    assert_eq!(read_manifest(&path).await.unwrap(), &urls[..1]);

    remove_manifest(&path).await.unwrap();
    assert!(matches!(
        read_manifest(&path).await,
        Err(CatalogError::Read { .. })
    ));
    // Already gone is fine
    remove_manifest(&path).await.unwrap();
}

#[tokio::test]
async fn ledger_appends_across_instances() {
    let dir = tempfile::TempDir::new().unwrap();
    let manifest = dir.path().join("m.txt");

    FailureLedger::for_catalog(&manifest).record("u1").await;
    let second = FailureLedger::for_catalog(&manifest);
    second.record("u2").await;

    assert_eq!(second.recorded(), 1);
    assert_eq!(second.entries().await.unwrap(), vec!["u1", "u2"]);

    second.reset().await.unwrap();
    assert!(second.entries().await.unwrap().is_empty());
    assert!(!second.has_failures());
}

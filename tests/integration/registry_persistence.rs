//! Integration tests for the registry file
//!
//! These tests verify that:
//! - a cycle rewrites `servers.json` in full with the new status
//! - fields written by other tools survive a cycle
//! - legacy files with offset-less timestamps load
//! - a corrupt file degrades to an empty registry

use chrono::Utc;
use latency_guard::{
    config::Config,
    monitor::Monitor,
    registry::{JsonFileStore, RegistryStore},
};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

use crate::helpers::*;

const LEGACY_SERVERS: &str = r#"{
  "Hypixel": {
    "Address": "mc.hypixel.net",
    "AutoOptimize": true,
    "Port": 25565,
    "CurrentLatency": 180.0,
    "LastCheck": "2024-04-30T08:15:00.250000"
  },
  "Primary": {
    "Address": "10.0.0.9",
    "AutoOptimize": false
  },
  "Lobby": {
    "Address": "lobby.example.net"
  }
}"#;

#[tokio::test]
async fn test_cycle_rewrites_registry_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, LEGACY_SERVERS).unwrap();

    let prober = ScriptedProber::new(&[("mc.hypixel.net", 95.0)]);
    let before = Utc::now();

    let mut monitor = Monitor::start(
        Config::default(),
        Box::new(JsonFileStore::new(&path)),
        Box::new(prober.clone()),
        Box::new(FakeStats::default()),
        Box::new(RecordingRemediator::default()),
    )
    .await;
    assert_eq!(monitor.registry().len(), 3);

    let report = monitor.run_cycle().await;
    assert_eq!(report.probed, vec!["Hypixel", "Lobby"]);
    assert_eq!(report.updated, vec!["Hypixel"]);
    assert!(report.persisted);

    let raw = std::fs::read_to_string(&path).unwrap();
    assert!(raw.starts_with("{\n  \"Hypixel\": {\n    \"Address\": \"mc.hypixel.net\""));

    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["Hypixel"]["CurrentLatency"], 95.0);
    assert_eq!(json["Hypixel"]["Port"], 25565);
    assert_eq!(json["Primary"]["AutoOptimize"], false);
    assert_eq!(json["Lobby"]["AutoOptimize"], true);
    assert!(json["Lobby"].get("CurrentLatency").is_none());
    assert!(json["Primary"].get("LastCheck").is_none());

    let reloaded = JsonFileStore::new(&path).load().await.unwrap();
    let last_check = reloaded.get("Hypixel").unwrap().last_check.unwrap();
    assert!(last_check >= before);
    assert_eq!(&reloaded, monitor.registry());
}

#[tokio::test]
async fn test_corrupt_registry_file_is_replaced_by_empty_registry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("servers.json");
    std::fs::write(&path, "{ \"Hypixel\": { \"Address\": ").unwrap();

    let prober = ScriptedProber::default();
    let mut monitor = Monitor::start(
        Config::default(),
        Box::new(JsonFileStore::new(&path)),
        Box::new(prober.clone()),
        Box::new(FakeStats::default()),
        Box::new(RecordingRemediator::default()),
    )
    .await;

    let report = monitor.run_cycle().await;

    assert!(report.probed.is_empty());
    assert!(report.persisted);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
}

#[tokio::test]
async fn test_registry_directory_is_created_on_save() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Config").join("servers.json");

    let store = JsonFileStore::new(&path);
    store.save(&three_servers()).await.unwrap();

    assert_eq!(store.load().await.unwrap(), three_servers());
}

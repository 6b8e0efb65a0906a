use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reranker_core::{
    spawn_periodic, Event, LifecycleStore, LinkKey, NormalizationBasis, Pipeline, RerankConfig,
    Source, Statistic,
};
use tokio::sync::mpsc;

fn temp_dir(tag: &str) -> std::path::PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "reranker_{tag}_{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    dir
}

#[tokio::test]
async fn config_round_trips_through_json_file() {
    let dir = temp_dir("config");
    let path = dir.join("config.json");

    let mut config = RerankConfig::default();
    config.front_page_count = 5;
    config.ranking.statistic = Statistic::Median;
    config.ranking.basis = NormalizationBasis::Decayed;
    let key = LinkKey::parse("feedburner:origLink");
    config.sources.push(Source::new("http://e.com/rss", key, "E"));
    config.save_to(&path).unwrap();

    let loaded = RerankConfig::load_from(&path).unwrap();
    assert_eq!(loaded.front_page_count, 5);
    assert_eq!(loaded.ranking.statistic, Statistic::Median);
    assert_eq!(loaded.ranking.basis, NormalizationBasis::Decayed);
    assert_eq!(loaded.sources, config.sources);

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn partial_config_fills_defaults_and_invalid_is_rejected() {
    let dir = temp_dir("partial");
    tokio::fs::create_dir_all(&dir).await.unwrap();

    let partial = dir.join("partial.json");
    tokio::fs::write(&partial, br#"{"front_page_count": 3, "ranking": {"volume_penalty": true}}"#)
        .await
        .unwrap();
    let loaded = RerankConfig::load_from(&partial).unwrap();
    assert_eq!(loaded.front_page_count, 3);
    assert!(loaded.ranking.volume_penalty);
    assert_eq!(loaded.ranking.statistic, Statistic::Mean);
    assert_eq!(loaded.expiration_horizon_secs, 86_400);
    assert_eq!(loaded.freshness_window_secs, 7_200);

    let invalid = dir.join("invalid.json");
    tokio::fs::write(&invalid, br#"{"expiration_horizon_secs": 0}"#).await.unwrap();
    assert!(RerankConfig::load_from(&invalid).is_err());

    let corrupt = dir.join("corrupt.json");
    tokio::fs::write(&corrupt, b"{ this is not json ").await.unwrap();
    assert!(RerankConfig::load_from(&corrupt).is_err());

    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn scheduler_emits_run_events_and_stops() {
    let store = LifecycleStore::in_memory().await.unwrap();
    let pipeline = Arc::new(Pipeline::new(RerankConfig::default(), Client::new(), store));
    let (tx, mut rx) = mpsc::channel(8);

    let handle = spawn_periodic(pipeline, Duration::from_millis(50), tx);

    let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed");
    match event {
        Event::RunCompleted { report, front_page } => {
            assert_eq!(report.inserted, 0);
            assert!(front_page.items.is_empty());
        }
        Event::RunFailed(err) => panic!("run failed: {err}"),
    }

    handle.stop().await.expect("stop scheduler");
}

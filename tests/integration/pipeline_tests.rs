use async_trait::async_trait;
use b30_processor::{
    database::{db_structs::ScoreRecord, CacheError, MemoryScoreCache, ScoreCache},
    model::{structures::refresh_mode::RefreshMode, EngineConfig, RankingEngine, RefreshRequest},
    pipeline::{JsonFileSink, PipelineConfig, PipelineCoordinator, PipelineStats, RankingReport},
    utils::test_utils::{generate_linear_catalog, generate_profile, CollectingSink, FakeScoreApi}
};
use std::{collections::HashSet, sync::Arc, time::Duration};

use crate::common::init_test_env;

/// Cache that refuses to open one player's partition
struct RejectingCache {
    inner: MemoryScoreCache,
    rejected: i32
}

#[async_trait]
impl ScoreCache for RejectingCache {
    async fn ensure_partition(&self, player_id: i32) -> Result<(), CacheError> {
        if player_id == self.rejected {
            return Err(CacheError::Corruption(format!("partition {} is unreadable", player_id)));
        }
        self.inner.ensure_partition(player_id).await
    }

    async fn has_partition(&self, player_id: i32) -> Result<bool, CacheError> {
        self.inner.has_partition(player_id).await
    }

    async fn partitions(&self) -> Result<HashSet<i32>, CacheError> {
        self.inner.partitions().await
    }

    async fn get(&self, player_id: i32) -> Result<Vec<ScoreRecord>, CacheError> {
        self.inner.get(player_id).await
    }

    async fn upsert(&self, record: &ScoreRecord) -> Result<(), CacheError> {
        self.inner.upsert(record).await
    }

    async fn reset(&self) -> Result<(), CacheError> {
        self.inner.reset().await
    }
}

fn engine(api: FakeScoreApi, cache: Arc<dyn ScoreCache>) -> Arc<RankingEngine> {
    Arc::new(RankingEngine::new(
        Arc::new(generate_linear_catalog(50, 1100, 5)),
        cache,
        Arc::new(api),
        EngineConfig {
            fetch_delay: Duration::ZERO,
            ..Default::default()
        }
    ))
}

fn players() -> Vec<i32> {
    (1..=6).collect()
}

fn uniform_api() -> FakeScoreApi {
    FakeScoreApi::uniform(&generate_linear_catalog(50, 1100, 5), &players(), 9_900_000)
}

#[tokio::test]
async fn test_rankings_are_rendered_in_submission_order() {
    init_test_env();
    let sink = Arc::new(CollectingSink::new());
    let coordinator = PipelineCoordinator::start(
        engine(uniform_api(), Arc::new(MemoryScoreCache::new())),
        sink.clone(),
        PipelineConfig::default()
    );

    for player_id in [4, 1, 6, 2, 5, 3] {
        coordinator
            .submit(RefreshRequest::new(generate_profile(player_id, 0), RefreshMode::TopN))
            .await
            .unwrap();
    }
    let stats = coordinator.shutdown().await.unwrap();

    assert_eq!(sink.player_order().await, vec![4, 1, 6, 2, 5, 3]);
    assert_eq!(
        stats,
        PipelineStats {
            submitted: 6,
            refreshed: 6,
            failed: 0,
            rendered: 6,
            render_failed: 0
        }
    );

    let jobs = sink.jobs().await;
    assert!(jobs.iter().all(|job| job.ranking.len() == 33));
    assert!(jobs.iter().all(|job| job.profile.player_id == job.ranking.player_id));
}

#[tokio::test]
async fn test_failed_refresh_does_not_block_later_requests() {
    init_test_env();
    let cache = Arc::new(RejectingCache {
        inner: MemoryScoreCache::new(),
        rejected: 2
    });
    let sink = Arc::new(CollectingSink::new());
    let coordinator = PipelineCoordinator::start(engine(uniform_api(), cache), sink.clone(), PipelineConfig::default());

    for player_id in 1..=4 {
        coordinator
            .submit(RefreshRequest::new(generate_profile(player_id, 0), RefreshMode::TopN))
            .await
            .unwrap();
    }
    let stats = coordinator.shutdown().await.unwrap();

    assert_eq!(sink.player_order().await, vec![1, 3, 4]);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.refreshed, 3);
}

#[tokio::test]
async fn test_render_failures_are_counted() {
    init_test_env();
    let sink = Arc::new(CollectingSink::failing_for(&[3]));
    let coordinator = PipelineCoordinator::start(
        engine(uniform_api(), Arc::new(MemoryScoreCache::new())),
        sink.clone(),
        PipelineConfig::default()
    );

    for player_id in 1..=4 {
        coordinator
            .submit(RefreshRequest::new(generate_profile(player_id, 0), RefreshMode::TopN))
            .await
            .unwrap();
    }
    let stats = coordinator.shutdown().await.unwrap();

    assert_eq!(sink.player_order().await, vec![1, 2, 4]);
    assert_eq!(stats.rendered, 3);
    assert_eq!(stats.render_failed, 1);
}

#[tokio::test]
async fn test_full_rescans_are_not_rendered() {
    init_test_env();
    let cache = Arc::new(MemoryScoreCache::new());
    let sink = Arc::new(CollectingSink::new());
    let coordinator = PipelineCoordinator::start(
        engine(uniform_api(), cache.clone()),
        sink.clone(),
        PipelineConfig::default()
    );

    coordinator
        .submit(RefreshRequest::new(generate_profile(1, 0), RefreshMode::FullRescan))
        .await
        .unwrap();
    coordinator
        .submit(RefreshRequest::new(generate_profile(2, 0), RefreshMode::TopN))
        .await
        .unwrap();
    let stats = coordinator.shutdown().await.unwrap();

    assert_eq!(sink.player_order().await, vec![2]);
    assert_eq!(stats.refreshed, 2);
    assert_eq!(cache.get(1).await.unwrap().len(), 50);
}

#[tokio::test]
async fn test_small_queue_applies_backpressure_without_losing_requests() {
    init_test_env();
    let api = uniform_api().with_delay(Duration::from_millis(1));
    let sink = Arc::new(CollectingSink::new());
    let coordinator = PipelineCoordinator::start(
        engine(api, Arc::new(MemoryScoreCache::new())),
        sink.clone(),
        PipelineConfig {
            queue_capacity: 1,
            render_capacity: 1
        }
    );

    for player_id in players() {
        coordinator
            .submit(RefreshRequest::new(generate_profile(player_id, 0), RefreshMode::TopN))
            .await
            .unwrap();
    }
    let stats = coordinator.shutdown().await.unwrap();

    assert_eq!(stats.submitted, 6);
    assert_eq!(stats.rendered, 6);
    assert_eq!(sink.player_order().await, players());
}

#[tokio::test]
async fn test_json_sink_end_to_end() {
    init_test_env();
    let dir = tempfile::tempdir().unwrap();
    let catalog = Arc::new(generate_linear_catalog(50, 1100, 5));
    let sink = Arc::new(JsonFileSink::new(dir.path(), catalog));
    let coordinator = PipelineCoordinator::start(
        engine(uniform_api(), Arc::new(MemoryScoreCache::new())),
        sink.clone(),
        PipelineConfig::default()
    );

    let mut profile = generate_profile(5, 0);
    profile.overall_rating = Some(1250);
    coordinator
        .submit(RefreshRequest::new(profile, RefreshMode::TopN))
        .await
        .unwrap();
    coordinator.shutdown().await.unwrap();

    let content = std::fs::read_to_string(sink.path_for(5)).unwrap();
    let report: RankingReport = serde_json::from_str(&content).unwrap();

    assert_eq!(report.entries.len(), 33);
    assert_eq!(report.entries[0].title, "Song 0");
    assert_eq!(report.overall_rating, "12.50");
    assert_eq!(report.catalog_version, "linear");
}

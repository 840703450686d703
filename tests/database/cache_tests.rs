use b30_processor::{
    database::{CacheError, ScoreCache},
    model::{
        structures::{difficulty::Difficulty, refresh_mode::RefreshMode},
        EngineConfig, RankingEngine, RefreshRequest
    },
    utils::test_utils::{generate_linear_catalog, generate_profile, generate_score_record, FakeScoreApi}
};
use serial_test::serial;
use std::{sync::Arc, time::Duration};

use super::test_helpers::TestDatabase;
use crate::common::init_test_env;

// These start a PostgreSQL container and need docker: cargo test -- --ignored

#[tokio::test]
#[serial]
#[ignore]
async fn test_migrate_is_idempotent() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let cache = test_db.cache().await.expect("Failed to connect");

    cache.migrate().await.unwrap();
    cache.migrate().await.unwrap();

    assert!(cache.partitions().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_upsert_and_get() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let cache = test_db.cache().await.expect("Failed to connect");

    cache.upsert(&generate_score_record(1, 3, Difficulty::Future, "9.8", 9_700_000)).await.unwrap();
    cache.upsert(&generate_score_record(1, 1, Difficulty::Beyond, "10.9", 9_950_000)).await.unwrap();
    cache.upsert(&generate_score_record(1, 3, Difficulty::Future, "9.8", 9_990_000)).await.unwrap();
    cache.upsert(&generate_score_record(2, 3, Difficulty::Future, "9.8", 9_100_000)).await.unwrap();

    let records = cache.get(1).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], generate_score_record(1, 1, Difficulty::Beyond, "10.9", 9_950_000));
    assert_eq!(records[1].score, 9_990_000);
    assert_eq!(records[1].rating.nominal(), "9.8");

    assert!(cache.has_partition(2).await.unwrap());
    assert!(!cache.has_partition(3).await.unwrap());
    assert!(cache.get(3).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_ensure_partition_and_reset() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let cache = test_db.cache().await.expect("Failed to connect");

    cache.ensure_partition(5).await.unwrap();
    cache.ensure_partition(5).await.unwrap();
    cache.upsert(&generate_score_record(5, 1, Difficulty::Past, "3.0", 9_000_000)).await.unwrap();
    assert_eq!(cache.partitions().await.unwrap().len(), 1);

    cache.reset().await.unwrap();

    assert!(cache.partitions().await.unwrap().is_empty());
    assert!(cache.get(5).await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_corrupted_row_is_reported() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let cache = test_db.cache().await.expect("Failed to connect");
    cache.ensure_partition(1).await.unwrap();

    let client = test_db.get_client().await.unwrap();
    client
        .execute(
            "INSERT INTO score_cache (player_id, song_index, difficulty, song_id, rating, played_at, cached_at,
                                      score, clear_type, potential)
             VALUES (1, 1, 9, 'song1', '10.0', 0, 0, 9900000, 1, 11.5)",
            &[]
        )
        .await
        .unwrap();

    let result = cache.get(1).await;
    assert!(matches!(result, Err(CacheError::Corruption(_))));
}

#[tokio::test]
#[serial]
#[ignore]
async fn test_engine_against_postgres() {
    init_test_env();
    let test_db = TestDatabase::new().await.expect("Failed to create test database");
    let cache = Arc::new(test_db.cache().await.expect("Failed to connect"));
    cache.ensure_partition(2).await.unwrap();

    let catalog = generate_linear_catalog(60, 1100, 5);
    let api = Arc::new(FakeScoreApi::uniform(&catalog, &[1, 2], 9_900_000));
    let engine = RankingEngine::new(
        Arc::new(catalog),
        cache.clone(),
        api.clone(),
        EngineConfig {
            fetch_delay: Duration::ZERO,
            ..Default::default()
        }
    );

    let ranking = engine
        .refresh(&RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ranking.len(), 33);
    assert_eq!(api.call_count(), 42);
    assert_eq!(cache.get(2).await.unwrap().len(), 42);

    // Player 2 was warmed by player 1's walk
    engine
        .refresh(&RefreshRequest::new(generate_profile(2, 0), RefreshMode::TopN))
        .await
        .unwrap();
    assert_eq!(api.call_count(), 42);
}

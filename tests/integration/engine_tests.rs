use b30_processor::{
    catalog::SongCatalog,
    database::{db_structs::ScoreRecord, sort_by_potential, MemoryScoreCache, ScoreCache},
    error::ProcessorError,
    model::{
        constants::RANKING_CAPACITY, structures::refresh_mode::RefreshMode, EngineConfig, RankingEngine,
        RefreshRequest
    },
    utils::test_utils::{generate_linear_catalog, generate_profile, generate_random_catalog, FakeScoreApi}
};
use std::{sync::Arc, time::Duration};

use crate::common::init_test_env;

fn engine(catalog: SongCatalog, api: Arc<FakeScoreApi>, cache: Arc<MemoryScoreCache>) -> RankingEngine {
    RankingEngine::new(
        Arc::new(catalog),
        cache,
        api,
        EngineConfig {
            fetch_delay: Duration::ZERO,
            ..Default::default()
        }
    )
}

/// Best 33 of a player over the whole catalog, computed without any pruning
fn brute_force_top(catalog: &SongCatalog, api: &FakeScoreApi, player_id: i32) -> Vec<ScoreRecord> {
    let mut records: Vec<ScoreRecord> = catalog
        .iter()
        .filter_map(|entry| {
            api.score_of(player_id, &entry.song_id, entry.difficulty)
                .map(|score| ScoreRecord::from_friend_score(entry, &score, 0))
        })
        .collect();

    sort_by_potential(&mut records);
    records.truncate(RANKING_CAPACITY);
    records
}

fn summary(records: &[ScoreRecord]) -> Vec<(i32, i32, f64)> {
    records.iter().map(|r| (r.song_index, r.score, r.potential)).collect()
}

#[tokio::test]
async fn test_pruned_walk_matches_brute_force() {
    init_test_env();

    for seed in [1, 7, 42, 1234] {
        let catalog = generate_random_catalog(400, seed);
        let api = Arc::new(FakeScoreApi::random(&catalog, &[1, 2, 3], seed));
        let expected = brute_force_top(&catalog, &api, 1);

        let engine = engine(catalog.clone(), api.clone(), Arc::new(MemoryScoreCache::new()));
        let request = RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN);
        let (ranking, stats) = engine.refresh_with_stats(&request).await.unwrap();
        let ranking = ranking.unwrap();

        assert_eq!(summary(&ranking.entries), summary(&expected), "seed {}", seed);
        assert!(ranking.len() <= RANKING_CAPACITY);
        assert_eq!(stats.fetched, api.call_count());
        assert!(stats.fetched <= catalog.len());
    }
}

#[tokio::test]
async fn test_ranking_is_ordered_and_bounded() {
    init_test_env();
    let catalog = generate_random_catalog(200, 99);
    let api = Arc::new(FakeScoreApi::random(&catalog, &[1], 99));
    let engine = engine(catalog, api, Arc::new(MemoryScoreCache::new()));

    let request = RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN);
    let ranking = engine.refresh(&request).await.unwrap().unwrap();

    assert!(ranking.len() <= RANKING_CAPACITY);
    for pair in ranking.entries.windows(2) {
        assert!(pair[0].potential >= pair[1].potential);
    }
}

#[tokio::test]
async fn test_co_players_are_cached_but_strangers_are_not() {
    init_test_env();
    let catalog = generate_linear_catalog(60, 1100, 5);
    let api = Arc::new(FakeScoreApi::uniform(&catalog, &[1, 2, 3], 9_900_000));
    let cache = Arc::new(MemoryScoreCache::new());
    cache.ensure_partition(2).await.unwrap();

    let engine = engine(catalog, api.clone(), cache.clone());
    let request = RefreshRequest::new(generate_profile(1, 0), RefreshMode::FullRescan);
    engine.refresh(&request).await.unwrap();

    assert_eq!(api.call_count(), 60);
    assert_eq!(cache.write_count(1).await, 60);
    assert_eq!(cache.write_count(2).await, 60);
    assert!(!cache.has_partition(3).await.unwrap());

    // Player 2 has not played since, so their refresh needs no fetches at all
    let request = RefreshRequest::new(generate_profile(2, 0), RefreshMode::TopN);
    let ranking = engine.refresh(&request).await.unwrap().unwrap();

    assert_eq!(api.call_count(), 60);
    assert_eq!(ranking.len(), RANKING_CAPACITY);
}

#[tokio::test]
async fn test_fresh_rows_are_not_refetched() {
    init_test_env();
    let catalog = generate_random_catalog(150, 5);
    let api = Arc::new(FakeScoreApi::uniform(&catalog, &[1], 9_850_000));
    let engine = engine(catalog, api.clone(), Arc::new(MemoryScoreCache::new()));

    let request = RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN);
    let first = engine.refresh(&request).await.unwrap();
    let calls = api.call_count();
    assert!(calls > 0);

    let second = engine.refresh(&request).await.unwrap();

    assert_eq!(api.call_count(), calls);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_activity_after_caching_forces_refetch() {
    init_test_env();
    let catalog = generate_linear_catalog(50, 1100, 5);
    let api = Arc::new(FakeScoreApi::uniform(&catalog, &[1], 9_900_000));
    let engine = engine(catalog, api.clone(), Arc::new(MemoryScoreCache::new()));

    engine
        .refresh(&RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN))
        .await
        .unwrap();
    let calls = api.call_count();

    let (_, stats) = engine
        .refresh_with_stats(&RefreshRequest::new(generate_profile(1, i64::MAX), RefreshMode::TopN))
        .await
        .unwrap();

    assert_eq!(stats.skipped_fresh, 0);
    assert_eq!(stats.fetched, calls);
    assert_eq!(api.call_count(), calls * 2);
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    init_test_env();
    let catalog = generate_random_catalog(120, 17);
    let api = Arc::new(FakeScoreApi::random(&catalog, &[1, 2], 17));
    let engine = engine(catalog, api, Arc::new(MemoryScoreCache::new()));

    // Stale every time, so both runs go back to the remote
    let request = RefreshRequest::new(generate_profile(1, i64::MAX), RefreshMode::TopN);
    let first = engine.refresh(&request).await.unwrap().unwrap();
    let second = engine.refresh(&request).await.unwrap().unwrap();

    assert_eq!(summary(&first.entries), summary(&second.entries));
}

#[tokio::test]
async fn test_api_failure_aborts_but_keeps_written_rows() {
    init_test_env();
    let catalog = generate_linear_catalog(40, 1100, 5);
    let api = Arc::new(FakeScoreApi::uniform(&catalog, &[1], 9_900_000).failing_from_call(5));
    let cache = Arc::new(MemoryScoreCache::new());
    let engine = engine(catalog, api, cache.clone());

    let request = RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN);
    let result = engine.refresh(&request).await;

    assert!(matches!(result, Err(ProcessorError::ApiFailure(_))));
    assert_eq!(cache.get(1).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_player_without_scores_gets_empty_ranking() {
    init_test_env();
    let catalog = generate_linear_catalog(25, 1100, 5);
    let api = Arc::new(FakeScoreApi::uniform(&catalog, &[2], 9_900_000));
    let engine = engine(catalog, api.clone(), Arc::new(MemoryScoreCache::new()));

    let request = RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN);
    let ranking = engine.refresh(&request).await.unwrap().unwrap();

    assert!(ranking.is_empty());
    // Nothing ever fills the heap, so nothing is pruned
    assert_eq!(api.call_count(), 25);
}

#[tokio::test]
async fn test_empty_catalog() {
    init_test_env();
    let api = Arc::new(FakeScoreApi::new());
    let engine = engine(SongCatalog::default(), api.clone(), Arc::new(MemoryScoreCache::new()));

    let request = RefreshRequest::new(generate_profile(1, 0), RefreshMode::TopN);
    let ranking = engine.refresh(&request).await.unwrap().unwrap();

    assert!(ranking.is_empty());
    assert_eq!(api.call_count(), 0);
}

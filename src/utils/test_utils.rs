use crate::{
    api::{
        api_structs::{FriendScore, PlayerProfile},
        ApiError, ScoreApi
    },
    catalog::{CatalogEntry, SongCatalog},
    database::db_structs::ScoreRecord,
    model::structures::{chart_rating::ChartRating, difficulty::Difficulty},
    pipeline::{
        sink::{RankingSink, SinkError},
        RenderJob
    }
};
use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex
    },
    time::Duration
};

/// Fixed play time used by generated scores
pub const PLAYED_AT_MILLIS: i64 = 1_700_000_000_000;

pub fn generate_catalog_entry(song_index: i32, difficulty: Difficulty, rating: ChartRating) -> CatalogEntry {
    CatalogEntry {
        song_index,
        song_id: format!("song{}", song_index),
        title: format!("Song {}", song_index),
        difficulty,
        rating
    }
}

pub fn generate_score_record(
    player_id: i32,
    song_index: i32,
    difficulty: Difficulty,
    rating: &str,
    score: i32
) -> ScoreRecord {
    let rating = ChartRating::parse(rating).unwrap();
    let entry = generate_catalog_entry(song_index, difficulty, rating);
    let friend_score = FriendScore {
        player_id,
        score,
        clear_type: 1,
        played_at_millis: PLAYED_AT_MILLIS
    };

    ScoreRecord::from_friend_score(&entry, &friend_score, PLAYED_AT_MILLIS)
}

/// Future charts whose ratings start at `start_hundredths` and drop by
/// `step_hundredths` per entry
pub fn generate_linear_catalog(len: usize, start_hundredths: i32, step_hundredths: i32) -> SongCatalog {
    let entries = (0..len as i32)
        .map(|i| {
            let rating = ChartRating::from_hundredths((start_hundredths - step_hundredths * i).max(0));
            generate_catalog_entry(i, Difficulty::Future, rating)
        })
        .collect();

    SongCatalog::new("linear", entries)
}

/// Seeded catalog with ratings between 1.00 and 12.00, sorted descending
pub fn generate_random_catalog(len: usize, seed: u64) -> SongCatalog {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut ratings: Vec<(i32, Difficulty)> = (0..len)
        .map(|_| {
            let hundredths = rng.random_range(100..=1200);
            let difficulty = Difficulty::try_from(rng.random_range(0..5)).unwrap();
            (hundredths, difficulty)
        })
        .collect();
    ratings.sort_by(|a, b| b.0.cmp(&a.0));

    let entries = ratings
        .into_iter()
        .enumerate()
        .map(|(i, (hundredths, difficulty))| {
            generate_catalog_entry(i as i32, difficulty, ChartRating::from_hundredths(hundredths))
        })
        .collect();

    SongCatalog::new(format!("random-{}", seed), entries)
}

pub fn generate_profile(player_id: i32, last_activity_millis: i64) -> PlayerProfile {
    PlayerProfile {
        player_id,
        display_name: format!("player{}", player_id),
        user_code: Some(format!("{:09}", player_id)),
        overall_rating: None,
        character_id: 0,
        is_character_uncapped: false,
        last_activity_millis
    }
}

/// In-memory stand-in for the remote API.
///
/// Holds one friend leaderboard per chart and counts every leaderboard
/// fetch. Can be told to fail from a given call onward.
#[derive(Debug, Default)]
pub struct FakeScoreApi {
    boards: Mutex<HashMap<(String, Difficulty), Vec<FriendScore>>>,
    profiles: Vec<PlayerProfile>,
    calls: AtomicUsize,
    fail_from_call: Option<usize>,
    delay: Duration
}

impl FakeScoreApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every player has the same score on every chart
    pub fn uniform(catalog: &SongCatalog, players: &[i32], score: i32) -> Self {
        let api = Self::new();
        for entry in catalog.iter() {
            let scores = players
                .iter()
                .map(|&player_id| FriendScore {
                    player_id,
                    score,
                    clear_type: 1,
                    played_at_millis: PLAYED_AT_MILLIS
                })
                .collect();
            api.set_board(&entry.song_id, entry.difficulty, scores);
        }

        api
    }

    /// Seeded scores between 8.0M and 10.0M+, with roughly one chart in five
    /// left unplayed per player
    pub fn random(catalog: &SongCatalog, players: &[i32], seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let api = Self::new();

        for entry in catalog.iter() {
            let mut scores = Vec::new();
            for &player_id in players {
                if rng.random_bool(0.2) {
                    continue;
                }

                scores.push(FriendScore {
                    player_id,
                    score: rng.random_range(8_000_000..=10_001_500),
                    clear_type: rng.random_range(0..=5),
                    played_at_millis: PLAYED_AT_MILLIS
                });
            }
            api.set_board(&entry.song_id, entry.difficulty, scores);
        }

        api
    }

    pub fn with_profiles(mut self, profiles: Vec<PlayerProfile>) -> Self {
        self.profiles = profiles;
        self
    }

    /// Fails the `call`-th fetch (1-based) and every fetch after it
    pub fn failing_from_call(mut self, call: usize) -> Self {
        self.fail_from_call = Some(call);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_board(&self, song_id: &str, difficulty: Difficulty, scores: Vec<FriendScore>) {
        self.boards
            .lock()
            .unwrap()
            .insert((song_id.to_string(), difficulty), scores);
    }

    pub fn clear_scores(&self) {
        self.boards.lock().unwrap().clear();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn score_of(&self, player_id: i32, song_id: &str, difficulty: Difficulty) -> Option<FriendScore> {
        self.boards
            .lock()
            .unwrap()
            .get(&(song_id.to_string(), difficulty))
            .and_then(|scores| scores.iter().find(|s| s.player_id == player_id).cloned())
    }
}

#[async_trait]
impl ScoreApi for FakeScoreApi {
    async fn fetch_friend_scores(&self, song_id: &str, difficulty: Difficulty) -> Result<Vec<FriendScore>, ApiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if self.fail_from_call.is_some_and(|n| call >= n) {
            return Err(ApiError::Rejected {
                endpoint: "/webapi/score/song/friend".to_string(),
                message: format!("injected failure on call {}", call)
            });
        }

        let board = self
            .boards
            .lock()
            .unwrap()
            .get(&(song_id.to_string(), difficulty))
            .cloned()
            .unwrap_or_default();

        Ok(board)
    }

    async fn fetch_friends(&self) -> Result<Vec<PlayerProfile>, ApiError> {
        Ok(self.profiles.clone())
    }
}

/// Render sink that keeps every job it receives
#[derive(Debug, Default)]
pub struct CollectingSink {
    jobs: tokio::sync::Mutex<Vec<RenderJob>>,
    fail_for: HashSet<i32>
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects rankings of the given players
    pub fn failing_for(players: &[i32]) -> Self {
        CollectingSink {
            jobs: Default::default(),
            fail_for: players.iter().copied().collect()
        }
    }

    pub async fn jobs(&self) -> Vec<RenderJob> {
        self.jobs.lock().await.clone()
    }

    pub async fn player_order(&self) -> Vec<i32> {
        self.jobs.lock().await.iter().map(|j| j.ranking.player_id).collect()
    }
}

#[async_trait]
impl RankingSink for CollectingSink {
    async fn render(&self, job: &RenderJob) -> Result<(), SinkError> {
        if self.fail_for.contains(&job.ranking.player_id) {
            return Err(SinkError::Rejected(job.ranking.player_id));
        }

        self.jobs.lock().await.push(job.clone());
        Ok(())
    }
}

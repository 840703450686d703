use crate::{
    api::{api_structs::PlayerProfile, ScoreApi},
    catalog::{CatalogEntry, SongCatalog},
    database::{
        db_structs::{ChartKey, ScoreRecord},
        ScoreCache
    },
    error::ProcessorError,
    model::{
        bounded_ranking::BoundedRanking,
        constants::{DEFAULT_FETCH_DELAY_MS, RANKING_CAPACITY},
        ranking_result::RankingResult,
        structures::refresh_mode::RefreshMode
    },
    utils::progress_utils::progress_style
};
use chrono::Utc;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration
};
use tracing::{debug, info, info_span, Instrument, Span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pause after every remote fetch
    pub fetch_delay: Duration,
    /// Number of records a TopN ranking keeps
    pub capacity: usize
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            fetch_delay: Duration::from_millis(DEFAULT_FETCH_DELAY_MS),
            capacity: RANKING_CAPACITY
        }
    }
}

/// A request to bring one player's cache (and, for TopN, ranking) up to date
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshRequest {
    pub player_id: i32,
    pub mode: RefreshMode,
    /// Time of the player's most recent play. Cached rows written after this
    /// point cannot be stale.
    pub last_activity_millis: i64,
    pub profile: PlayerProfile
}

impl RefreshRequest {
    pub fn new(profile: PlayerProfile, mode: RefreshMode) -> Self {
        RefreshRequest {
            player_id: profile.player_id,
            mode,
            last_activity_millis: profile.last_activity_millis,
            profile
        }
    }
}

/// What a single refresh did, logged once per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub fetched: usize,
    pub skipped_fresh: usize,
    /// Catalog position where the walk stopped early, if it did
    pub pruned_at: Option<usize>
}

/// Recomputes a player's best scores against the catalog.
///
/// The engine owns no state of its own: scores live in the [`ScoreCache`],
/// fresh ones come from the [`ScoreApi`]. Every fetch writes the returned
/// scores of all players that have a cache partition, so refreshing one
/// player warms the cache for the others.
pub struct RankingEngine {
    catalog: Arc<SongCatalog>,
    cache: Arc<dyn ScoreCache>,
    api: Arc<dyn ScoreApi>,
    config: EngineConfig
}

impl RankingEngine {
    pub fn new(
        catalog: Arc<SongCatalog>,
        cache: Arc<dyn ScoreCache>,
        api: Arc<dyn ScoreApi>,
        config: EngineConfig
    ) -> Self {
        RankingEngine {
            catalog,
            cache,
            api,
            config
        }
    }

    pub fn catalog(&self) -> &Arc<SongCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<dyn ScoreCache> {
        &self.cache
    }

    pub fn api(&self) -> &Arc<dyn ScoreApi> {
        &self.api
    }

    /// Runs a refresh. Returns the ranking for [`RefreshMode::TopN`] and
    /// `None` for [`RefreshMode::FullRescan`].
    pub async fn refresh(&self, request: &RefreshRequest) -> Result<Option<RankingResult>, ProcessorError> {
        let (ranking, _) = self.refresh_with_stats(request).await?;
        Ok(ranking)
    }

    pub async fn refresh_with_stats(
        &self,
        request: &RefreshRequest
    ) -> Result<(Option<RankingResult>, RefreshStats), ProcessorError> {
        self.cache.ensure_partition(request.player_id).await?;

        let cached = self.cache.get(request.player_id).await?;
        let partitions = self.cache.partitions().await?;

        let (ranking, stats) = match request.mode {
            RefreshMode::TopN => {
                let (ranking, stats) = self.refresh_top_n(request, cached, &partitions).await?;
                (Some(ranking), stats)
            }
            RefreshMode::FullRescan => {
                let span = info_span!("full_rescan", player_id = request.player_id);
                span.pb_set_style(&progress_style());
                span.pb_set_length(self.catalog.len() as u64);

                let stats = self.refresh_full(request, cached, &partitions).instrument(span).await?;
                (None, stats)
            }
        };

        info!(
            "Refreshed player {} ({:?}): {} fetched, {} fresh, pruned at {:?}",
            request.player_id, request.mode, stats.fetched, stats.skipped_fresh, stats.pruned_at
        );

        Ok((ranking, stats))
    }

    async fn refresh_top_n(
        &self,
        request: &RefreshRequest,
        cached: Vec<ScoreRecord>,
        partitions: &HashSet<i32>
    ) -> Result<(RankingResult, RefreshStats), ProcessorError> {
        let mut ranking = BoundedRanking::new(self.config.capacity);
        for record in cached.iter().take(self.config.capacity) {
            ranking.push(record.clone());
        }

        let by_key = index_by_key(cached);
        let mut stats = RefreshStats::default();

        for (position, entry) in self.catalog.iter().enumerate() {
            if !ranking.can_improve(&entry.rating) {
                debug!(
                    "Stopping at position {} ({} {}): threshold {:.5}",
                    position,
                    entry.song_id,
                    entry.rating,
                    ranking.threshold()
                );
                stats.pruned_at = Some(position);
                break;
            }

            let cached_record = by_key.get(&entry.key());
            if let Some(record) = cached_record.filter(|r| r.is_fresh(request.last_activity_millis)) {
                stats.skipped_fresh += 1;
                ranking.push(record.clone());
                continue;
            }

            let fetched = self.fetch_and_merge(request.player_id, entry, partitions).await?;
            stats.fetched += 1;

            // The remote list is capped, so a known play may be missing from it
            if let Some(record) = fetched.or_else(|| cached_record.cloned()) {
                ranking.push(record);
            }

            self.pause().await;
        }

        Ok((
            RankingResult::new(request.player_id, ranking.into_sorted_vec()),
            stats
        ))
    }

    async fn refresh_full(
        &self,
        request: &RefreshRequest,
        cached: Vec<ScoreRecord>,
        partitions: &HashSet<i32>
    ) -> Result<RefreshStats, ProcessorError> {
        let by_key = index_by_key(cached);
        let mut stats = RefreshStats::default();

        for entry in self.catalog.iter() {
            Span::current().pb_inc(1);

            let is_fresh = by_key
                .get(&entry.key())
                .is_some_and(|r| r.is_fresh(request.last_activity_millis));
            if is_fresh {
                stats.skipped_fresh += 1;
                continue;
            }

            self.fetch_and_merge(request.player_id, entry, partitions).await?;
            stats.fetched += 1;

            self.pause().await;
        }

        Ok(stats)
    }

    /// Fetches one chart's friend leaderboard and writes every row that
    /// belongs to a cached player. Returns the requested player's record.
    async fn fetch_and_merge(
        &self,
        player_id: i32,
        entry: &CatalogEntry,
        partitions: &HashSet<i32>
    ) -> Result<Option<ScoreRecord>, ProcessorError> {
        let scores = self.api.fetch_friend_scores(&entry.song_id, entry.difficulty).await?;
        let cached_at = Utc::now().timestamp_millis();

        let mut target = None;
        for score in scores.iter().filter(|s| partitions.contains(&s.player_id)) {
            let record = ScoreRecord::from_friend_score(entry, score, cached_at);
            self.cache.upsert(&record).await?;

            if record.player_id == player_id {
                target = Some(record);
            }
        }

        debug!(
            "Fetched {} {}: {} rows, target present: {}",
            entry.song_id,
            entry.difficulty,
            scores.len(),
            target.is_some()
        );

        Ok(target)
    }

    async fn pause(&self) {
        if !self.config.fetch_delay.is_zero() {
            tokio::time::sleep(self.config.fetch_delay).await;
        }
    }
}

fn index_by_key(records: Vec<ScoreRecord>) -> HashMap<ChartKey, ScoreRecord> {
    records.into_iter().map(|r| (r.key(), r)).collect()
}

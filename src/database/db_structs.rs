use crate::{
    api::api_structs::FriendScore,
    catalog::CatalogEntry,
    model::{
        potential::potential,
        structures::{chart_rating::ChartRating, difficulty::Difficulty}
    }
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Identifies one chart within a player's partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChartKey {
    pub song_index: i32,
    pub difficulty: Difficulty
}

/// Best known performance of a player on one chart.
///
/// Rows are keyed by `(player_id, song_index, difficulty)`. The `potential`
/// field is always derived from `score` and `rating`; build records through
/// [`ScoreRecord::from_friend_score`] rather than by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub player_id: i32,
    pub song_index: i32,
    pub difficulty: Difficulty,
    pub song_id: String,
    pub rating: ChartRating,
    pub played_at_millis: i64,
    /// When this row was last written from a remote fetch
    pub cached_at_millis: i64,
    pub score: i32,
    pub clear_type: i32,
    pub potential: f64
}

impl ScoreRecord {
    pub fn from_friend_score(entry: &CatalogEntry, score: &FriendScore, cached_at_millis: i64) -> Self {
        ScoreRecord {
            player_id: score.player_id,
            song_index: entry.song_index,
            difficulty: entry.difficulty,
            song_id: entry.song_id.clone(),
            rating: entry.rating.clone(),
            played_at_millis: score.played_at_millis,
            cached_at_millis,
            score: score.score,
            clear_type: score.clear_type,
            potential: potential(score.score, &entry.rating)
        }
    }

    pub fn key(&self) -> ChartKey {
        ChartKey {
            song_index: self.song_index,
            difficulty: self.difficulty
        }
    }

    /// Ranking order: `Less` when `self` ranks above `other`.
    ///
    /// Higher potential first. Equal potentials go to the higher rated chart,
    /// which the catalog walk reaches first, then to the lower chart key.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .potential
            .total_cmp(&self.potential)
            .then_with(|| other.rating.cmp(&self.rating))
            .then_with(|| self.key().cmp(&other.key()))
    }

    /// A player whose last activity predates this row cannot have set a
    /// newer score on the chart since it was cached.
    pub fn is_fresh(&self, last_activity_millis: i64) -> bool {
        last_activity_millis <= self.cached_at_millis
    }
}

use crate::{
    database::db_structs::ScoreRecord,
    model::constants::{BEST_N, MAX_AVERAGE_EXTRA, TOP_N}
};
use serde::{Deserialize, Serialize};

/// A completed best-30 ranking for one player.
///
/// Holds at most 33 records ordered by potential, highest first: the best 30
/// followed by up to 3 overflow entries. Aggregates are derived on demand and
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingResult {
    pub player_id: i32,
    pub entries: Vec<ScoreRecord>
}

impl RankingResult {
    pub fn new(player_id: i32, entries: Vec<ScoreRecord>) -> Self {
        RankingResult { player_id, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn top30(&self) -> &[ScoreRecord] {
        &self.entries[..self.entries.len().min(BEST_N)]
    }

    pub fn overflow(&self) -> &[ScoreRecord] {
        &self.entries[self.entries.len().min(BEST_N)..]
    }

    /// Mean over the best 30 slots. Empty slots count as zero, so a player
    /// with fewer than 30 plays is averaged over 30 all the same.
    pub fn top30_average(&self) -> f64 {
        sum_potential(self.top30()) / BEST_N as f64
    }

    pub fn top10_average(&self) -> f64 {
        sum_potential(&self.entries[..self.entries.len().min(TOP_N)]) / TOP_N as f64
    }

    /// Estimated contribution of the recent plays to the overall rating:
    /// `4 * (overall - 0.75 * top30_average)`.
    ///
    /// `None` when the player hides their overall rating.
    pub fn projected_overall_delta(&self, overall_rating_fraction: Option<f64>) -> Option<f64> {
        overall_rating_fraction.map(|overall| 4.0 * (overall - 0.75 * self.top30_average()))
    }

    /// `(sum(best 30) + sum(next 10)) / 40`
    ///
    /// Only the entries actually held count toward the second term, so with
    /// the default capacity of 33 it sums at most 3 records. The divisor stays 40.
    pub fn max_possible_average(&self) -> f64 {
        let extra_end = self.entries.len().min(BEST_N + MAX_AVERAGE_EXTRA);
        let extra = &self.entries[self.entries.len().min(BEST_N)..extra_end];

        (sum_potential(self.top30()) + sum_potential(extra)) / (BEST_N + MAX_AVERAGE_EXTRA) as f64
    }
}

fn sum_potential(records: &[ScoreRecord]) -> f64 {
    records.iter().map(|r| r.potential).sum()
}

pub mod db;
pub mod db_structs;
pub mod memory;

use crate::database::db_structs::ScoreRecord;
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc
};
use thiserror::Error;
use tokio::sync::Mutex;

pub use db::PgScoreCache;
pub use memory::MemoryScoreCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Database error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[error("{0}")]
    Corruption(String)
}

/// Durable best-score store, partitioned by player.
///
/// Rows are keyed by `(player_id, song_index, difficulty)` and only ever
/// inserted or overwritten; [`ScoreCache::reset`] is the only way to delete.
/// Writes to one partition are serialized so that co-player upserts issued
/// by a refresh of another player never race.
#[async_trait]
pub trait ScoreCache: Send + Sync {
    /// Creates the partition if it does not exist yet
    async fn ensure_partition(&self, player_id: i32) -> Result<(), CacheError>;

    async fn has_partition(&self, player_id: i32) -> Result<bool, CacheError>;

    async fn partitions(&self) -> Result<HashSet<i32>, CacheError>;

    /// All rows of a partition, highest potential first. Unknown partitions are empty.
    async fn get(&self, player_id: i32) -> Result<Vec<ScoreRecord>, CacheError>;

    /// Inserts the row or overwrites the one with the same key, creating the
    /// partition when needed.
    async fn upsert(&self, record: &ScoreRecord) -> Result<(), CacheError>;

    /// Drops every partition and row
    async fn reset(&self) -> Result<(), CacheError>;
}

/// One async mutex per partition, handed out on demand
#[derive(Debug, Default)]
pub struct PartitionLocks {
    locks: Mutex<HashMap<i32, Arc<Mutex<()>>>>
}

impl PartitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock_for(&self, player_id: i32) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(player_id).or_default().clone()
    }
}

/// Orders records by potential descending, see [`ScoreRecord::rank_cmp`] for ties
pub fn sort_by_potential(records: &mut [ScoreRecord]) {
    records.sort_by(|a, b| a.rank_cmp(b));
}

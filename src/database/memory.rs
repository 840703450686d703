use super::{sort_by_potential, CacheError, ScoreCache};
use crate::database::db_structs::{ChartKey, ScoreRecord};
use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc
};
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Default)]
struct Partition {
    rows: HashMap<ChartKey, ScoreRecord>,
    writes: u64
}

/// Process-local score cache.
///
/// Each partition sits behind its own mutex, which is the serialization
/// point for writes to that player. Used when no database is configured and
/// throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryScoreCache {
    partitions: RwLock<HashMap<i32, Arc<Mutex<Partition>>>>
}

impl MemoryScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn partition(&self, player_id: i32) -> Option<Arc<Mutex<Partition>>> {
        self.partitions.read().await.get(&player_id).cloned()
    }

    async fn partition_or_create(&self, player_id: i32) -> Arc<Mutex<Partition>> {
        if let Some(partition) = self.partition(player_id).await {
            return partition;
        }

        self.partitions.write().await.entry(player_id).or_default().clone()
    }

    /// Number of upserts applied to a partition since it was created
    pub async fn write_count(&self, player_id: i32) -> u64 {
        match self.partition(player_id).await {
            Some(partition) => partition.lock().await.writes,
            None => 0
        }
    }
}

#[async_trait]
impl ScoreCache for MemoryScoreCache {
    async fn ensure_partition(&self, player_id: i32) -> Result<(), CacheError> {
        self.partition_or_create(player_id).await;
        Ok(())
    }

    async fn has_partition(&self, player_id: i32) -> Result<bool, CacheError> {
        Ok(self.partitions.read().await.contains_key(&player_id))
    }

    async fn partitions(&self) -> Result<HashSet<i32>, CacheError> {
        Ok(self.partitions.read().await.keys().copied().collect())
    }

    async fn get(&self, player_id: i32) -> Result<Vec<ScoreRecord>, CacheError> {
        let Some(partition) = self.partition(player_id).await else {
            return Ok(Vec::new());
        };

        let mut records: Vec<ScoreRecord> = partition.lock().await.rows.values().cloned().collect();
        sort_by_potential(&mut records);

        Ok(records)
    }

    async fn upsert(&self, record: &ScoreRecord) -> Result<(), CacheError> {
        let partition = self.partition_or_create(record.player_id).await;
        let mut partition = partition.lock().await;

        partition.rows.insert(record.key(), record.clone());
        partition.writes += 1;

        Ok(())
    }

    async fn reset(&self) -> Result<(), CacheError> {
        self.partitions.write().await.clear();
        Ok(())
    }
}

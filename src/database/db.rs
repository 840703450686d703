use super::{sort_by_potential, CacheError, PartitionLocks, ScoreCache};
use crate::{
    database::db_structs::ScoreRecord,
    model::structures::{chart_rating::ChartRating, difficulty::Difficulty}
};
use async_trait::async_trait;
use chrono::Utc;
use postgres_types::ToSql;
use std::{collections::HashSet, sync::Arc};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error, info};

const SCHEMA: &str = include_str!("schema.sql");

/// Score cache backed by PostgreSQL.
///
/// All partitions share the `score_cache` table; `cache_partitions` records
/// which players own a partition. Writes take the partition's lock before
/// touching the database.
#[derive(Clone)]
pub struct PgScoreCache {
    client: Arc<Client>,
    locks: Arc<PartitionLocks>
}

impl PgScoreCache {
    // Connect to the database and make sure the schema exists
    pub async fn connect(connection_str: &str) -> Result<Self, CacheError> {
        let (client, connection) = tokio_postgres::connect(connection_str, NoTls).await?;

        // Spawn the connection object to run in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("connection error: {}", e);
            }
        });

        let cache = PgScoreCache {
            client: Arc::new(client),
            locks: Arc::new(PartitionLocks::new())
        };
        cache.migrate().await?;

        Ok(cache)
    }

    pub async fn migrate(&self) -> Result<(), CacheError> {
        debug!("Applying score cache schema");
        self.client.batch_execute(SCHEMA).await?;
        Ok(())
    }

    pub fn client(&self) -> Arc<Client> {
        self.client.clone()
    }

    async fn insert_partition(&self, player_id: i32) -> Result<(), CacheError> {
        self.client
            .execute(
                "INSERT INTO cache_partitions (player_id, created_at) VALUES ($1, $2)
                 ON CONFLICT (player_id) DO NOTHING",
                &[&player_id, &Utc::now().timestamp_millis()]
            )
            .await?;

        Ok(())
    }

    fn record_from_row(row: &Row) -> Result<ScoreRecord, CacheError> {
        let player_id = row.try_get::<_, i32>("player_id")?;
        let song_index = row.try_get::<_, i32>("song_index")?;
        let raw_difficulty = row.try_get::<_, i32>("difficulty")?;
        let raw_rating = row.try_get::<_, String>("rating")?;

        let difficulty = Difficulty::try_from(raw_difficulty).map_err(|_| {
            CacheError::Corruption(format!(
                "player {} song {} has unknown difficulty {}",
                player_id, song_index, raw_difficulty
            ))
        })?;
        let rating = ChartRating::parse(&raw_rating).map_err(|e| {
            CacheError::Corruption(format!("player {} song {} has bad rating: {}", player_id, song_index, e))
        })?;

        Ok(ScoreRecord {
            player_id,
            song_index,
            difficulty,
            song_id: row.try_get::<_, String>("song_id")?,
            rating,
            played_at_millis: row.try_get::<_, i64>("played_at")?,
            cached_at_millis: row.try_get::<_, i64>("cached_at")?,
            score: row.try_get::<_, i32>("score")?,
            clear_type: row.try_get::<_, i32>("clear_type")?,
            potential: row.try_get::<_, f64>("potential")?
        })
    }
}

#[async_trait]
impl ScoreCache for PgScoreCache {
    async fn ensure_partition(&self, player_id: i32) -> Result<(), CacheError> {
        let lock = self.locks.lock_for(player_id).await;
        let _guard = lock.lock().await;

        self.insert_partition(player_id).await
    }

    async fn has_partition(&self, player_id: i32) -> Result<bool, CacheError> {
        let row = self
            .client
            .query_opt("SELECT 1 FROM cache_partitions WHERE player_id = $1", &[&player_id])
            .await?;

        Ok(row.is_some())
    }

    async fn partitions(&self) -> Result<HashSet<i32>, CacheError> {
        let rows = self.client.query("SELECT player_id FROM cache_partitions", &[]).await?;

        rows.iter()
            .map(|row| row.try_get::<_, i32>("player_id").map_err(CacheError::from))
            .collect()
    }

    async fn get(&self, player_id: i32) -> Result<Vec<ScoreRecord>, CacheError> {
        let rows = self
            .client
            .query(
                "SELECT player_id, song_index, difficulty, song_id, rating, played_at, cached_at,
                        score, clear_type, potential
                 FROM score_cache
                 WHERE player_id = $1
                 ORDER BY potential DESC",
                &[&player_id]
            )
            .await?;

        // Ties need the numeric rating, which is stored as text
        let mut records = rows.iter().map(Self::record_from_row).collect::<Result<Vec<_>, _>>()?;
        sort_by_potential(&mut records);

        Ok(records)
    }

    async fn upsert(&self, record: &ScoreRecord) -> Result<(), CacheError> {
        let lock = self.locks.lock_for(record.player_id).await;
        let _guard = lock.lock().await;

        let difficulty = record.difficulty as i32;
        let params: [&(dyn ToSql + Sync); 10] = [
            &record.player_id,
            &record.song_index,
            &difficulty,
            &record.song_id,
            &record.rating.nominal(),
            &record.played_at_millis,
            &record.cached_at_millis,
            &record.score,
            &record.clear_type,
            &record.potential
        ];

        self.insert_partition(record.player_id).await?;
        self.client
            .execute(
                "INSERT INTO score_cache (player_id, song_index, difficulty, song_id, rating, played_at,
                                          cached_at, score, clear_type, potential)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                 ON CONFLICT (player_id, song_index, difficulty) DO UPDATE SET
                    song_id = EXCLUDED.song_id,
                    rating = EXCLUDED.rating,
                    played_at = EXCLUDED.played_at,
                    cached_at = EXCLUDED.cached_at,
                    score = EXCLUDED.score,
                    clear_type = EXCLUDED.clear_type,
                    potential = EXCLUDED.potential",
                &params
            )
            .await?;

        Ok(())
    }

    async fn reset(&self) -> Result<(), CacheError> {
        info!("Truncating score cache");
        self.client
            .batch_execute("TRUNCATE TABLE score_cache, cache_partitions RESTART IDENTITY CASCADE")
            .await?;

        Ok(())
    }
}

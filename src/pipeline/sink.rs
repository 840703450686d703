use crate::{
    catalog::SongCatalog,
    messaging::PublisherError,
    pipeline::{report::RankingReport, RenderJob}
};
use async_trait::async_trait;
use std::{
    path::{Path, PathBuf},
    sync::Arc
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to write ranking: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize ranking: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to publish ranking: {0}")]
    Publish(#[from] PublisherError),

    #[error("Sink rejected ranking for player {0}")]
    Rejected(i32)
}

/// Final stage of the pipeline: turns a completed ranking into an artifact
#[async_trait]
pub trait RankingSink: Send + Sync {
    async fn render(&self, job: &RenderJob) -> Result<(), SinkError>;
}

/// Writes one `<player_id>.json` report per ranking into a directory
pub struct JsonFileSink {
    output_dir: PathBuf,
    catalog: Arc<SongCatalog>
}

impl JsonFileSink {
    pub fn new(output_dir: impl Into<PathBuf>, catalog: Arc<SongCatalog>) -> Self {
        JsonFileSink {
            output_dir: output_dir.into(),
            catalog
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, player_id: i32) -> PathBuf {
        self.output_dir.join(format!("{}.json", player_id))
    }
}

#[async_trait]
impl RankingSink for JsonFileSink {
    async fn render(&self, job: &RenderJob) -> Result<(), SinkError> {
        let report = RankingReport::build(job, &self.catalog);
        let payload = serde_json::to_vec_pretty(&report)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let path = self.path_for(job.ranking.player_id);
        tokio::fs::write(&path, payload).await?;

        debug!("Wrote ranking for player {} to {}", job.ranking.player_id, path.display());
        Ok(())
    }
}

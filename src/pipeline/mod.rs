pub mod report;
pub mod sink;

use crate::{
    api::api_structs::PlayerProfile,
    model::{
        engine::{RankingEngine, RefreshRequest},
        ranking_result::RankingResult
    }
};
use chrono::{DateTime, Utc};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc
};
use thiserror::Error;
use tokio::{
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle
};
use tracing::{debug, error, info};

pub use report::RankingReport;
pub use sink::{JsonFileSink, RankingSink, SinkError};

/// Default depth of the admission queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Pipeline is no longer accepting requests")]
    Closed,

    #[error("Pipeline worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError)
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Requests admitted but not yet picked up by the fetch stage
    pub queue_capacity: usize,
    /// Rankings waiting for the render stage
    pub render_capacity: usize
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            render_capacity: DEFAULT_QUEUE_CAPACITY
        }
    }
}

/// A finished ranking handed to the render stage
#[derive(Debug, Clone, PartialEq)]
pub struct RenderJob {
    pub profile: PlayerProfile,
    pub ranking: RankingResult,
    pub generated_at: DateTime<Utc>
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub submitted: usize,
    pub refreshed: usize,
    pub failed: usize,
    pub rendered: usize,
    pub render_failed: usize
}

#[derive(Debug, Default)]
struct StageCounts {
    succeeded: usize,
    failed: usize
}

/// Two-stage refresh pipeline.
///
/// Stage one refreshes requests strictly in submission order, one at a
/// time; stage two renders finished rankings in the order they were
/// produced. Both stages are fed by bounded channels, so `submit` waits
/// while the queue is full. A failed request is logged and dropped, never
/// retried, and does not hold up the requests behind it.
pub struct PipelineCoordinator {
    requests: Sender<RefreshRequest>,
    submitted: AtomicUsize,
    fetch_worker: JoinHandle<StageCounts>,
    render_worker: JoinHandle<StageCounts>
}

impl PipelineCoordinator {
    pub fn start(engine: Arc<RankingEngine>, sink: Arc<dyn RankingSink>, config: PipelineConfig) -> Self {
        let (request_tx, request_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (render_tx, render_rx) = mpsc::channel(config.render_capacity.max(1));

        let fetch_worker = tokio::spawn(run_fetch_stage(engine, request_rx, render_tx));
        let render_worker = tokio::spawn(run_render_stage(sink, render_rx));

        info!(
            "Pipeline started (queue capacity {}, render capacity {})",
            config.queue_capacity, config.render_capacity
        );

        PipelineCoordinator {
            requests: request_tx,
            submitted: AtomicUsize::new(0),
            fetch_worker,
            render_worker
        }
    }

    /// Queues a request, waiting for room if the admission queue is full
    pub async fn submit(&self, request: RefreshRequest) -> Result<(), PipelineError> {
        self.requests.send(request).await.map_err(|_| PipelineError::Closed)?;
        self.submitted.fetch_add(1, Ordering::Relaxed);

        Ok(())
    }

    /// Stops admission, lets both stages drain, and reports what happened
    pub async fn shutdown(self) -> Result<PipelineStats, PipelineError> {
        let PipelineCoordinator {
            requests,
            submitted,
            fetch_worker,
            render_worker
        } = self;

        drop(requests);

        let fetched = fetch_worker.await?;
        let rendered = render_worker.await?;

        let stats = PipelineStats {
            submitted: submitted.into_inner(),
            refreshed: fetched.succeeded,
            failed: fetched.failed,
            rendered: rendered.succeeded,
            render_failed: rendered.failed
        };

        info!("Pipeline drained: {:?}", stats);
        Ok(stats)
    }
}

async fn run_fetch_stage(
    engine: Arc<RankingEngine>,
    mut requests: Receiver<RefreshRequest>,
    renders: Sender<RenderJob>
) -> StageCounts {
    let mut counts = StageCounts::default();

    while let Some(request) = requests.recv().await {
        match engine.refresh(&request).await {
            Ok(Some(ranking)) => {
                counts.succeeded += 1;

                let job = RenderJob {
                    profile: request.profile,
                    ranking,
                    generated_at: Utc::now()
                };
                if renders.send(job).await.is_err() {
                    error!("Render stage stopped, dropping ranking for player {}", request.player_id);
                }
            }
            Ok(None) => {
                counts.succeeded += 1;
                debug!("Full rescan of player {} complete", request.player_id);
            }
            Err(e) => {
                counts.failed += 1;
                error!("Refresh of player {} failed: {}", request.player_id, e);
            }
        }
    }

    counts
}

async fn run_render_stage(sink: Arc<dyn RankingSink>, mut jobs: Receiver<RenderJob>) -> StageCounts {
    let mut counts = StageCounts::default();

    while let Some(job) = jobs.recv().await {
        match sink.render(&job).await {
            Ok(()) => counts.succeeded += 1,
            Err(e) => {
                counts.failed += 1;
                error!("Rendering ranking for player {} failed: {}", job.ranking.player_id, e);
            }
        }
    }

    counts
}

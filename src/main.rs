use b30_processor::{
    api::{resolve_players, WebApiClient},
    args::Args,
    catalog::SongCatalog,
    database::{MemoryScoreCache, PgScoreCache, ScoreCache},
    messaging::{RabbitMqConfig, RabbitMqPublisher, RabbitMqSink},
    model::{EngineConfig, RankingEngine, RefreshRequest},
    pipeline::{JsonFileSink, PipelineConfig, PipelineCoordinator, RankingSink},
    utils::logging::init_tracing
};
use clap::Parser;
use std::{process, sync::Arc, time::Duration};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args.log_level);

    let catalog = match SongCatalog::load(&args.catalog) {
        Ok(catalog) => Arc::new(catalog),
        Err(e) => fatal(&format!("Failed to load catalog: {}", e))
    };

    let cache = cache(&args).await;
    if args.reset_cache {
        warn!("Resetting score cache");
        if let Err(e) = cache.reset().await {
            fatal(&format!("Failed to reset score cache: {}", e));
        }
    }

    let client = match WebApiClient::new(&args.api_root, Duration::from_secs(args.timeout_secs)) {
        Ok(client) => client,
        Err(e) => fatal(&format!("Failed to build HTTP client: {}", e))
    };
    match (&args.email, &args.password) {
        (Some(email), Some(password)) => {
            if let Err(e) = client.login(email, password).await {
                fatal(&e.to_string());
            }
        }
        _ => warn!("No credentials configured, friend leaderboards will likely be rejected")
    }

    let profiles = match resolve_players(&client, &args.players).await {
        Ok(profiles) => profiles,
        Err(e) => fatal(&format!("Failed to resolve players: {}", e))
    };
    info!("Refreshing {} players ({:?})", profiles.len(), args.mode);

    let (sink, publisher) = sink(&args, catalog.clone()).await;
    let engine = Arc::new(RankingEngine::new(
        catalog,
        cache,
        Arc::new(client),
        EngineConfig {
            fetch_delay: Duration::from_millis(args.fetch_delay_ms),
            ..Default::default()
        }
    ));
    let coordinator = PipelineCoordinator::start(
        engine,
        sink,
        PipelineConfig {
            queue_capacity: args.queue_capacity,
            ..Default::default()
        }
    );

    for profile in profiles {
        if let Err(e) = coordinator.submit(RefreshRequest::new(profile, args.mode)).await {
            error!("{}", e);
            break;
        }
    }

    match coordinator.shutdown().await {
        Ok(stats) => info!(
            "Done: {} submitted, {} refreshed, {} failed, {} rendered, {} render failures",
            stats.submitted, stats.refreshed, stats.failed, stats.rendered, stats.render_failed
        ),
        Err(e) => error!("{}", e)
    }

    if let Some(publisher) = publisher {
        if let Err(e) = publisher.close().await {
            warn!("Failed to close RabbitMQ connection: {}", e);
        }
    }
}

fn fatal(message: &str) -> ! {
    error!("{}", message);
    process::exit(1);
}

async fn cache(args: &Args) -> Arc<dyn ScoreCache> {
    match &args.connection_string {
        Some(connection_string) => match PgScoreCache::connect(connection_string).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => fatal(&format!("Failed to connect to the score cache: {}", e))
        },
        None => {
            info!("No connection string configured, caching scores in memory");
            Arc::new(MemoryScoreCache::new())
        }
    }
}

async fn sink(args: &Args, catalog: Arc<SongCatalog>) -> (Arc<dyn RankingSink>, Option<Arc<RabbitMqSink>>) {
    if !args.publish {
        let sink: Arc<dyn RankingSink> = Arc::new(JsonFileSink::new(&args.output_dir, catalog));
        return (sink, None);
    }

    let config = match RabbitMqConfig::from_env() {
        Ok(config) => config,
        Err(e) => fatal(&format!("RabbitMQ configuration is incomplete: {}", e))
    };

    match RabbitMqPublisher::connect_from_config(&config).await {
        Ok(publisher) => {
            let publisher = Arc::new(RabbitMqSink::new(publisher));
            let sink: Arc<dyn RankingSink> = publisher.clone();
            (sink, Some(publisher))
        }
        Err(e) => fatal(&format!("Failed to connect to RabbitMQ: {}", e))
    }
}

//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together:
//! the store, the event bus, the model registry, the scheduler, and the
//! pipeline executor are all constructed here and handed to the router.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;

use transcribe_core::ports::{Repos, SystemProbePort};
use transcribe_core::settings::Settings;
use transcribe_db::{setup_database, StoreFactory};
use transcribe_engines::DefaultSystemProbe;
use transcribe_pipeline::{
    AdapterFactory, FfmpegDemuxer, FfmpegVideoMuxer, PipelineDeps, PipelineExecutor, ProcessAdapterFactory,
};
use transcribe_queue::models::LocalModelFetcher;
use transcribe_queue::{ModelRegistry, Scheduler, SchedulerConfig};

use crate::sse::BroadcastEventBus;

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    #[default]
    AllowAll,
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub settings: Settings,
    pub static_dir: Option<PathBuf>,
    pub cors: CorsConfig,
}

impl ServerConfig {
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            port: 8080,
            settings: Settings::from_env(),
            static_dir: None,
            cors: CorsConfig::default(),
        }
    }
}

/// Application context shared by every handler.
pub struct AxumContext {
    pub repos: Repos,
    pub events: Arc<BroadcastEventBus>,
    pub models: Arc<ModelRegistry>,
    pub scheduler: Arc<Scheduler>,
    pub executor: Arc<PipelineExecutor>,
    pub adapters: Arc<dyn AdapterFactory>,
    pub probe: Arc<dyn SystemProbePort>,
    pub settings: RwLock<Settings>,
}

/// Bootstrap every service the router needs, and spawn the worker loop
/// that drives admitted jobs through the pipeline executor.
pub async fn bootstrap(config: &ServerConfig) -> Result<AxumContext> {
    let settings = config.settings.clone();
    let db_path = settings
        .store_url
        .strip_prefix("sqlite://")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("transcribe.db"));

    let pool = setup_database(&db_path).await?;
    let repos = StoreFactory::build_repos(pool);

    let events = Arc::new(BroadcastEventBus::with_defaults());
    let probe: Arc<dyn SystemProbePort> = Arc::new(DefaultSystemProbe::new());

    let scheduler = Arc::new(
        Scheduler::new(
            repos.jobs.clone(),
            events.clone() as Arc<dyn transcribe_core::ports::EventBus>,
            probe.as_ref(),
            SchedulerConfig {
                max_concurrency: Some(settings.default_concurrency),
            },
        )
        .await?,
    );

    let models = Arc::new(ModelRegistry::new(
        repos.models.clone(),
        Arc::new(LocalModelFetcher),
        events.clone() as Arc<dyn transcribe_core::ports::EventBus>,
    ));

    let adapters: Arc<dyn AdapterFactory> = Arc::new(ProcessAdapterFactory::new(
        settings.default_device,
        settings.compute_precision,
    ));

    let executor = Arc::new(PipelineExecutor::new(PipelineDeps {
        jobs: repos.jobs.clone(),
        batches: repos.batches.clone(),
        transcripts: repos.transcripts.clone(),
        models: repos.models.clone(),
        events: events.clone() as Arc<dyn transcribe_core::ports::EventBus>,
        adapters: adapters.clone(),
        demuxer: Arc::new(FfmpegDemuxer::new("ffmpeg")),
        muxer: Arc::new(FfmpegVideoMuxer::new("ffmpeg")),
    }));

    spawn_worker_loop(scheduler.clone(), executor.clone());

    Ok(AxumContext {
        repos,
        events,
        models,
        scheduler,
        executor,
        adapters,
        probe,
        settings: RwLock::new(settings),
    })
}

/// Drives admitted jobs through the pipeline executor, one task per
/// running job, bounded by the scheduler's admission limit
/// (`spec.md` §5).
fn spawn_worker_loop(scheduler: Arc<Scheduler>, executor: Arc<PipelineExecutor>) {
    tokio::spawn(async move {
        loop {
            while let Some(job) = scheduler.try_admit().await {
                let scheduler = scheduler.clone();
                let executor = executor.clone();
                tokio::spawn(async move {
                    executor.run_job(job).await;
                    scheduler.release_slot();
                });
            }
            scheduler.notified().await;
        }
    });
}

/// Start the web server, serving static assets from `config.static_dir`
/// if set.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;
    use tracing::info;

    let ctx = bootstrap(&config).await?;

    let app = if let Some(ref static_dir) = config.static_dir {
        crate::routes::create_spa_router(ctx, static_dir, &config.cors)
    } else {
        crate::routes::create_router(ctx, &config.cors)
    };

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "transcription engine listening");
    axum::serve(listener, app).await?;
    Ok(())
}

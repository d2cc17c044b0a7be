pub mod adapters;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod sensing;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use adapters::{Adapter, AdapterDispatcher, LightingAdapter, SoundAdapter, WorkspaceAdapter};
use config::{Config, ConfigStore};
use db::Database;
use engine::{RecommendationEngine, RidgeModel};
use scheduler::{Scheduler, TickPipeline};
use sensing::{CalendarCollector, Collector, ContextAggregator, SystemCollector, TimeCollector};
use storage::{FeedbackStore, MemoryStore};

pub use error::{EnvError, EnvResult};

/// Wire the reference collectors, adapters and ridge model into a scheduler.
///
/// Collector order matters for key collisions (later wins); adapter order is dispatch order.
pub fn build_scheduler(config: &Config, storage: Arc<dyn FeedbackStore>) -> EnvResult<Scheduler> {
    config.validate().map_err(EnvError::Config)?;

    let mut collectors: Vec<Arc<dyn Collector>> =
        vec![Arc::new(TimeCollector::new()), Arc::new(SystemCollector::new())];
    if let Some(path) = &config.calendar_path {
        collectors.push(Arc::new(CalendarCollector::new(path.clone())));
    }

    let adapters: Vec<Arc<dyn Adapter>> = vec![
        Arc::new(LightingAdapter::new()),
        Arc::new(SoundAdapter::new()),
        Arc::new(WorkspaceAdapter::new()),
    ];

    let engine = RecommendationEngine::new(
        storage,
        Box::new(RidgeModel::new(config.ridge_lambda)),
        config.engine_config(),
    );

    let pipeline = TickPipeline::new(
        ContextAggregator::new(collectors),
        Arc::new(engine),
        AdapterDispatcher::new(adapters),
    );
    Scheduler::new(pipeline, config.tick_interval_secs)
}

fn open_storage(config: &Config, data_dir: &std::path::Path) -> Arc<dyn FeedbackStore> {
    let db_path = config.database_path(data_dir);
    match Database::new(db_path.clone()) {
        Ok(database) => {
            info!("feedback database at {}", db_path.display());
            Arc::new(database)
        }
        Err(err) => {
            warn!("database unavailable ({err:#}); feedback will only be kept in memory");
            Arc::new(MemoryStore::new())
        }
    }
}

pub fn run() -> Result<()> {
    utils::init_logging();

    info!("envsense starting up...");

    let data_dir = config::data_dir()?;
    let config_store = ConfigStore::open_in(&data_dir)?;
    let config = config_store.get();
    info!("configuration loaded from {}", config_store.path().display());

    let storage = open_storage(&config, &data_dir);
    let scheduler = build_scheduler(&config, storage)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(async {
        scheduler.start().await;
        let signal = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
        scheduler.stop().await;
        signal.context("failed to listen for ctrl-c")
    })
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::adapters::{AdapterDispatcher, DispatchReport};
use crate::engine::RecommendationEngine;
use crate::models::{ContextSnapshot, Recommendation};
use crate::sensing::{Aggregation, ContextAggregator};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info};

/// Everything one tick observed and did.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub started_at: DateTime<Utc>,
    pub snapshot: ContextSnapshot,
    pub recommendation: Recommendation,
    pub dispatch: DispatchReport,
    pub collector_failures: Vec<String>,
}

/// aggregate -> recommend -> dispatch, shared between the loop and direct callers.
pub struct TickPipeline {
    aggregator: ContextAggregator,
    engine: Arc<RecommendationEngine>,
    dispatcher: AdapterDispatcher,
    ticks_completed: AtomicU64,
    last_report: Mutex<Option<TickReport>>,
    /// Held for a whole tick so manual and scheduled ticks never overlap.
    tick_lock: Mutex<()>,
}

impl TickPipeline {
    pub fn new(
        aggregator: ContextAggregator,
        engine: Arc<RecommendationEngine>,
        dispatcher: AdapterDispatcher,
    ) -> Self {
        Self {
            aggregator,
            engine,
            dispatcher,
            ticks_completed: AtomicU64::new(0),
            last_report: Mutex::new(None),
            tick_lock: Mutex::new(()),
        }
    }

    pub fn engine(&self) -> &Arc<RecommendationEngine> {
        &self.engine
    }

    pub fn dispatcher(&self) -> &AdapterDispatcher {
        &self.dispatcher
    }

    pub fn ticks_completed(&self) -> u64 {
        self.ticks_completed.load(Ordering::SeqCst)
    }

    pub fn last_report(&self) -> Option<TickReport> {
        match self.last_report.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Run one tick on the calling thread, waiting for any tick already in progress.
    /// Collaborator failures are logged and folded into the report; nothing here returns an
    /// error.
    pub fn run_tick(&self) -> TickReport {
        let _tick = match self.tick_lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let started_at = Utc::now();
        let tick_start = Instant::now();

        let Aggregation { snapshot, failures } = self.aggregator.aggregate();

        let recommendation = self.engine.get_recommendations(&snapshot);
        log_debug!("[tick:recommend] {}", self.engine.explain(&snapshot));

        let dispatch = self.dispatcher.dispatch(&recommendation.to_settings());
        if !dispatch.any_applied() {
            log_debug!("[tick:dispatch] no adapter applied settings this tick");
        }

        let report = TickReport {
            started_at,
            snapshot,
            recommendation,
            dispatch,
            collector_failures: failures.iter().map(ToString::to_string).collect(),
        };

        match self.last_report.lock() {
            Ok(mut guard) => *guard = Some(report.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(report.clone()),
        }
        self.ticks_completed.fetch_add(1, Ordering::SeqCst);
        log_debug!("tick finished in {}ms", tick_start.elapsed().as_millis());

        report
    }
}

/// Tick, then sleep the configured interval, until cancelled. Cancellation is only observed
/// between ticks so an in-flight tick always completes.
pub(crate) async fn tick_loop(
    pipeline: Arc<TickPipeline>,
    interval_secs: Arc<AtomicU64>,
    cancel_token: CancellationToken,
) {
    log_info!("scheduler loop started");

    loop {
        let worker = Arc::clone(&pipeline);
        if let Err(err) = tokio::task::spawn_blocking(move || worker.run_tick()).await {
            log_error!("[tick] worker failed to complete: {err}");
        }

        let pause = Duration::from_secs(interval_secs.load(Ordering::SeqCst));
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = cancel_token.cancelled() => break,
        }
    }

    log_info!("scheduler loop shutting down");
}

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::adapters::AdapterDispatcher;
use crate::engine::RecommendationEngine;
use crate::error::{EnvError, EnvResult};
use crate::models::{ContextSnapshot, FeedbackRecord, Recommendation, Settings};

use super::loop_worker::{tick_loop, TickPipeline, TickReport};
use super::state::{SchedulerStatus, WorkerState};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

pub const MIN_INTERVAL_SECS: u64 = 10;
pub const MAX_INTERVAL_SECS: u64 = 3600;
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the background tick worker.
///
/// Cheap to clone; clones share the same worker slot and pipeline.
#[derive(Clone)]
pub struct Scheduler {
    pipeline: Arc<TickPipeline>,
    interval_secs: Arc<AtomicU64>,
    worker: Arc<Mutex<WorkerState>>,
}

impl Scheduler {
    pub fn new(pipeline: TickPipeline, interval_secs: u64) -> EnvResult<Self> {
        validate_interval(interval_secs)?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            interval_secs: Arc::new(AtomicU64::new(interval_secs)),
            worker: Arc::new(Mutex::new(WorkerState::Stopped)),
        })
    }

    /// Spawn the tick worker. Returns `false` without doing anything if one is already running.
    ///
    /// A worker left over from a timed-out `stop` is joined first, so at most one tick loop
    /// exists at any time. Must be called from within a tokio runtime.
    pub async fn start(&self) -> bool {
        let mut worker = self.worker.lock().await;
        match std::mem::take(&mut *worker) {
            running @ WorkerState::Running { .. } => {
                *worker = running;
                return false;
            }
            WorkerState::Draining { handle } => {
                log_info!("waiting for the previous tick loop to finish before restarting");
                if let Err(err) = handle.await {
                    log_error!("[scheduler] previous tick loop failed to join: {err}");
                }
            }
            WorkerState::Stopped => {}
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.pipeline),
            Arc::clone(&self.interval_secs),
            cancel.clone(),
        ));
        *worker = WorkerState::Running { handle, cancel };
        log_info!(
            "scheduler started with {}s interval",
            self.interval_secs.load(Ordering::SeqCst)
        );
        true
    }

    /// Signal the worker and wait up to [`STOP_TIMEOUT`] for it to finish its current tick.
    /// A no-op when nothing is running.
    ///
    /// On timeout the worker keeps its in-flight tick and is parked as draining; the next
    /// `start` joins it before spawning a replacement.
    pub async fn stop(&self) {
        let mut worker = self.worker.lock().await;
        let (mut handle, cancel) = match std::mem::take(&mut *worker) {
            WorkerState::Running { handle, cancel } => (handle, cancel),
            idle => {
                *worker = idle;
                return;
            }
        };
        cancel.cancel();

        match tokio::time::timeout(STOP_TIMEOUT, &mut handle).await {
            Ok(Ok(())) => log_info!("scheduler stopped"),
            Ok(Err(err)) => log_error!("[scheduler] tick loop task failed to join: {err}"),
            Err(_) => {
                log_warn!(
                    "[scheduler] tick loop did not finish within {}s, leaving it to drain",
                    STOP_TIMEOUT.as_secs()
                );
                *worker = WorkerState::Draining { handle };
            }
        }
    }

    pub async fn status(&self) -> SchedulerStatus {
        self.worker.lock().await.status()
    }

    pub async fn is_running(&self) -> bool {
        self.status().await == SchedulerStatus::Running
    }

    /// Change the pause between ticks. Picked up by the next sleep.
    pub fn set_interval(&self, seconds: u64) -> EnvResult<()> {
        validate_interval(seconds)?;
        self.interval_secs.store(seconds, Ordering::SeqCst);
        log_info!("scheduler interval set to {seconds}s");
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.load(Ordering::SeqCst))
    }

    /// One synchronous tick outside the loop. Blocks; use `spawn_blocking` from async code.
    pub fn run_tick(&self) -> TickReport {
        self.pipeline.run_tick()
    }

    /// Ask the engine directly, without collecting or dispatching. Feedback stays attributed
    /// to the last tick's context.
    pub fn recommend_now(&self, snapshot: &ContextSnapshot) -> Recommendation {
        self.pipeline.engine().peek_recommendations(snapshot)
    }

    pub fn record_feedback(&self, settings: Settings, satisfaction: f64) -> EnvResult<FeedbackRecord> {
        self.pipeline.engine().record_feedback(settings, satisfaction)
    }

    pub fn engine(&self) -> &Arc<RecommendationEngine> {
        self.pipeline.engine()
    }

    pub fn dispatcher(&self) -> &AdapterDispatcher {
        self.pipeline.dispatcher()
    }

    pub fn ticks_completed(&self) -> u64 {
        self.pipeline.ticks_completed()
    }

    pub fn last_tick(&self) -> Option<TickReport> {
        self.pipeline.last_report()
    }
}

fn validate_interval(seconds: u64) -> EnvResult<()> {
    if (MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&seconds) {
        Ok(())
    } else {
        Err(EnvError::InvalidInterval {
            requested: seconds,
            min: MIN_INTERVAL_SECS,
            max: MAX_INTERVAL_SECS,
        })
    }
}

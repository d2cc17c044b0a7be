use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};

use envsense_lib::adapters::{
    Adapter, AdapterDispatcher, AdapterOutcome, LightingAdapter, WorkspaceAdapter,
};
use envsense_lib::engine::{EngineConfig, RecommendationEngine, RidgeModel};
use envsense_lib::models::{ContextSnapshot, Recommendation, Scalar, Settings};
use envsense_lib::scheduler::{Scheduler, SchedulerStatus, TickPipeline, STOP_TIMEOUT};
use envsense_lib::sensing::{Collector, ContextAggregator};
use envsense_lib::storage::MemoryStore;

struct MorningCollector;

impl Collector for MorningCollector {
    fn name(&self) -> &str {
        "morning"
    }

    fn collect(&self) -> Result<ContextSnapshot> {
        let mut snapshot = ContextSnapshot::new();
        snapshot.insert("time_hour".into(), Scalar::Int(9));
        snapshot.insert("system_cpu_usage".into(), Scalar::Int(30));
        Ok(snapshot)
    }
}

struct BrokenCollector;

impl Collector for BrokenCollector {
    fn name(&self) -> &str {
        "broken"
    }

    fn collect(&self) -> Result<ContextSnapshot> {
        Err(anyhow!("sensor offline"))
    }
}

/// Blocks past the stop timeout on its first call and tracks how many ticks overlap.
#[derive(Default)]
struct SlowFirstCollector {
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl Collector for SlowFirstCollector {
    fn name(&self) -> &str {
        "slow-first"
    }

    fn collect(&self) -> Result<ContextSnapshot> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        if call == 0 {
            std::thread::sleep(STOP_TIMEOUT + Duration::from_millis(1500));
        }
        self.active.fetch_sub(1, Ordering::SeqCst);
        MorningCollector.collect()
    }
}

/// Claims every numeric setting and always errors.
struct FailingAdapter {
    calls: AtomicUsize,
}

impl Adapter for FailingAdapter {
    fn name(&self) -> &str {
        "failing"
    }

    fn supported_settings(&self) -> &[&str] {
        &["lighting_brightness", "sound_volume", "temperature"]
    }

    fn apply_settings(&self, _settings: &Settings) -> Result<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("bus error"))
    }

    fn current_settings(&self) -> Settings {
        Settings::new()
    }
}

struct Fixture {
    scheduler: Scheduler,
    lighting: Arc<LightingAdapter>,
    workspace: Arc<WorkspaceAdapter>,
    failing: Arc<FailingAdapter>,
}

fn fixture(interval_secs: u64) -> Fixture {
    let lighting = Arc::new(LightingAdapter::new());
    let workspace = Arc::new(WorkspaceAdapter::new());
    let failing = Arc::new(FailingAdapter {
        calls: AtomicUsize::new(0),
    });

    let engine = RecommendationEngine::new(
        Arc::new(MemoryStore::new()),
        Box::new(RidgeModel::default()),
        EngineConfig::default(),
    );
    let pipeline = TickPipeline::new(
        ContextAggregator::new(vec![
            Arc::new(MorningCollector) as Arc<dyn Collector>,
            Arc::new(BrokenCollector) as Arc<dyn Collector>,
        ]),
        Arc::new(engine),
        AdapterDispatcher::new(vec![
            failing.clone() as Arc<dyn Adapter>,
            lighting.clone() as Arc<dyn Adapter>,
            workspace.clone() as Arc<dyn Adapter>,
        ]),
    );

    Fixture {
        scheduler: Scheduler::new(pipeline, interval_secs).unwrap(),
        lighting,
        workspace,
        failing,
    }
}

async fn wait_for_ticks(scheduler: &Scheduler, expected: u64) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while scheduler.ticks_completed() < expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {expected} ticks, saw {}",
            scheduler.ticks_completed()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_start_spawns_a_single_worker() {
    let fixture = fixture(3600);

    let mut joins = Vec::new();
    for _ in 0..8 {
        let scheduler = fixture.scheduler.clone();
        joins.push(tokio::spawn(async move { scheduler.start().await }));
    }
    let mut started = 0;
    for join in joins {
        if join.await.unwrap() {
            started += 1;
        }
    }
    assert_eq!(started, 1);

    wait_for_ticks(&fixture.scheduler, 1).await;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(fixture.scheduler.ticks_completed(), 1);

    fixture.scheduler.stop().await;
    assert_eq!(fixture.scheduler.status().await, SchedulerStatus::Stopped);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_then_start_resumes_ticking() {
    let fixture = fixture(3600);

    assert!(fixture.scheduler.start().await);
    assert!(fixture.scheduler.is_running().await);
    wait_for_ticks(&fixture.scheduler, 1).await;

    fixture.scheduler.stop().await;
    assert!(!fixture.scheduler.is_running().await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fixture.scheduler.ticks_completed(), 1);

    assert!(fixture.scheduler.start().await);
    wait_for_ticks(&fixture.scheduler, 2).await;
    fixture.scheduler.stop().await;
}

#[tokio::test]
async fn stop_before_start_does_nothing() {
    let fixture = fixture(60);
    fixture.scheduler.stop().await;
    fixture.scheduler.stop().await;
    assert_eq!(fixture.scheduler.status().await, SchedulerStatus::Stopped);
    assert_eq!(fixture.scheduler.ticks_completed(), 0);
}

#[test]
fn tick_dispatches_past_a_failing_adapter() {
    let fixture = fixture(60);
    let report = fixture.scheduler.run_tick();

    assert_eq!(report.recommendation, Recommendation::default());
    assert_eq!(report.collector_failures.len(), 1);
    assert!(report.collector_failures[0].contains("broken"));
    assert_eq!(report.snapshot["time_hour"], Scalar::Int(9));

    assert_eq!(fixture.failing.calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        report.dispatch.outcome_for("failing"),
        Some(AdapterOutcome::Failed(_))
    ));
    assert_eq!(
        report.dispatch.outcome_for("lighting"),
        Some(&AdapterOutcome::Applied)
    );
    assert_eq!(
        report.dispatch.outcome_for("workspace"),
        Some(&AdapterOutcome::Applied)
    );

    assert_eq!(
        fixture.lighting.current_settings()["lighting_brightness"],
        Scalar::Int(75)
    );
    assert_eq!(
        fixture.workspace.current_settings()["app_arrangement"],
        Scalar::Text("default".into())
    );
}

#[test]
fn direct_query_returns_defaults_without_a_model() {
    let fixture = fixture(60);
    let mut snapshot = ContextSnapshot::new();
    snapshot.insert("time_hour".into(), Scalar::Int(9));
    snapshot.insert("system_cpu_usage".into(), Scalar::Int(30));

    let recommendation = fixture.scheduler.recommend_now(&snapshot);
    assert_eq!(recommendation.lighting_brightness, 75);
    assert_eq!(recommendation.sound_volume, 50);
    assert_eq!(recommendation.temperature, 22);
    assert_eq!(recommendation, Recommendation::default());
    assert_eq!(fixture.scheduler.ticks_completed(), 0);
}

#[test]
fn low_feedback_is_consumed_by_the_next_tick() {
    let fixture = fixture(60);
    fixture.scheduler.run_tick();

    fixture
        .scheduler
        .record_feedback(Recommendation::default().to_settings(), 30.0)
        .unwrap();
    assert!(fixture.scheduler.engine().status().forced_retrain_pending);

    fixture.scheduler.run_tick();
    let status = fixture.scheduler.engine().status();
    assert!(!status.forced_retrain_pending);
    assert!(!status.trained, "low-scored feedback is not training data");
}

#[test]
fn interval_changes_are_validated() {
    let fixture = fixture(60);
    assert!(fixture.scheduler.set_interval(5).is_err());
    fixture.scheduler.set_interval(15).unwrap();
    assert_eq!(fixture.scheduler.interval(), Duration::from_secs(15));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn restart_after_timed_out_stop_never_overlaps_ticks() {
    let collector = Arc::new(SlowFirstCollector::default());
    let engine = RecommendationEngine::new(
        Arc::new(MemoryStore::new()),
        Box::new(RidgeModel::default()),
        EngineConfig::default(),
    );
    let pipeline = TickPipeline::new(
        ContextAggregator::new(vec![collector.clone() as Arc<dyn Collector>]),
        Arc::new(engine),
        AdapterDispatcher::new(vec![Arc::new(LightingAdapter::new()) as Arc<dyn Adapter>]),
    );
    let scheduler = Scheduler::new(pipeline, 3600).unwrap();

    assert!(scheduler.start().await);
    while collector.calls.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    scheduler.stop().await;
    assert_eq!(scheduler.status().await, SchedulerStatus::Stopped);
    assert_eq!(scheduler.ticks_completed(), 0, "slow tick should still be in flight");

    assert!(scheduler.start().await);
    wait_for_ticks(&scheduler, 2).await;
    scheduler.stop().await;

    assert_eq!(collector.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(collector.calls.load(Ordering::SeqCst), 2);
}

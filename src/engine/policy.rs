use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Duration, Utc};

/// Why the engine decided to refit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetrainReason {
    Forced,
    NeverTrained,
    Stale,
    NewData(usize),
}

impl RetrainReason {
    pub fn is_forced(&self) -> bool {
        matches!(self, RetrainReason::Forced)
    }
}

/// Timer and data-volume half of the retrain policy. The forced flag lives in
/// [`ForcedRetrainFlag`] so it can be consumed atomically.
#[derive(Debug, Clone, Copy)]
pub struct RetrainPolicy {
    pub retrain_interval: Duration,
    pub new_sample_threshold: usize,
}

impl RetrainPolicy {
    pub fn evaluate(
        &self,
        last_trained_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        new_samples: usize,
    ) -> Option<RetrainReason> {
        let Some(last_trained_at) = last_trained_at else {
            return Some(RetrainReason::NeverTrained);
        };

        if now - last_trained_at >= self.retrain_interval {
            return Some(RetrainReason::Stale);
        }

        if new_samples > self.new_sample_threshold {
            return Some(RetrainReason::NewData(new_samples));
        }

        None
    }
}

/// One-shot flag raised by low satisfaction and cleared by whichever check reads it first.
#[derive(Debug, Default)]
pub struct ForcedRetrainFlag(AtomicBool);

impl ForcedRetrainFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true at most once per `raise`.
    pub fn consume(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

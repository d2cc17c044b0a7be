use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::models::{FeedbackRecord, TrainingSample};

/// Feedback at or above this score marks settings the user was content with.
pub const SATISFIED_THRESHOLD: f64 = 50.0;

/// Persistence boundary for feedback and training data.
pub trait FeedbackStore: Send + Sync {
    fn store_feedback(&self, record: &FeedbackRecord) -> Result<()>;

    /// Feedback records stored strictly after `since`.
    fn count_new_data(&self, since: DateTime<Utc>) -> Result<usize>;

    /// Training samples in the order their feedback was recorded.
    fn get_training_data(&self) -> Result<Vec<TrainingSample>>;
}

/// Turn a feedback record into a training sample if it is usable as one.
pub fn training_sample(record: &FeedbackRecord) -> Option<TrainingSample> {
    if record.satisfaction < SATISFIED_THRESHOLD {
        return None;
    }
    let features = record.features.as_ref().filter(|f| !f.is_empty())?;
    Some(TrainingSample {
        features: features.clone(),
        preferences: record.settings.clone(),
    })
}

/// Volatile store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<FeedbackRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<FeedbackRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl FeedbackStore for MemoryStore {
    fn store_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow!("feedback store lock poisoned"))?
            .push(record.clone());
        Ok(())
    }

    fn count_new_data(&self, since: DateTime<Utc>) -> Result<usize> {
        let guard = self
            .records
            .lock()
            .map_err(|_| anyhow!("feedback store lock poisoned"))?;
        Ok(guard.iter().filter(|r| r.recorded_at > since).count())
    }

    fn get_training_data(&self) -> Result<Vec<TrainingSample>> {
        let guard = self
            .records
            .lock()
            .map_err(|_| anyhow!("feedback store lock poisoned"))?;
        Ok(guard.iter().filter_map(training_sample).collect())
    }
}

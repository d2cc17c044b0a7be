use chrono::Duration;

/// Tunables for the recommendation engine's retrain policy.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retrain once the model is at least this old
    pub retrain_interval: Duration,

    /// Retrain when strictly more feedback records than this arrived since the last fit
    pub new_sample_threshold: usize,

    /// Unforced training is skipped below this many samples
    pub min_training_samples: usize,

    /// Feedback scored below this forces a retrain on the next policy check
    pub low_satisfaction_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retrain_interval: Duration::hours(12),
            new_sample_threshold: 20,
            min_training_samples: 10,
            low_satisfaction_threshold: 50.0,
        }
    }
}

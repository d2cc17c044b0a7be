use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::context::FeatureVector;
use super::recommendation::Settings;

/// A user's satisfaction with the settings that were active at the time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: String,
    pub settings: Settings,
    pub satisfaction: f64,
    pub recorded_at: DateTime<Utc>,
    /// Features behind the most recent recommendation, when one had been made.
    pub features: Option<FeatureVector>,
}

impl FeedbackRecord {
    pub fn new(settings: Settings, satisfaction: f64, features: Option<FeatureVector>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            settings,
            satisfaction,
            recorded_at: Utc::now(),
            features,
        }
    }
}

/// One (context, preferred settings) pair the model learns from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub features: FeatureVector,
    pub preferences: Settings,
}

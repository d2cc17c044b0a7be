use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::models::FeatureVector;

/// A learner that fits preference parameters from (features, targets) pairs.
///
/// Targets are laid out like a prediction vector; see
/// [`PREDICTION_ORDER`](crate::models::recommendation::PREDICTION_ORDER).
pub trait PreferenceModel: Send + Sync {
    fn name(&self) -> &str;

    fn train(
        &self,
        features: &[FeatureVector],
        targets: &[Vec<f64>],
    ) -> Result<Box<dyn FittedModel>>;
}

/// Parameters produced by a successful [`PreferenceModel::train`].
pub trait FittedModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<Vec<f64>>;
}

pub struct TrainedModel {
    pub parameters: Box<dyn FittedModel>,
    pub last_trained_at: DateTime<Utc>,
    pub samples_consumed: usize,
}

/// Engine-owned model slot. Only a successful training pass replaces it.
#[derive(Default)]
pub enum ModelState {
    #[default]
    Untrained,
    Trained(TrainedModel),
}

impl ModelState {
    pub fn last_trained_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ModelState::Untrained => None,
            ModelState::Trained(model) => Some(model.last_trained_at),
        }
    }

    pub fn is_trained(&self) -> bool {
        matches!(self, ModelState::Trained(_))
    }
}

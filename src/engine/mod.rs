pub mod config;
pub mod features;
pub mod model;
pub mod policy;
pub mod ridge;

pub use config::EngineConfig;
pub use model::{FittedModel, ModelState, PreferenceModel, TrainedModel};
pub use policy::{ForcedRetrainFlag, RetrainPolicy, RetrainReason};
pub use ridge::RidgeModel;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{EnvError, EnvResult};
use crate::models::{ContextSnapshot, FeatureVector, FeedbackRecord, Recommendation, Settings};
use crate::storage::FeedbackStore;

use features::extract_features;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Summary of the model slot for status reporting.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ModelStatus {
    pub model: String,
    pub trained: bool,
    pub last_trained_at: Option<DateTime<Utc>>,
    pub samples_consumed: usize,
    pub forced_retrain_pending: bool,
}

struct EngineState {
    model: ModelState,
    /// Features behind the latest successful extraction, attached to incoming feedback.
    last_features: Option<FeatureVector>,
}

/// Turns context into bounded settings and decides when to refit its model.
///
/// Model state sits behind one mutex, so training and prediction never interleave.
pub struct RecommendationEngine {
    storage: Arc<dyn FeedbackStore>,
    model: Box<dyn PreferenceModel>,
    config: EngineConfig,
    state: Mutex<EngineState>,
    forced_retrain: ForcedRetrainFlag,
}

impl RecommendationEngine {
    pub fn new(
        storage: Arc<dyn FeedbackStore>,
        model: Box<dyn PreferenceModel>,
        config: EngineConfig,
    ) -> Self {
        Self {
            storage,
            model,
            config,
            state: Mutex::new(EngineState {
                model: ModelState::Untrained,
                last_features: None,
            }),
            forced_retrain: ForcedRetrainFlag::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Settings for `snapshot`. Never fails: any problem yields the default recommendation.
    ///
    /// The extracted features are remembered and attached to the next `record_feedback`.
    pub fn get_recommendations(&self, snapshot: &ContextSnapshot) -> Recommendation {
        self.recommend(snapshot, true)
    }

    /// Same as [`get_recommendations`](Self::get_recommendations), but leaves the features that
    /// feedback is attributed to untouched. For ad-hoc queries outside the tick loop.
    pub fn peek_recommendations(&self, snapshot: &ContextSnapshot) -> Recommendation {
        self.recommend(snapshot, false)
    }

    fn recommend(&self, snapshot: &ContextSnapshot, remember: bool) -> Recommendation {
        let mut state = self.lock_state();

        if let Some(reason) = self.retrain_decision(&state, Utc::now()) {
            log_debug!("retrain triggered: {reason:?}");
            if let Err(err) = self.train_locked(&mut state, reason.is_forced()) {
                log_error!("[engine] training with model '{}' failed: {err}", self.model.name());
            }
        }

        match self.predict_locked(&mut state, snapshot, remember) {
            Ok(recommendation) => {
                log_debug!("generated recommendation {recommendation:?}");
                recommendation
            }
            Err(EnvError::ModelUnavailable) => {
                log_debug!("no trained model, using default recommendation");
                Recommendation::default()
            }
            Err(err) => {
                log_warn!("[engine] prediction fell back to defaults: {err}");
                Recommendation::default()
            }
        }
    }

    /// Persist the user's satisfaction with `settings`. Low scores force the next policy
    /// check to retrain.
    ///
    /// The record carries the features of the last `get_recommendations` call; queries made
    /// through `peek_recommendations` are not attributed.
    pub fn record_feedback(&self, settings: Settings, satisfaction: f64) -> EnvResult<FeedbackRecord> {
        if !satisfaction.is_finite() || !(0.0..=100.0).contains(&satisfaction) {
            return Err(EnvError::InvalidFeedback(satisfaction));
        }

        let features = self.lock_state().last_features.clone();
        let record = FeedbackRecord::new(settings, satisfaction, features);
        self.storage
            .store_feedback(&record)
            .map_err(EnvError::Storage)?;

        log_info!("recorded user satisfaction {satisfaction}");
        if satisfaction < self.config.low_satisfaction_threshold {
            self.forced_retrain.raise();
            log_info!("low satisfaction, retrain forced for next check");
        }

        Ok(record)
    }

    /// Evaluate the retrain policy now. Consumes a pending forced retrain.
    pub fn should_train(&self) -> bool {
        let state = self.lock_state();
        self.retrain_decision(&state, Utc::now()).is_some()
    }

    /// Run a training pass immediately. Returns whether a new model was installed; `Ok(false)`
    /// means there was not enough data and `force` was not set.
    pub fn train(&self, force: bool) -> EnvResult<bool> {
        let mut state = self.lock_state();
        self.train_locked(&mut state, force)
    }

    /// Human-readable reasons for the settings chosen for `snapshot`.
    pub fn explain(&self, snapshot: &ContextSnapshot) -> String {
        match extract_features(snapshot) {
            Ok(features) => features::explain(&features),
            Err(_) => features::explain(&FeatureVector::new()),
        }
    }

    pub fn status(&self) -> ModelStatus {
        let state = self.lock_state();
        let (last_trained_at, samples_consumed) = match &state.model {
            ModelState::Untrained => (None, 0),
            ModelState::Trained(trained) => {
                (Some(trained.last_trained_at), trained.samples_consumed)
            }
        };
        ModelStatus {
            model: self.model.name().to_string(),
            trained: state.model.is_trained(),
            last_trained_at,
            samples_consumed,
            forced_retrain_pending: self.forced_retrain.is_raised(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn policy(&self) -> RetrainPolicy {
        RetrainPolicy {
            retrain_interval: self.config.retrain_interval,
            new_sample_threshold: self.config.new_sample_threshold,
        }
    }

    fn retrain_decision(&self, state: &EngineState, now: DateTime<Utc>) -> Option<RetrainReason> {
        if self.forced_retrain.consume() {
            return Some(RetrainReason::Forced);
        }

        let last_trained_at = state.model.last_trained_at();
        let new_samples = match last_trained_at {
            Some(since) => self.storage.count_new_data(since).unwrap_or_else(|err| {
                log_warn!("[engine] storage could not count new feedback: {err:#}");
                0
            }),
            None => 0,
        };

        self.policy().evaluate(last_trained_at, now, new_samples)
    }

    fn train_locked(&self, state: &mut EngineState, force: bool) -> EnvResult<bool> {
        let samples = self
            .storage
            .get_training_data()
            .map_err(|err| EnvError::Training(format!("could not load training data: {err:#}")))?;

        if samples.len() < self.config.min_training_samples && !force {
            log_info!(
                "not enough data to train model ({} of {} samples)",
                samples.len(),
                self.config.min_training_samples
            );
            return Ok(false);
        }

        let (features, targets): (Vec<FeatureVector>, Vec<Vec<f64>>) = samples
            .into_iter()
            .map(|sample| {
                let target = Recommendation::target_vector(&sample.preferences);
                (sample.features, target)
            })
            .unzip();

        let fitted = panic::catch_unwind(AssertUnwindSafe(|| self.model.train(&features, &targets)))
            .map_err(|_| EnvError::Training(format!("model '{}' panicked", self.model.name())))?;
        let parameters = fitted.map_err(|err| EnvError::Training(format!("{err:#}")))?;

        state.model = ModelState::Trained(TrainedModel {
            parameters,
            last_trained_at: Utc::now(),
            samples_consumed: features.len(),
        });
        log_info!("model trained with {} data points", features.len());
        Ok(true)
    }

    fn predict_locked(
        &self,
        state: &mut EngineState,
        snapshot: &ContextSnapshot,
        remember: bool,
    ) -> EnvResult<Recommendation> {
        let features = extract_features(snapshot)?;
        if remember {
            state.last_features = Some(features.clone());
        }

        let ModelState::Trained(trained) = &state.model else {
            return Err(EnvError::ModelUnavailable);
        };

        let raw = panic::catch_unwind(AssertUnwindSafe(|| trained.parameters.predict(&features)))
            .map_err(|_| EnvError::Prediction("model panicked during predict".into()))?
            .map_err(|err| EnvError::Prediction(format!("{err:#}")))?;
        Recommendation::from_prediction(&raw)
    }

    #[cfg(test)]
    fn set_model_state(&self, model: ModelState) {
        self.lock_state().model = model;
    }
}

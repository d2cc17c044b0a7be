use thiserror::Error;

/// Failure taxonomy for the control loop.
///
/// Inside a tick every variant is logged and absorbed; only `record_feedback`, `set_interval`
/// and configuration loading hand them back to the caller.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("collector '{collector}' failed: {message}")]
    Collection { collector: String, message: String },

    #[error("no trained model available")]
    ModelUnavailable,

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("training failed: {0}")]
    Training(String),

    #[error("adapter '{adapter}' failed to apply settings: {message}")]
    AdapterApply { adapter: String, message: String },

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("satisfaction score {0} outside 0-100")]
    InvalidFeedback(f64),

    #[error("interval of {requested}s outside allowed range {min}-{max}s")]
    InvalidInterval { requested: u64, min: u64, max: u64 },

    #[error("configuration error: {0}")]
    Config(#[source] anyhow::Error),
}

impl EnvError {
    pub fn collection(collector: &str, message: impl Into<String>) -> Self {
        Self::Collection {
            collector: collector.to_string(),
            message: message.into(),
        }
    }

    pub fn adapter_apply(adapter: &str, message: impl Into<String>) -> Self {
        Self::AdapterApply {
            adapter: adapter.to_string(),
            message: message.into(),
        }
    }
}

pub type EnvResult<T> = std::result::Result<T, EnvError>;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::EnvError;
use crate::models::ContextSnapshot;

use super::collector::Collector;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Result of one pass over every collector.
#[derive(Debug, Default)]
pub struct Aggregation {
    pub snapshot: ContextSnapshot,
    pub failures: Vec<EnvError>,
}

/// Merges collector outputs into one snapshot.
///
/// Collectors run in registration order and a later collector overwrites an earlier one's
/// value for the same key.
#[derive(Clone, Default)]
pub struct ContextAggregator {
    collectors: Vec<Arc<dyn Collector>>,
}

impl ContextAggregator {
    pub fn new(collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self { collectors }
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn aggregate(&self) -> Aggregation {
        let mut aggregation = Aggregation::default();

        for collector in &self.collectors {
            let name = collector.name();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| collector.collect()));

            let values = match outcome {
                Ok(Ok(values)) => values,
                Ok(Err(err)) => {
                    log_warn!("[collect] collector '{name}' failed: {err:#}");
                    aggregation
                        .failures
                        .push(EnvError::collection(name, format!("{err:#}")));
                    continue;
                }
                Err(_) => {
                    log_warn!("[collect] collector '{name}' panicked");
                    aggregation
                        .failures
                        .push(EnvError::collection(name, "collector panicked"));
                    continue;
                }
            };

            for (key, value) in values {
                if let Some(previous) = aggregation.snapshot.insert(key.clone(), value) {
                    log_debug!("collector '{name}' overwrote {key} (was {previous:?})");
                }
            }
        }

        aggregation
    }
}

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use crate::error::EnvError;
use crate::models::Settings;

use super::Adapter;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AdapterOutcome {
    Applied,
    /// The adapter returned `false`.
    Rejected,
    Failed(String),
    /// No recommended setting was supported, so the adapter was not called.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdapterReport {
    pub adapter: String,
    pub settings: Vec<String>,
    pub outcome: AdapterOutcome,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub adapters: Vec<AdapterReport>,
}

impl DispatchReport {
    /// OR of every adapter outcome. Informational only.
    pub fn any_applied(&self) -> bool {
        self.adapters
            .iter()
            .any(|report| report.outcome == AdapterOutcome::Applied)
    }

    pub fn outcome_for(&self, adapter: &str) -> Option<&AdapterOutcome> {
        self.adapters
            .iter()
            .find(|report| report.adapter == adapter)
            .map(|report| &report.outcome)
    }
}

/// Routes each adapter the slice of a recommendation it supports.
///
/// Adapters run one after another in registration order; one adapter failing never stops the
/// ones after it.
#[derive(Clone, Default)]
pub struct AdapterDispatcher {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl AdapterDispatcher {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    pub fn dispatch(&self, settings: &Settings) -> DispatchReport {
        let mut report = DispatchReport::default();

        for adapter in &self.adapters {
            let name = adapter.name().to_string();
            let relevant: Settings = adapter
                .supported_settings()
                .iter()
                .filter_map(|key| settings.get(*key).map(|v| (key.to_string(), v.clone())))
                .collect();
            let keys: Vec<String> = relevant.keys().cloned().collect();

            if relevant.is_empty() {
                log_debug!("adapter '{name}' supports none of the recommended settings, skipping");
                report.adapters.push(AdapterReport {
                    adapter: name,
                    settings: keys,
                    outcome: AdapterOutcome::Skipped,
                });
                continue;
            }

            let outcome =
                match panic::catch_unwind(AssertUnwindSafe(|| adapter.apply_settings(&relevant))) {
                    Ok(Ok(true)) => AdapterOutcome::Applied,
                    Ok(Ok(false)) => {
                        log_warn!("[dispatch] adapter '{name}' declined settings {keys:?}");
                        AdapterOutcome::Rejected
                    }
                    Ok(Err(err)) => {
                        let err = EnvError::adapter_apply(&name, format!("{err:#}"));
                        log_error!("[dispatch] {err}");
                        AdapterOutcome::Failed(err.to_string())
                    }
                    Err(_) => {
                        let err = EnvError::adapter_apply(&name, "adapter panicked");
                        log_error!("[dispatch] {err}");
                        AdapterOutcome::Failed(err.to_string())
                    }
                };

            report.adapters.push(AdapterReport {
                adapter: name,
                settings: keys,
                outcome,
            });
        }

        report
    }

    /// Current settings of every adapter, keyed by adapter name.
    pub fn current_settings(&self) -> BTreeMap<String, Settings> {
        self.adapters
            .iter()
            .map(|adapter| (adapter.name().to_string(), adapter.current_settings()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Recommendation, Scalar};
    use anyhow::{anyhow, Result};
    use std::sync::Mutex;

    enum Behaviour {
        Succeed,
        Decline,
        Fail,
        Panic,
    }

    struct Probe {
        name: &'static str,
        supported: Vec<&'static str>,
        behaviour: Behaviour,
        calls: Mutex<Vec<Settings>>,
    }

    impl Probe {
        fn new(name: &'static str, supported: &[&'static str], behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                supported: supported.to_vec(),
                behaviour,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Settings> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Adapter for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn supported_settings(&self) -> &[&str] {
            &self.supported
        }

        fn apply_settings(&self, settings: &Settings) -> Result<bool> {
            self.calls.lock().unwrap().push(settings.clone());
            match self.behaviour {
                Behaviour::Succeed => Ok(true),
                Behaviour::Decline => Ok(false),
                Behaviour::Fail => Err(anyhow!("device unreachable")),
                Behaviour::Panic => panic!("adapter bug"),
            }
        }

        fn current_settings(&self) -> Settings {
            Settings::new()
        }
    }

    fn settings() -> Settings {
        Recommendation::default().to_settings()
    }

    #[test]
    fn adapters_receive_only_supported_settings() {
        let lights = Probe::new("lights", &["lighting_brightness", "lighting_mode"], Behaviour::Succeed);
        let dispatcher = AdapterDispatcher::new(vec![lights.clone() as Arc<dyn Adapter>]);

        let report = dispatcher.dispatch(&settings());
        let calls = lights.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].len(), 1);
        assert_eq!(calls[0]["lighting_brightness"], Scalar::Int(75));
        assert!(report.any_applied());
    }

    #[test]
    fn non_intersecting_adapter_is_never_called() {
        let hvac = Probe::new("hvac", &["humidity"], Behaviour::Succeed);
        let dispatcher = AdapterDispatcher::new(vec![hvac.clone() as Arc<dyn Adapter>]);

        let report = dispatcher.dispatch(&settings());
        assert!(hvac.calls().is_empty());
        assert_eq!(report.outcome_for("hvac"), Some(&AdapterOutcome::Skipped));
        assert!(!report.any_applied());
    }

    #[test]
    fn failures_do_not_block_later_adapters() {
        let failing = Probe::new("failing", &["sound_volume"], Behaviour::Fail);
        let panicking = Probe::new("panicking", &["temperature"], Behaviour::Panic);
        let declining = Probe::new("declining", &["sound_volume"], Behaviour::Decline);
        let workspace = Probe::new("workspace", &["app_arrangement"], Behaviour::Succeed);
        let dispatcher = AdapterDispatcher::new(vec![
            failing.clone() as Arc<dyn Adapter>,
            panicking.clone() as Arc<dyn Adapter>,
            declining.clone() as Arc<dyn Adapter>,
            workspace.clone() as Arc<dyn Adapter>,
        ]);

        let report = dispatcher.dispatch(&settings());
        assert_eq!(workspace.calls().len(), 1);
        assert_eq!(declining.calls().len(), 1);
        assert!(matches!(report.outcome_for("failing"), Some(AdapterOutcome::Failed(_))));
        assert!(matches!(report.outcome_for("panicking"), Some(AdapterOutcome::Failed(_))));
        assert_eq!(report.outcome_for("declining"), Some(&AdapterOutcome::Rejected));
        assert_eq!(report.outcome_for("workspace"), Some(&AdapterOutcome::Applied));
        assert!(report.any_applied());
    }

    #[test]
    fn adapters_run_in_registration_order() {
        let first = Probe::new("first", &["sound_volume"], Behaviour::Succeed);
        let second = Probe::new("second", &["lighting_brightness"], Behaviour::Succeed);
        let report = AdapterDispatcher::new(vec![first as Arc<dyn Adapter>, second]).dispatch(&settings());

        let order: Vec<_> = report.adapters.iter().map(|r| r.adapter.as_str()).collect();
        assert_eq!(order, ["first", "second"]);
    }
}

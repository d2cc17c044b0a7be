use anyhow::{bail, Result};

use crate::models::{Arrangement, Scalar, Settings};

use super::state::AdapterState;
use super::Adapter;

const ENABLE_LOGS: bool = true;

use crate::log_info;

const SUPPORTED: [&str; 2] = ["app_arrangement", "desktop_arrangement"];

/// Window and desktop layout presets.
pub struct WorkspaceAdapter {
    state: AdapterState,
}

impl WorkspaceAdapter {
    pub fn new() -> Self {
        let mut initial = Settings::new();
        for name in SUPPORTED {
            initial.insert(name.into(), Scalar::Text(Arrangement::Default.as_str().into()));
        }
        Self {
            state: AdapterState::new(initial),
        }
    }
}

impl Default for WorkspaceAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for WorkspaceAdapter {
    fn name(&self) -> &str {
        "workspace"
    }

    fn supported_settings(&self) -> &[&str] {
        &SUPPORTED
    }

    fn apply_settings(&self, settings: &Settings) -> Result<bool> {
        for (name, value) in settings {
            if !SUPPORTED.contains(&name.as_str()) {
                bail!("unsupported workspace setting {name}");
            }
            if value.as_str().and_then(Arrangement::parse).is_none() {
                bail!("unknown arrangement {value:?} for {name}");
            }
        }

        let changed = self.state.merge(settings);
        for name in &changed {
            log_info!("workspace {name} switched to {:?}", settings[name]);
        }
        Ok(true)
    }

    fn current_settings(&self) -> Settings {
        self.state.snapshot()
    }
}

use anyhow::{bail, Result};

use crate::models::{Scalar, Settings};

use super::state::AdapterState;
use super::Adapter;

const ENABLE_LOGS: bool = true;

use crate::log_info;

const SUPPORTED: [&str; 3] = ["sound_volume", "sound_mute", "sound_profile"];
const PROFILES: [&str; 4] = ["normal", "meeting", "media", "quiet"];

/// System output volume and sound profile.
pub struct SoundAdapter {
    state: AdapterState,
}

impl SoundAdapter {
    pub fn new() -> Self {
        let mut initial = Settings::new();
        initial.insert("sound_volume".into(), Scalar::Int(50));
        initial.insert("sound_mute".into(), Scalar::Bool(false));
        initial.insert("sound_profile".into(), Scalar::Text("normal".into()));
        Self {
            state: AdapterState::new(initial),
        }
    }
}

impl Default for SoundAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for SoundAdapter {
    fn name(&self) -> &str {
        "sound"
    }

    fn supported_settings(&self) -> &[&str] {
        &SUPPORTED
    }

    fn apply_settings(&self, settings: &Settings) -> Result<bool> {
        for (name, value) in settings {
            match (name.as_str(), value) {
                ("sound_volume", value) => match value.as_f64() {
                    Some(volume) if (0.0..=100.0).contains(&volume) => {}
                    _ => bail!("volume {value:?} outside 0-100"),
                },
                ("sound_mute", Scalar::Bool(_)) => {}
                ("sound_mute", other) => bail!("mute flag must be boolean, got {other:?}"),
                ("sound_profile", value) => match value.as_str() {
                    Some(profile) if PROFILES.contains(&profile) => {}
                    _ => bail!("unknown sound profile {value:?}"),
                },
                (other, _) => bail!("unsupported sound setting {other}"),
            }
        }

        let changed = self.state.merge(settings);
        if !changed.is_empty() {
            log_info!("sound updated: {changed:?}");
        }
        Ok(true)
    }

    fn current_settings(&self) -> Settings {
        self.state.snapshot()
    }
}

use anyhow::{bail, Result};

use crate::models::{Scalar, Settings};

use super::state::AdapterState;
use super::Adapter;

const ENABLE_LOGS: bool = true;

use crate::log_info;

const SUPPORTED: [&str; 3] = ["lighting_brightness", "lighting_color_temp", "lighting_mode"];
const COLOR_TEMP_RANGE_K: (f64, f64) = (2000.0, 6500.0);
const MODES: [&str; 2] = ["auto", "manual"];

/// Room and screen lighting. Keeps the requested state; driving actual fixtures is left to
/// whatever bridge is attached downstream.
pub struct LightingAdapter {
    state: AdapterState,
}

impl LightingAdapter {
    pub fn new() -> Self {
        let mut initial = Settings::new();
        initial.insert("lighting_brightness".into(), Scalar::Int(75));
        initial.insert("lighting_color_temp".into(), Scalar::Int(4000));
        initial.insert("lighting_mode".into(), Scalar::Text("auto".into()));
        Self {
            state: AdapterState::new(initial),
        }
    }
}

impl Default for LightingAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for LightingAdapter {
    fn name(&self) -> &str {
        "lighting"
    }

    fn supported_settings(&self) -> &[&str] {
        &SUPPORTED
    }

    fn apply_settings(&self, settings: &Settings) -> Result<bool> {
        for (name, value) in settings {
            match name.as_str() {
                "lighting_brightness" => match value.as_f64() {
                    Some(level) if (0.0..=100.0).contains(&level) => {}
                    _ => bail!("brightness {value:?} outside 0-100"),
                },
                "lighting_color_temp" => match value.as_f64() {
                    Some(kelvin) if (COLOR_TEMP_RANGE_K.0..=COLOR_TEMP_RANGE_K.1).contains(&kelvin) => {}
                    _ => bail!("color temperature {value:?} outside supported range"),
                },
                "lighting_mode" => match value.as_str() {
                    Some(mode) if MODES.contains(&mode) => {}
                    _ => bail!("unknown lighting mode {value:?}"),
                },
                other => bail!("unsupported lighting setting {other}"),
            }
        }

        let changed = self.state.merge(settings);
        if !changed.is_empty() {
            log_info!("lighting updated: {changed:?}");
        }
        Ok(true)
    }

    fn current_settings(&self) -> Settings {
        self.state.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_valid_brightness() {
        let adapter = LightingAdapter::new();
        let mut settings = Settings::new();
        settings.insert("lighting_brightness".into(), Scalar::Int(40));

        assert!(adapter.apply_settings(&settings).unwrap());
        assert_eq!(adapter.current_settings()["lighting_brightness"], Scalar::Int(40));
        assert_eq!(adapter.current_settings()["lighting_mode"], Scalar::Text("auto".into()));
    }

    #[test]
    fn rejects_out_of_range_values_without_partial_update() {
        let adapter = LightingAdapter::new();
        let mut settings = Settings::new();
        settings.insert("lighting_brightness".into(), Scalar::Int(40));
        settings.insert("lighting_color_temp".into(), Scalar::Int(12000));

        assert!(adapter.apply_settings(&settings).is_err());
        assert_eq!(adapter.current_settings()["lighting_brightness"], Scalar::Int(75));
    }
}

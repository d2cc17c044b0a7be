use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EnvError;

use super::context::Scalar;

/// Setting name → value mapping handed to adapters.
pub type Settings = BTreeMap<String, Scalar>;

pub const LIGHTING_BRIGHTNESS: &str = "lighting_brightness";
pub const SOUND_VOLUME: &str = "sound_volume";
pub const TEMPERATURE: &str = "temperature";
pub const APP_ARRANGEMENT: &str = "app_arrangement";
pub const DESKTOP_ARRANGEMENT: &str = "desktop_arrangement";

/// Prediction vector layout.
pub const PREDICTION_ORDER: [&str; 5] = [
    LIGHTING_BRIGHTNESS,
    SOUND_VOLUME,
    TEMPERATURE,
    APP_ARRANGEMENT,
    DESKTOP_ARRANGEMENT,
];

const PERCENT_RANGE: (i64, i64) = (0, 100);
const TEMPERATURE_RANGE: (i64, i64) = (18, 26);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Arrangement {
    #[default]
    Default,
    Focused,
    Productive,
    Relaxed,
}

impl Arrangement {
    /// Index order used by the model's categorical outputs.
    pub const ALL: [Arrangement; 4] = [
        Arrangement::Default,
        Arrangement::Focused,
        Arrangement::Productive,
        Arrangement::Relaxed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arrangement::Default => "default",
            Arrangement::Focused => "focused",
            Arrangement::Productive => "productive",
            Arrangement::Relaxed => "relaxed",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|candidate| candidate == self)
            .unwrap_or(0)
    }

    /// Clamp a raw model output into the enumeration.
    pub fn from_raw(value: f64) -> Self {
        let max = (Self::ALL.len() - 1) as f64;
        let idx = value.trunc().clamp(0.0, max) as usize;
        Self::ALL[idx]
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

impl fmt::Display for Arrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded, fully-populated environment settings produced once per tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub lighting_brightness: i64,
    pub sound_volume: i64,
    pub temperature: i64,
    pub app_arrangement: Arrangement,
    pub desktop_arrangement: Arrangement,
}

impl Default for Recommendation {
    fn default() -> Self {
        Self {
            lighting_brightness: 75,
            sound_volume: 50,
            temperature: 22,
            app_arrangement: Arrangement::Default,
            desktop_arrangement: Arrangement::Default,
        }
    }
}

impl Recommendation {
    /// Map a raw prediction vector onto named settings.
    ///
    /// The vector must hold exactly one finite value per entry of [`PREDICTION_ORDER`].
    /// Numeric outputs are truncated toward zero and clamped; categorical outputs are clamped
    /// into the enumeration.
    pub fn from_prediction(values: &[f64]) -> Result<Self, EnvError> {
        if values.len() != PREDICTION_ORDER.len() {
            return Err(EnvError::Prediction(format!(
                "model returned {} values, expected {}",
                values.len(),
                PREDICTION_ORDER.len()
            )));
        }
        if let Some(pos) = values.iter().position(|value| !value.is_finite()) {
            return Err(EnvError::Prediction(format!(
                "non-finite output for {}",
                PREDICTION_ORDER[pos]
            )));
        }

        Ok(Self {
            lighting_brightness: clamp_level(values[0], PERCENT_RANGE),
            sound_volume: clamp_level(values[1], PERCENT_RANGE),
            temperature: clamp_level(values[2], TEMPERATURE_RANGE),
            app_arrangement: Arrangement::from_raw(values[3]),
            desktop_arrangement: Arrangement::from_raw(values[4]),
        })
    }

    /// Training target for a set of preferred settings, laid out like a prediction.
    /// Settings that are absent or unreadable fall back to the defaults.
    pub fn target_vector(preferences: &Settings) -> Vec<f64> {
        let defaults = Self::default();
        let numeric = |name: &str, fallback: i64| {
            preferences
                .get(name)
                .and_then(Scalar::as_f64)
                .unwrap_or(fallback as f64)
        };
        let categorical = |name: &str, fallback: Arrangement| {
            let arrangement = preferences
                .get(name)
                .and_then(Scalar::as_str)
                .and_then(Arrangement::parse)
                .unwrap_or(fallback);
            arrangement.index() as f64
        };

        vec![
            numeric(LIGHTING_BRIGHTNESS, defaults.lighting_brightness),
            numeric(SOUND_VOLUME, defaults.sound_volume),
            numeric(TEMPERATURE, defaults.temperature),
            categorical(APP_ARRANGEMENT, defaults.app_arrangement),
            categorical(DESKTOP_ARRANGEMENT, defaults.desktop_arrangement),
        ]
    }

    pub fn to_settings(&self) -> Settings {
        let mut settings = Settings::new();
        settings.insert(LIGHTING_BRIGHTNESS.into(), Scalar::Int(self.lighting_brightness));
        settings.insert(SOUND_VOLUME.into(), Scalar::Int(self.sound_volume));
        settings.insert(TEMPERATURE.into(), Scalar::Int(self.temperature));
        settings.insert(
            APP_ARRANGEMENT.into(),
            Scalar::Text(self.app_arrangement.as_str().into()),
        );
        settings.insert(
            DESKTOP_ARRANGEMENT.into(),
            Scalar::Text(self.desktop_arrangement.as_str().into()),
        );
        settings
    }

    pub fn is_within_bounds(&self) -> bool {
        in_range(self.lighting_brightness, PERCENT_RANGE)
            && in_range(self.sound_volume, PERCENT_RANGE)
            && in_range(self.temperature, TEMPERATURE_RANGE)
    }
}

fn clamp_level(value: f64, (min, max): (i64, i64)) -> i64 {
    value.trunc().clamp(min as f64, max as f64) as i64
}

fn in_range(value: i64, (min, max): (i64, i64)) -> bool {
    (min..=max).contains(&value)
}

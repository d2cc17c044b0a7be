use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::engine::EngineConfig;
use crate::scheduler::{MAX_INTERVAL_SECS, MIN_INTERVAL_SECS};

pub const DATA_DIR_ENV: &str = "ENVSENSE_DATA_DIR";
pub const DEBUG_ENV: &str = "ENVSENSE_DEBUG";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tick_interval_secs: u64,
    pub retrain_interval_hours: u64,
    pub new_sample_threshold: usize,
    pub min_training_samples: usize,
    pub low_satisfaction_threshold: f64,
    pub ridge_lambda: f64,
    /// JSON calendar export; the calendar collector is only registered when set.
    pub calendar_path: Option<PathBuf>,
    pub database_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval_secs: 60,
            retrain_interval_hours: 12,
            new_sample_threshold: 20,
            min_training_samples: 10,
            low_satisfaction_threshold: 50.0,
            ridge_lambda: 1.0,
            calendar_path: None,
            database_file: "envsense.sqlite3".into(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&self.tick_interval_secs) {
            bail!(
                "tick_interval_secs {} outside {MIN_INTERVAL_SECS}-{MAX_INTERVAL_SECS}",
                self.tick_interval_secs
            );
        }
        if self.retrain_interval_hours == 0 {
            bail!("retrain_interval_hours must be positive");
        }
        if !(0.0..=100.0).contains(&self.low_satisfaction_threshold) {
            bail!(
                "low_satisfaction_threshold {} outside 0-100",
                self.low_satisfaction_threshold
            );
        }
        if !self.ridge_lambda.is_finite() || self.ridge_lambda <= 0.0 {
            bail!("ridge_lambda must be a positive number");
        }
        if self.database_file.trim().is_empty() {
            bail!("database_file is empty");
        }
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            retrain_interval: chrono::Duration::hours(self.retrain_interval_hours as i64),
            new_sample_threshold: self.new_sample_threshold,
            min_training_samples: self.min_training_samples,
            low_satisfaction_threshold: self.low_satisfaction_threshold,
        }
    }

    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database_file)
    }
}

/// `ENVSENSE_DATA_DIR`, else the platform data directory.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os(DATA_DIR_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir()
        .map(|dir| dir.join("envsense"))
        .context("no platform data directory; set ENVSENSE_DATA_DIR")
}

pub fn debug_mode() -> bool {
    env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// JSON-backed configuration. Missing files and missing fields fall back to defaults.
pub struct ConfigStore {
    path: PathBuf,
    data: RwLock<Config>,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            read_config(&path)?
        } else {
            Config::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Load `config.json` from `data_dir`, creating the directory if needed.
    pub fn open_in(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;
        Self::new(data_dir.join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self) -> Config {
        self.read().clone()
    }

    /// Apply `change`, validate, and persist. Nothing is kept if validation or the write fails.
    pub fn update<F>(&self, change: F) -> Result<Config>
    where
        F: FnOnce(&mut Config),
    {
        let mut guard = self.write();
        let mut next = guard.clone();
        change(&mut next);
        next.validate()?;
        self.persist(&next)?;
        *guard = next.clone();
        Ok(next)
    }

    pub fn reload(&self) -> Result<()> {
        let data = read_config(&self.path)?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &Config) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized)
            .with_context(|| format!("Failed to write config to {}", staging.display()))?;
        fs::rename(&staging, &self.path)
            .with_context(|| format!("Failed to replace config at {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, Config> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Config> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: Config = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

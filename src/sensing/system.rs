use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use starship_battery::units::ratio::percent;
use sysinfo::{ProcessesToUpdate, System};

use crate::models::{ContextSnapshot, Scalar};

use super::collector::Collector;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Reported when the host has no readable battery.
const MAINS_BATTERY_PERCENT: f64 = 100.0;

/// Host load signals from `sysinfo`.
///
/// CPU usage is a delta between refreshes, so the first reading after construction is
/// only meaningful once a baseline refresh has happened; `new` takes that baseline.
pub struct SystemCollector {
    system: Mutex<System>,
}

impl SystemCollector {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            system: Mutex::new(system),
        }
    }
}

impl Default for SystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for SystemCollector {
    fn name(&self) -> &str {
        "system"
    }

    fn collect(&self) -> Result<ContextSnapshot> {
        let mut system = self
            .system
            .lock()
            .map_err(|_| anyhow!("system info lock poisoned"))?;

        system.refresh_cpu_usage();
        system.refresh_memory();
        system.refresh_processes(ProcessesToUpdate::All);

        let cpus = system.cpus();
        let cpu_usage = if cpus.is_empty() {
            0.0
        } else {
            cpus.iter().map(|cpu| f64::from(cpu.cpu_usage())).sum::<f64>() / cpus.len() as f64
        };

        let total_memory = system.total_memory();
        let memory_usage = if total_memory == 0 {
            0.0
        } else {
            system.used_memory() as f64 / total_memory as f64 * 100.0
        };

        let mut snapshot = ContextSnapshot::new();
        snapshot.insert("system_cpu_usage".into(), Scalar::Float(round1(cpu_usage)));
        snapshot.insert("system_memory_usage".into(), Scalar::Float(round1(memory_usage)));
        snapshot.insert(
            "system_process_count".into(),
            Scalar::Int(system.processes().len() as i64),
        );
        snapshot.insert("system_battery".into(), Scalar::Float(round1(battery_percent())));
        Ok(snapshot)
    }
}

fn battery_percent() -> f64 {
    match read_batteries() {
        Ok(levels) => battery_level(&levels),
        Err(err) => {
            log_debug!("battery unavailable, assuming mains power: {err:#}");
            MAINS_BATTERY_PERCENT
        }
    }
}

fn read_batteries() -> Result<Vec<f64>> {
    let manager = starship_battery::Manager::new().context("battery manager unavailable")?;
    let mut levels = Vec::new();
    for battery in manager.batteries().context("failed to enumerate batteries")? {
        let battery = battery.context("failed to read battery")?;
        levels.push(f64::from(battery.state_of_charge().get::<percent>()));
    }
    Ok(levels)
}

/// Mean charge across all batteries, or full when there are none.
fn battery_level(levels: &[f64]) -> f64 {
    if levels.is_empty() {
        return MAINS_BATTERY_PERCENT;
    }
    let mean = levels.iter().sum::<f64>() / levels.len() as f64;
    mean.clamp(0.0, 100.0)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

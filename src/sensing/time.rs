use anyhow::Result;
use chrono::{Datelike, Local, NaiveDateTime, Timelike};

use crate::models::{ContextSnapshot, Scalar};

use super::collector::Collector;

/// Local wall-clock signals.
#[derive(Debug, Default, Clone)]
pub struct TimeCollector;

impl TimeCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Collector for TimeCollector {
    fn name(&self) -> &str {
        "time"
    }

    fn collect(&self) -> Result<ContextSnapshot> {
        Ok(time_context(&Local::now().naive_local()))
    }
}

/// Day of week counts from Monday = 0.
pub fn time_context(now: &NaiveDateTime) -> ContextSnapshot {
    let hour = now.hour();
    let weekday = now.weekday().num_days_from_monday();
    let flag = |on: bool| Scalar::Int(i64::from(on));

    let mut snapshot = ContextSnapshot::new();
    snapshot.insert("time_hour".into(), Scalar::from(hour));
    snapshot.insert("time_minute".into(), Scalar::from(now.minute()));
    snapshot.insert("time_day_of_week".into(), Scalar::from(weekday));
    snapshot.insert("time_is_weekend".into(), flag(weekday >= 5));
    snapshot.insert("time_is_morning".into(), flag((5..12).contains(&hour)));
    snapshot.insert("time_is_afternoon".into(), flag((12..17).contains(&hour)));
    snapshot.insert("time_is_evening".into(), flag((17..22).contains(&hour)));
    snapshot.insert("time_is_night".into(), flag(hour >= 22 || hour < 5));
    snapshot
}

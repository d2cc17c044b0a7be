use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::{ContextSnapshot, Scalar};

use super::collector::Collector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub subject: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Meeting signals from a JSON export of calendar events (local times).
///
/// A missing file means an empty calendar; an unreadable one fails the collector.
#[derive(Debug, Clone)]
pub struct CalendarCollector {
    path: PathBuf,
}

impl CalendarCollector {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load_events(&self) -> Result<Vec<CalendarEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read calendar from {}", self.path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse calendar {}", self.path.display()))
    }
}

impl Collector for CalendarCollector {
    fn name(&self) -> &str {
        "calendar"
    }

    fn collect(&self) -> Result<ContextSnapshot> {
        let events = self.load_events()?;
        Ok(calendar_context(&events, Local::now().naive_local()))
    }
}

pub fn calendar_context(events: &[CalendarEvent], now: NaiveDateTime) -> ContextSnapshot {
    let today = now.date();
    let todays: Vec<&CalendarEvent> = events
        .iter()
        .filter(|event| event.start.date() == today)
        .collect();

    let has_current = todays
        .iter()
        .any(|event| event.start <= now && now <= event.end);
    let next_start = todays
        .iter()
        .filter(|event| event.start > now)
        .map(|event| event.start)
        .min();

    let mut snapshot = ContextSnapshot::new();
    snapshot.insert(
        "calendar_has_current_meeting".into(),
        Scalar::Bool(has_current),
    );
    snapshot.insert(
        "calendar_meetings_today".into(),
        Scalar::Int(todays.len() as i64),
    );
    if let Some(start) = next_start {
        snapshot.insert(
            "calendar_next_meeting_in_minutes".into(),
            Scalar::Int((start - now).num_minutes()),
        );
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn event(subject: &str, start: NaiveDateTime, end: NaiveDateTime) -> CalendarEvent {
        CalendarEvent {
            subject: subject.into(),
            start,
            end,
        }
    }

    #[test]
    fn detects_current_and_next_meeting() {
        let events = vec![
            event("standup", at(9, 0), at(9, 15)),
            event("review", at(11, 30), at(12, 0)),
            event("retro", at(15, 0), at(16, 0)),
        ];

        let snapshot = calendar_context(&events, at(9, 10));
        assert_eq!(snapshot["calendar_has_current_meeting"], Scalar::Bool(true));
        assert_eq!(snapshot["calendar_next_meeting_in_minutes"], Scalar::Int(140));
        assert_eq!(snapshot["calendar_meetings_today"], Scalar::Int(3));
    }

    #[test]
    fn empty_day_has_no_next_meeting() {
        let snapshot = calendar_context(&[], at(10, 0));
        assert_eq!(snapshot["calendar_has_current_meeting"], Scalar::Bool(false));
        assert!(!snapshot.contains_key("calendar_next_meeting_in_minutes"));
    }

    #[test]
    fn reads_events_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("calendar.json");
        std::fs::write(
            &path,
            r#"[{"subject": "1:1", "start": "2024-05-06T14:00:00", "end": "2024-05-06T14:30:00"}]"#,
        )
        .unwrap();

        let events = CalendarCollector::new(path).load_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, at(14, 0));
    }

    #[test]
    fn missing_file_is_an_empty_calendar_but_garbage_fails() {
        let dir = TempDir::new().unwrap();
        let missing = CalendarCollector::new(dir.path().join("nope.json"));
        assert!(missing.collect().is_ok());

        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(CalendarCollector::new(path).collect().is_err());
    }
}

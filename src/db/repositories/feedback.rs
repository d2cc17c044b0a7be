use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde_json::{from_str, to_string};

use crate::db::{
    helpers::{format_datetime, parse_datetime, to_usize},
    Database,
};
use crate::models::{FeatureVector, FeedbackRecord, Settings, TrainingSample};
use crate::storage::{training_sample, FeedbackStore};

impl Database {
    pub fn insert_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            let settings_json =
                to_string(&record.settings).context("failed to serialize feedback settings")?;
            let features_json = record
                .features
                .as_ref()
                .map(to_string)
                .transpose()
                .context("failed to serialize feedback features")?;

            conn.execute(
                "INSERT INTO feedback (id, recorded_at, satisfaction, settings_json, features_json)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    format_datetime(&record.recorded_at),
                    record.satisfaction,
                    settings_json,
                    features_json,
                ],
            )
            .with_context(|| "failed to insert feedback")?;
            Ok(())
        })
    }

    pub fn count_feedback_since(&self, since: DateTime<Utc>) -> Result<usize> {
        let since = format_datetime(&since);
        self.execute(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM feedback WHERE recorded_at > ?1",
                    params![since],
                    |row| row.get(0),
                )
                .context("failed to count feedback")?;
            to_usize(count, "feedback count")
        })
    }

    pub fn get_feedback(&self) -> Result<Vec<FeedbackRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, recorded_at, satisfaction, settings_json, features_json
                 FROM feedback
                 ORDER BY recorded_at ASC",
            )?;

            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                let settings_json: String = row.get(3)?;
                let features_json: Option<String> = row.get(4)?;

                let settings: Settings =
                    from_str(&settings_json).context("failed to parse feedback settings")?;
                let features = features_json
                    .map(|raw| from_str::<FeatureVector>(&raw))
                    .transpose()
                    .context("failed to parse feedback features")?;

                records.push(FeedbackRecord {
                    id: row.get(0)?,
                    recorded_at: parse_datetime(&row.get::<_, String>(1)?, "recorded_at")?,
                    satisfaction: row.get(2)?,
                    settings,
                    features,
                });
            }

            Ok(records)
        })
    }
}

impl FeedbackStore for Database {
    fn store_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        self.insert_feedback(record)
    }

    fn count_new_data(&self, since: DateTime<Utc>) -> Result<usize> {
        self.count_feedback_since(since)
    }

    fn get_training_data(&self) -> Result<Vec<TrainingSample>> {
        Ok(self
            .get_feedback()?
            .iter()
            .filter_map(training_sample)
            .collect())
    }
}

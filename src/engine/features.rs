use crate::error::EnvError;
use crate::models::{ContextSnapshot, FeatureVector};

/// A namespace contributes features only when its anchor key is present.
struct FeatureGroup {
    anchor: &'static str,
    optional: &'static [(&'static str, f64)],
}

const FEATURE_GROUPS: [FeatureGroup; 3] = [
    FeatureGroup {
        anchor: "time_hour",
        optional: &[
            ("time_minute", 0.0),
            ("time_day_of_week", 0.0),
            ("time_is_weekend", 0.0),
        ],
    },
    FeatureGroup {
        anchor: "system_cpu_usage",
        optional: &[("system_memory_usage", 50.0), ("system_battery", 100.0)],
    },
    FeatureGroup {
        anchor: "calendar_has_current_meeting",
        optional: &[("calendar_next_meeting_in_minutes", 1440.0)],
    },
];

const HIGH_CPU_PERCENT: f64 = 80.0;

/// Build the model input from a snapshot.
///
/// Unknown keys are ignored. A recognized key holding a non-numeric value, or a snapshot with
/// no recognized namespace at all, is an error.
pub fn extract_features(snapshot: &ContextSnapshot) -> Result<FeatureVector, EnvError> {
    let mut features = FeatureVector::new();

    for group in &FEATURE_GROUPS {
        let Some(anchor) = snapshot.get(group.anchor) else {
            continue;
        };
        features.insert(group.anchor, numeric(group.anchor, anchor.as_f64())?);

        for (name, default) in group.optional {
            let value = match snapshot.get(*name) {
                Some(raw) => numeric(name, raw.as_f64())?,
                None => *default,
            };
            features.insert(*name, value);
        }
    }

    if features.is_empty() {
        return Err(EnvError::Prediction(
            "snapshot carries no recognized context".into(),
        ));
    }
    Ok(features)
}

fn numeric(name: &str, value: Option<f64>) -> Result<f64, EnvError> {
    value.ok_or_else(|| EnvError::Prediction(format!("context value {name} is not numeric")))
}

/// Plain-language reasons behind a recommendation.
pub fn explain(features: &FeatureVector) -> String {
    let mut reasons = Vec::new();

    if let Some(hour) = features.get("time_hour") {
        let reason = match hour as i64 {
            5..=11 => "morning hours (optimizing for productivity)",
            12..=16 => "afternoon hours (balanced settings)",
            17..=21 => "evening hours (optimizing for comfort)",
            _ => "night hours (reduced brightness)",
        };
        reasons.push(reason);
    }

    if features
        .get("system_cpu_usage")
        .is_some_and(|cpu| cpu > HIGH_CPU_PERCENT)
    {
        reasons.push("high CPU usage (optimizing for performance)");
    }

    if features
        .get("calendar_has_current_meeting")
        .is_some_and(|meeting| meeting >= 1.0)
    {
        reasons.push("ongoing meeting detected (optimizing for communication)");
    }

    if reasons.is_empty() {
        return "No explanation available".into();
    }

    let mut explanation = String::from("Environment adjusted based on:");
    for reason in reasons {
        explanation.push_str("\n- ");
        explanation.push_str(reason);
    }
    explanation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scalar;

    fn snapshot(entries: &[(&str, Scalar)]) -> ContextSnapshot {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn fills_optional_fields_with_defaults() {
        let features = extract_features(&snapshot(&[
            ("time_hour", Scalar::Int(9)),
            ("system_cpu_usage", Scalar::Int(30)),
        ]))
        .unwrap();

        assert_eq!(features.get("time_hour"), Some(9.0));
        assert_eq!(features.get("time_minute"), Some(0.0));
        assert_eq!(features.get("system_memory_usage"), Some(50.0));
        assert_eq!(features.get("system_battery"), Some(100.0));
        assert!(!features.contains("calendar_has_current_meeting"));
        assert_eq!(features.len(), 7);
    }

    #[test]
    fn optional_fields_without_anchor_are_ignored() {
        let features = extract_features(&snapshot(&[
            ("time_hour", Scalar::Int(14)),
            ("system_memory_usage", Scalar::Int(90)),
            ("weather_rain", Scalar::Bool(true)),
        ]))
        .unwrap();

        assert!(!features.contains("system_memory_usage"));
        assert!(!features.contains("weather_rain"));
    }

    #[test]
    fn meeting_flag_becomes_numeric() {
        let features = extract_features(&snapshot(&[(
            "calendar_has_current_meeting",
            Scalar::Bool(true),
        )]))
        .unwrap();
        assert_eq!(features.get("calendar_has_current_meeting"), Some(1.0));
        assert_eq!(features.get("calendar_next_meeting_in_minutes"), Some(1440.0));
    }

    #[test]
    fn empty_and_malformed_snapshots_are_errors() {
        assert!(extract_features(&ContextSnapshot::new()).is_err());
        assert!(extract_features(&snapshot(&[("time_hour", Scalar::Text("nine".into()))])).is_err());
        assert!(extract_features(&snapshot(&[
            ("system_cpu_usage", Scalar::Int(40)),
            ("system_battery", Scalar::Text("unknown".into())),
        ]))
        .is_err());
    }

    #[test]
    fn explanation_mentions_each_signal() {
        let mut features = FeatureVector::new();
        features.insert("time_hour", 20.0);
        features.insert("system_cpu_usage", 93.0);
        features.insert("calendar_has_current_meeting", 1.0);

        let text = explain(&features);
        assert!(text.contains("evening"));
        assert!(text.contains("high CPU"));
        assert!(text.contains("meeting"));
        assert_eq!(explain(&FeatureVector::new()), "No explanation available");
    }
}

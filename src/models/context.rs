use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single context or setting value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Numeric view used by feature extraction. Booleans count as 0/1; text only when it parses.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Bool(value) => Some(if *value { 1.0 } else { 0.0 }),
            Scalar::Int(value) => Some(*value as f64),
            Scalar::Float(value) if value.is_finite() => Some(*value),
            Scalar::Float(_) => None,
            Scalar::Text(raw) => raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<u32> for Scalar {
    fn from(value: u32) -> Self {
        Scalar::Int(i64::from(value))
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

/// Merged per-tick context, keyed by namespaced signal name (`time_*`, `system_*`, `calendar_*`).
pub type ContextSnapshot = BTreeMap<String, Scalar>;

/// Named numeric features extracted from a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_numeric_view() {
        assert_eq!(Scalar::Bool(true).as_f64(), Some(1.0));
        assert_eq!(Scalar::Int(9).as_f64(), Some(9.0));
        assert_eq!(Scalar::Text(" 42.5 ".into()).as_f64(), Some(42.5));
        assert_eq!(Scalar::Text("busy".into()).as_f64(), None);
        assert_eq!(Scalar::Float(f64::NAN).as_f64(), None);
    }

    #[test]
    fn scalar_deserializes_untagged() {
        let snapshot: ContextSnapshot =
            serde_json::from_str(r#"{"time_hour": 9, "system_cpu_usage": 30.5, "calendar_has_current_meeting": true}"#)
                .unwrap();
        assert_eq!(snapshot["time_hour"], Scalar::Int(9));
        assert_eq!(snapshot["system_cpu_usage"], Scalar::Float(30.5));
        assert_eq!(snapshot["calendar_has_current_meeting"], Scalar::Bool(true));
    }
}

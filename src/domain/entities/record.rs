use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A scalar accepted by the engine's metadata payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl MetadataValue {
    /// Converts a JSON value, returning `None` for null, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::String(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Engine-native metadata: string keys mapped to scalars only.
pub type FlatRecord = BTreeMap<String, MetadataValue>;

/// Equality constraints on flat-record keys; every entry must match.
pub type MetadataFilter = BTreeMap<String, MetadataValue>;

pub fn matches_filter(record: &FlatRecord, filter: &MetadataFilter) -> bool {
    filter
        .iter()
        .all(|(key, value)| record.get(key) == Some(value))
}

/// What the engine persists for one chunk, minus its vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub text: String,
    pub metadata: FlatRecord,
}

#[derive(Debug, Clone)]
pub struct ScoredRecord {
    pub record: VectorRecord,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_keeps_scalars_only() {
        assert_eq!(
            MetadataValue::from_json(&json!("a")),
            Some(MetadataValue::String("a".into()))
        );
        assert_eq!(
            MetadataValue::from_json(&json!(3)),
            Some(MetadataValue::Integer(3))
        );
        assert_eq!(
            MetadataValue::from_json(&json!(2.5)),
            Some(MetadataValue::Float(2.5))
        );
        assert_eq!(
            MetadataValue::from_json(&json!(true)),
            Some(MetadataValue::Bool(true))
        );
        assert_eq!(MetadataValue::from_json(&json!(null)), None);
        assert_eq!(MetadataValue::from_json(&json!([1, 2])), None);
        assert_eq!(MetadataValue::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_untagged_deserialize_prefers_integer() {
        let record: FlatRecord =
            serde_json::from_str(r#"{"a": 7, "b": 7.5, "c": "x", "d": false}"#).unwrap();
        assert_eq!(record["a"], MetadataValue::Integer(7));
        assert_eq!(record["b"], MetadataValue::Float(7.5));
        assert_eq!(record["c"], MetadataValue::String("x".into()));
        assert_eq!(record["d"], MetadataValue::Bool(false));
    }

    #[test]
    fn test_matches_filter() {
        let mut record = FlatRecord::new();
        record.insert("doc_id".into(), "d1".into());
        record.insert("file_type".into(), "pdf".into());

        let mut filter = MetadataFilter::new();
        assert!(matches_filter(&record, &filter));

        filter.insert("doc_id".into(), "d1".into());
        assert!(matches_filter(&record, &filter));

        filter.insert("file_type".into(), "txt".into());
        assert!(!matches_filter(&record, &filter));
    }
}

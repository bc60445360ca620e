use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One retrieved log entry. `ts_nanos` is authoritative for ordering and
/// cursor arithmetic; `ts` is derived for display and must never feed back
/// into window math.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogRecord {
    pub ts: DateTime<Utc>,
    pub ts_nanos: i64,
    pub labels: BTreeMap<String, String>,
    pub message: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    pub fn new(
        ts_nanos: i64,
        labels: BTreeMap<String, String>,
        message: String,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            ts: DateTime::from_timestamp_nanos(ts_nanos),
            ts_nanos,
            labels,
            message,
            fields,
        }
    }

    /// Resolves a key against parsed fields first, then stream labels.
    /// Parsed fields win on collision because they are merged in after labels.
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.fields.get(key) {
            return Some(value.clone());
        }
        self.labels.get(key).map(|v| Value::String(v.clone()))
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with(label: (&str, &str), field: (&str, Value)) -> LogRecord {
        let mut labels = BTreeMap::new();
        labels.insert(label.0.to_string(), label.1.to_string());
        let mut fields = Map::new();
        fields.insert(field.0.to_string(), field.1);
        LogRecord::new(1_700_000_000_000_000_000, labels, "line".to_string(), fields)
    }

    #[test]
    fn parsed_field_wins_over_label() {
        let r = record_with(("level", "INFO"), ("level", Value::String("DEBUG".into())));
        assert_eq!(r.get_str("level").as_deref(), Some("DEBUG"));
    }

    #[test]
    fn label_is_fallback() {
        let r = record_with(("service_name", "bot"), ("other", Value::Bool(true)));
        assert_eq!(r.get_str("service_name").as_deref(), Some("bot"));
        assert_eq!(r.get("missing"), None);
    }

    #[test]
    fn numeric_access_parses_strings() {
        let r = record_with(("account_id", "52"), ("count", Value::from(3)));
        assert_eq!(r.get_i64("account_id"), Some(52));
        assert_eq!(r.get_i64("count"), Some(3));
    }

    #[test]
    fn ts_derived_from_nanos() {
        let r = record_with(("a", "b"), ("c", Value::Null));
        assert_eq!(r.ts.timestamp(), 1_700_000_000);
    }
}

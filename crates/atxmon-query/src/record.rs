//! Log record model and field-equality filters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::QueryError;
use crate::timestamp::{parse_log_timestamp, TimestampError};

/// Source field carrying the Kubernetes namespace of the emitting pod.
pub const NAMESPACE_FIELD: &str = "kubernetes.namespace_name";

/// Message tag field.
pub const MESSAGE_FIELD: &str = "M";

/// Timestamp field.
pub const TIMESTAMP_FIELD: &str = "T";

// ---------------------------------------------------------------------------
// Field filters
// ---------------------------------------------------------------------------

/// Value side of an exact-match predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    /// Layer and epoch ids.
    UInt(u64),
}

impl FieldValue {
    /// Exact comparison against a JSON source value.
    ///
    /// Integers also match their decimal string form; nodes are not consistent
    /// about quoting `layer_id` / `epoch_id`.
    pub fn matches_json(&self, v: &Value) -> bool {
        match (self, v) {
            (FieldValue::Str(s), Value::String(o)) => s == o,
            (FieldValue::Int(i), Value::Number(n)) => n.as_i64() == Some(*i),
            (FieldValue::Int(i), Value::String(o)) => o.parse::<i64>().ok() == Some(*i),
            (FieldValue::UInt(u), Value::Number(n)) => n.as_u64() == Some(*u),
            (FieldValue::UInt(u), Value::String(o)) => o.parse::<u64>().ok() == Some(*u),
            _ => false,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Int(i) => Value::from(*i),
            FieldValue::UInt(u) => Value::from(*u),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{s:?}"),
            FieldValue::Int(i) => write!(f, "{i}"),
            FieldValue::UInt(u) => write!(f, "{u}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Str(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Str(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<u64> for FieldValue {
    fn from(u: u64) -> Self {
        FieldValue::UInt(u)
    }
}

/// Ordered conjunction of `field == value` predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.0.push((name.to_string(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (k, v)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}

// ---------------------------------------------------------------------------
// Log record
// ---------------------------------------------------------------------------

/// A structured log event as stored by the indexing backend.
///
/// The commonly used fields are lifted out; the full `_source` document is
/// kept in `source` for field lookups and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Message tag (`M`), e.g. `"release tick"`.
    pub message: String,
    /// Raw `T` value exactly as logged.
    pub timestamp: String,
    pub namespace: Option<String>,
    pub layer_id: Option<u64>,
    pub epoch_id: Option<u64>,
    pub source: Value,
}

impl LogRecord {
    /// Decode a record from a backend `_source` document.
    pub fn from_source(source: Value) -> Result<Self, QueryError> {
        if !source.is_object() {
            return Err(QueryError::MalformedRecord(format!(
                "expected a JSON object, got {source}"
            )));
        }

        let message = lookup(&source, MESSAGE_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::MalformedRecord("missing string field 'M'".to_string()))?
            .to_string();
        let timestamp = lookup(&source, TIMESTAMP_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::MalformedRecord("missing string field 'T'".to_string()))?
            .to_string();
        let namespace = lookup(&source, NAMESPACE_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string);
        let layer_id = lookup(&source, "layer_id").and_then(as_u64);
        let epoch_id = lookup(&source, "epoch_id").and_then(as_u64);

        Ok(Self {
            message,
            timestamp,
            namespace,
            layer_id,
            epoch_id,
            source,
        })
    }

    /// Look up a source field by name.
    ///
    /// Dotted names resolve either as a literal key or as a nested path.
    pub fn field(&self, name: &str) -> Option<&Value> {
        lookup(&self.source, name)
    }

    /// Parse `T` into a UTC instant.
    pub fn instant(&self) -> Result<DateTime<Utc>, TimestampError> {
        parse_log_timestamp(&self.timestamp)
    }

    /// `true` iff the namespace equals `namespace` and every predicate holds.
    pub fn matches(&self, namespace: &str, fields: &Fields) -> bool {
        if self.namespace.as_deref() != Some(namespace) {
            return false;
        }
        fields
            .iter()
            .all(|(k, v)| self.field(k).map(|got| v.matches_json(got)).unwrap_or(false))
    }
}

fn lookup<'a>(source: &'a Value, name: &str) -> Option<&'a Value> {
    if let Some(v) = source.get(name) {
        return Some(v);
    }
    let mut cur = source;
    for part in name.split('.') {
        cur = cur.get(part)?;
    }
    Some(cur)
}

fn as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

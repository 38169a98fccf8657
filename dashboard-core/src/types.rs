//! Core types for the dashboard engine
//!
//! This module defines the values that arrive over the message channel and the
//! error type shared by the whole library. A telemetry batch is an ordered list of
//! `(channel name, value)` pairs; the dispatcher decides per entry what the value means.

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;

/// Timestamp type used for raised alerts
pub type Timestamp = DateTime<Utc>;

/// Result type for dashboard operations
pub type Result<T> = std::result::Result<T, DashboardError>;

/// Errors that can occur while building or feeding the dashboard
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("Invalid message batch: {0}")]
    InvalidBatch(String),

    #[error("Malformed entry for channel '{channel}': {reason}")]
    MalformedEntry { channel: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Message channel closed")]
    ChannelClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Shorthand for a per-entry shape error
    pub fn malformed(channel: &str, reason: impl Into<String>) -> Self {
        DashboardError::MalformedEntry {
            channel: channel.to_string(),
            reason: reason.into(),
        }
    }
}

/// A telemetry value as delivered by the message channel
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryValue {
    Null,
    Bool(bool),
    /// Exact integer; covers the full `i64` and `u64` ranges so packed bitfields keep every bit
    Integer(i128),
    Number(f64),
    Text(String),
    /// Ordered nested mapping (`limits`, `logMessage`)
    Map(Vec<(String, TelemetryValue)>),
    List(Vec<TelemetryValue>),
}

impl TelemetryValue {
    /// Numeric view of the value. Booleans map to 0/1, numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TelemetryValue::Integer(v) => Some(*v as f64),
            TelemetryValue::Number(v) => Some(*v),
            TelemetryValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            TelemetryValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-negative integer view, used for packed bitfields
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TelemetryValue::Integer(v) => u64::try_from(*v).ok(),
            TelemetryValue::Text(s) => match s.trim().parse::<u64>() {
                Ok(v) => Some(v),
                Err(_) => TelemetryValue::Number(s.trim().parse().ok()?).as_u64(),
            },
            _ => {
                let v = self.as_f64()?;
                if v < 0.0 || v.fract() != 0.0 || v >= u64::MAX as f64 {
                    return None;
                }
                Some(v as u64)
            }
        }
    }

    /// Truthiness of the value, in the loose sense the controller uses for flags
    pub fn as_bool(&self) -> bool {
        match self {
            TelemetryValue::Null => false,
            TelemetryValue::Bool(v) => *v,
            TelemetryValue::Integer(v) => *v != 0,
            TelemetryValue::Number(v) => *v != 0.0 && !v.is_nan(),
            TelemetryValue::Text(s) => !s.is_empty(),
            TelemetryValue::Map(_) | TelemetryValue::List(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TelemetryValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Entries of a nested mapping, `None` for any other shape
    pub fn as_map(&self) -> Option<&[(String, TelemetryValue)]> {
        match self {
            TelemetryValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in a nested mapping
    pub fn get(&self, key: &str) -> Option<&TelemetryValue> {
        self.as_map()?
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Null => Ok(()),
            TelemetryValue::Bool(v) => write!(f, "{}", v),
            TelemetryValue::Integer(v) => write!(f, "{}", v),
            TelemetryValue::Number(v) => write!(f, "{}", v),
            TelemetryValue::Text(s) => write!(f, "{}", s),
            TelemetryValue::Map(entries) => {
                write!(f, "{{")?;
                for (i, (name, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            TelemetryValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Serialize for TelemetryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TelemetryValue::Null => serializer.serialize_unit(),
            TelemetryValue::Bool(v) => serializer.serialize_bool(*v),
            TelemetryValue::Integer(v) => match (i64::try_from(*v), u64::try_from(*v)) {
                (Ok(v), _) => serializer.serialize_i64(v),
                (_, Ok(v)) => serializer.serialize_u64(v),
                _ => serializer.serialize_i128(*v),
            },
            TelemetryValue::Number(v) => serializer.serialize_f64(*v),
            TelemetryValue::Text(s) => serializer.serialize_str(s),
            TelemetryValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (name, value) in entries {
                    map.serialize_entry(name, value)?;
                }
                map.end()
            }
            TelemetryValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
        }
    }
}

impl From<serde_json::Value> for TelemetryValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => TelemetryValue::Null,
            serde_json::Value::Bool(b) => TelemetryValue::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    TelemetryValue::Integer(v.into())
                } else if let Some(v) = n.as_i64() {
                    TelemetryValue::Integer(v.into())
                } else {
                    TelemetryValue::Number(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => TelemetryValue::Text(s),
            serde_json::Value::Array(items) => {
                TelemetryValue::List(items.into_iter().map(TelemetryValue::from).collect())
            }
            serde_json::Value::Object(map) => TelemetryValue::Map(
                map.into_iter()
                    .map(|(name, value)| (name, TelemetryValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<f64> for TelemetryValue {
    fn from(value: f64) -> Self {
        TelemetryValue::Number(value)
    }
}

impl From<i64> for TelemetryValue {
    fn from(value: i64) -> Self {
        TelemetryValue::Integer(value.into())
    }
}

impl From<u64> for TelemetryValue {
    fn from(value: u64) -> Self {
        TelemetryValue::Integer(value.into())
    }
}

impl From<bool> for TelemetryValue {
    fn from(value: bool) -> Self {
        TelemetryValue::Bool(value)
    }
}

impl From<String> for TelemetryValue {
    fn from(value: String) -> Self {
        TelemetryValue::Text(value)
    }
}

impl From<&str> for TelemetryValue {
    fn from(value: &str) -> Self {
        TelemetryValue::Text(value.to_string())
    }
}

/// One decoded message from the channel: ordered `(name, value)` pairs
///
/// Names are unique within a batch; a later duplicate replaces the earlier value
/// in place so the first position is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageBatch {
    entries: Vec<(String, TelemetryValue)>,
}

impl MessageBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a batch from the JSON text delivered by the channel worker
    ///
    /// The top level must be an object; anything else cannot be a batch.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value {
            serde_json::Value::Object(map) => {
                let mut batch = MessageBatch::new();
                for (name, value) in map {
                    batch.insert(name, TelemetryValue::from(value));
                }
                Ok(batch)
            }
            other => Err(DashboardError::InvalidBatch(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Builder method: add an entry
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TelemetryValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TelemetryValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&TelemetryValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TelemetryValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

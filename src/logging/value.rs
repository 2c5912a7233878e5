//! Structured payload values.
//!
//! A closed set of shapes that always serializes to JSON, used for log
//! `data`, metric metadata and recovery results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A structured value attached to log entries and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum LogValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<LogValue>),
    Record(BTreeMap<String, LogValue>),
}

impl LogValue {
    /// Build a record from key/value pairs.
    pub fn record<K, I>(fields: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, LogValue)>,
    {
        LogValue::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn empty_record() -> Self {
        LogValue::Record(BTreeMap::new())
    }

    /// Look up a field when this value is a record.
    pub fn get(&self, key: &str) -> Option<&LogValue> {
        match self {
            LogValue::Record(fields) => fields.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LogValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            LogValue::Int(i) => Some(*i as f64),
            LogValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LogValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Insert a field, turning a non-record value into a record that keeps
    /// the old value under `details`.
    pub fn insert(&mut self, key: impl Into<String>, value: LogValue) {
        let mut fields = std::mem::take(self).into_fields();
        fields.insert(key.into(), value);
        *self = LogValue::Record(fields);
    }

    /// Fold `other` into `self`. Record fields from `other` win on conflict;
    /// a non-record `other` is kept under `details`.
    pub fn merge(self, other: Option<LogValue>) -> LogValue {
        let mut fields = self.into_fields();
        match other {
            None | Some(LogValue::Null) => {}
            Some(LogValue::Record(extra)) => fields.extend(extra),
            Some(other) => {
                fields.insert("details".to_string(), other);
            }
        }
        LogValue::Record(fields)
    }

    fn into_fields(self) -> BTreeMap<String, LogValue> {
        match self {
            LogValue::Record(fields) => fields,
            LogValue::Null => BTreeMap::new(),
            other => BTreeMap::from([("details".to_string(), other)]),
        }
    }
}

impl fmt::Display for LogValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("null"),
        }
    }
}

impl From<bool> for LogValue {
    fn from(v: bool) -> Self {
        LogValue::Bool(v)
    }
}

impl From<i32> for LogValue {
    fn from(v: i32) -> Self {
        LogValue::Int(v.into())
    }
}

impl From<i64> for LogValue {
    fn from(v: i64) -> Self {
        LogValue::Int(v)
    }
}

impl From<u16> for LogValue {
    fn from(v: u16) -> Self {
        LogValue::Int(v.into())
    }
}

impl From<u32> for LogValue {
    fn from(v: u32) -> Self {
        LogValue::Int(v.into())
    }
}

impl From<u64> for LogValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map(LogValue::Int).unwrap_or(LogValue::Float(v as f64))
    }
}

impl From<usize> for LogValue {
    fn from(v: usize) -> Self {
        LogValue::from(v as u64)
    }
}

impl From<f64> for LogValue {
    fn from(v: f64) -> Self {
        LogValue::Float(v)
    }
}

impl From<&str> for LogValue {
    fn from(v: &str) -> Self {
        LogValue::String(v.to_string())
    }
}

impl From<String> for LogValue {
    fn from(v: String) -> Self {
        LogValue::String(v)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(LogValue::Null)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(v: Vec<T>) -> Self {
        LogValue::Array(v.into_iter().map(Into::into).collect())
    }
}

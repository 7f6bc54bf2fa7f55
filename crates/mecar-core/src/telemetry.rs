//! Vehicle telemetry models
//!
//! The vendor API answers every container request with a JSON array of
//! records. Each record maps a field name to a wrapper holding the value and
//! some metadata:
//!
//! ```json
//! [{"tanklevelpercent": {"value": "15", "timestamp": 1590000000000}}]
//! ```
//!
//! Which fields are present depends on model and trim.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single telemetry value with its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Reported value, usually a string even for numbers
    #[serde(default)]
    pub value: serde_json::Value,
    /// Time of measurement (epoch milliseconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Unit of measurement (e.g., "KILOMETERS")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrievalstatus: Option<String>,
}

impl FieldValue {
    pub fn new(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: value.into(),
            timestamp: None,
            unit: None,
            retrievalstatus: None,
        }
    }

    /// Add a measurement timestamp (epoch milliseconds)
    pub fn with_timestamp(mut self, millis: i64) -> Self {
        self.timestamp = Some(millis);
        self
    }

    /// Value as a string.
    ///
    /// The vendor reports indicator values as strings; a number or boolean
    /// in their place is a different value and has no string form.
    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    /// Leading integer of the value (`"50.7"` → 50, `"abc"` → `None`)
    pub fn leading_integer(&self) -> Option<i64> {
        match &self.value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            serde_json::Value::String(s) => parse_leading_integer(s),
            _ => None,
        }
    }

    /// Measurement time, if reported
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis)
    }
}

/// Parse an optional sign followed by digits, ignoring anything after them.
///
/// ```
/// # use mecar_core::telemetry::parse_leading_integer;
/// assert_eq!(parse_leading_integer(" 42km"), Some(42));
/// assert_eq!(parse_leading_integer("-7"), Some(-7));
/// assert_eq!(parse_leading_integer("km"), None);
/// ```
pub fn parse_leading_integer(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let magnitude: i64 = rest[..digits_len].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// One per-vehicle record: field name → value wrapper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TelemetryRecord(BTreeMap<String, FieldValue>);

impl TelemetryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with_field(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        self.0.insert(name.into(), value);
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, FieldValue)> for TelemetryRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Telemetry returned by one container request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Vec<TelemetryRecord>);

impl Snapshot {
    pub fn new(records: Vec<TelemetryRecord>) -> Self {
        Self(records)
    }

    pub fn records(&self) -> &[TelemetryRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Most recent measurement time across all fields
    pub fn latest_observation(&self) -> Option<DateTime<Utc>> {
        self.0
            .iter()
            .flat_map(|record| record.iter())
            .filter_map(|(_, value)| value.observed_at())
            .max()
    }
}

impl FromIterator<TelemetryRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = TelemetryRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<TelemetryRecord>> for Snapshot {
    fn from(records: Vec<TelemetryRecord>) -> Self {
        Self(records)
    }
}

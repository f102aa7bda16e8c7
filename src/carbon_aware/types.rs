//! Types for carbon intensity resolution

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::error::IntensityError;

/// Query window format expected by the provider (`YYYY-MM-DDTHH:MMZ`)
pub const API_DATE_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Naive layouts accepted from job tables, tried in order after RFC 3339
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Time at which a job was submitted
///
/// Job tables carry submission times as text, so the raw string is kept
/// until normalization; parsed values can be supplied directly.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "serde_json::Value", into = "String")]
pub enum SubmissionTimestamp {
    /// No timezone information, interpreted as UTC
    Naive(NaiveDateTime),
    /// Carries an explicit offset, converted to UTC
    Aware(DateTime<FixedOffset>),
    /// Unparsed text from a job table
    Text(String),
}

impl SubmissionTimestamp {
    /// Convert to a UTC instant
    pub fn normalize(&self) -> Result<DateTime<Utc>, IntensityError> {
        match self {
            Self::Naive(naive) => Ok(naive.and_utc()),
            Self::Aware(aware) => Ok(aware.with_timezone(&Utc)),
            Self::Text(raw) => parse_text(raw),
        }
    }
}

fn parse_text(raw: &str) -> Result<DateTime<Utc>, IntensityError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IntensityError::TimestampNormalization {
            input: raw.to_string(),
            reason: "empty timestamp".to_string(),
        });
    }

    if let Ok(aware) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(aware.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(IntensityError::TimestampNormalization {
        input: raw.to_string(),
        reason: "not RFC 3339 or a recognised naive date-time".to_string(),
    })
}

impl From<String> for SubmissionTimestamp {
    fn from(raw: String) -> Self {
        Self::Text(raw)
    }
}

/// Job table cells: null or non-string values are kept as text that fails
/// normalization, so the row falls back instead of failing the whole table.
impl From<serde_json::Value> for SubmissionTimestamp {
    fn from(cell: serde_json::Value) -> Self {
        match cell {
            serde_json::Value::String(raw) => Self::Text(raw),
            serde_json::Value::Null => Self::Text(String::new()),
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<&str> for SubmissionTimestamp {
    fn from(raw: &str) -> Self {
        Self::Text(raw.to_string())
    }
}

impl From<NaiveDateTime> for SubmissionTimestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

impl From<DateTime<FixedOffset>> for SubmissionTimestamp {
    fn from(aware: DateTime<FixedOffset>) -> Self {
        Self::Aware(aware)
    }
}

impl From<DateTime<Utc>> for SubmissionTimestamp {
    fn from(utc: DateTime<Utc>) -> Self {
        Self::Aware(utc.fixed_offset())
    }
}

impl From<SubmissionTimestamp> for String {
    fn from(ts: SubmissionTimestamp) -> Self {
        ts.to_string()
    }
}

impl fmt::Display for SubmissionTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Naive(naive) => write!(f, "{}", naive.format("%Y-%m-%dT%H:%M:%S")),
            Self::Aware(aware) => write!(f, "{}", aware.to_rfc3339()),
            Self::Text(raw) => f.write_str(raw),
        }
    }
}

/// UTC calendar day a submission falls on, midnight-aligned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DayKey(DateTime<Utc>);

impl DayKey {
    /// Truncate a UTC instant to 00:00:00 of its day
    pub fn from_utc(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive().and_time(NaiveTime::MIN).and_utc())
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.0
    }

    /// Query window `[start, start + 1 day)`
    ///
    /// Fails on the last representable day, whose end cannot be expressed.
    pub fn window(&self) -> Result<QueryWindow, IntensityError> {
        let to = self
            .0
            .checked_add_signed(TimeDelta::days(1))
            .ok_or_else(|| IntensityError::TimestampNormalization {
                input: self.0.to_rfc3339(),
                reason: "day after submission is out of range".to_string(),
            })?;
        Ok(QueryWindow { from: self.0, to })
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Time range a provider forecast is requested for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl QueryWindow {
    /// `(from, to)` rendered in the provider's path format
    pub fn api_bounds(&self) -> (String, String) {
        (
            self.from.format(API_DATE_FORMAT).to_string(),
            self.to.format(API_DATE_FORMAT).to_string(),
        )
    }
}

/// Intensities already fetched in this run, keyed by day
///
/// Only provider-returned values are stored; fallbacks never are.
#[derive(Clone, Debug, Default)]
pub struct IntensityCache {
    entries: HashMap<DayKey, f64>,
}

impl IntensityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, day: &DayKey) -> Option<f64> {
        self.entries.get(day).copied()
    }

    pub fn insert(&mut self, day: DayKey, intensity: f64) {
        self.entries.insert(day, intensity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Carbon intensity lookup configuration
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct CarbonIntensityConfig {
    /// Provider base URL, without trailing path
    pub base_url: String,
    /// Provider grid region id
    pub region_id: u32,
    /// Fallback intensity in gCO2e/kWh
    pub default_intensity: f64,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl CarbonIntensityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for CarbonIntensityConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.carbonintensity.org.uk".to_string(),
            // West Midlands
            region_id: 8,
            // UK grid average for 2024
            default_intensity: 124.0,
            timeout_secs: 10,
        }
    }
}

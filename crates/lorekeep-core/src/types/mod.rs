//! # Core Type Definitions
//!
//! This module contains the record types shared by every layer:
//! - The log record (`Entry`)
//! - The token-reduced projection (`EntrySummary`)
//! - Error types (`MemoryError`)
//!
//! ## Wire Shape
//!
//! One `Entry` is one JSON object on one line of the log. The category is
//! written as `type` (`entry_type` is accepted on read). Keys this crate does
//! not know about are kept in `extra` and written back unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ENTRY
// =============================================================================

/// One record of the process memory log.
///
/// The same `id` may appear many times in the raw log; the most recently
/// appended record for an id is its current state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Key within the materialized view.
    #[serde(default)]
    pub id: String,

    /// Category used for filtering (e.g. "StrategicDecision").
    #[serde(rename = "type", alias = "entry_type", default)]
    pub entry_type: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub summary: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    /// Confidence in [0.0, 1.0]. Stored as given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,

    /// Tag set. Multi-tag filters require every tag (AND).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_concepts: Vec<String>,

    /// Directed links to other entry ids. Targets may not exist.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    #[serde(default)]
    pub deprecated: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_created: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_deprecated: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_reason: Option<String>,

    /// Unrecognised keys (provenance and the like), preserved verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Entry {
    /// Create a live entry with the required fields set.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        entry_type: impl Into<String>,
        title: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            entry_type: entry_type.into(),
            title: title.into(),
            summary: summary.into(),
            rationale: None,
            confidence_level: None,
            tags: BTreeSet::new(),
            related_concepts: Vec::new(),
            links: Vec::new(),
            deprecated: false,
            timestamp_created: None,
            timestamp_deprecated: None,
            deprecation_reason: None,
            extra: BTreeMap::new(),
        }
    }

    /// Replace the tag set.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the outgoing links.
    #[must_use]
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the related concepts.
    #[must_use]
    pub fn with_concepts<I, S>(mut self, concepts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.related_concepts = concepts.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_level = Some(confidence);
        self
    }

    /// Mark the record deprecated without stamping anything.
    #[must_use]
    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// True if the entry is not deprecated.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.deprecated
    }

    /// True if the entry carries every tag in `tags` (AND semantics).
    #[must_use]
    pub fn has_all_tags<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        tags.iter().all(|tag| self.tags.contains(tag.as_ref()))
    }

    /// True if the id is usable as a key (non-blank).
    #[must_use]
    pub fn has_identifier(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

// =============================================================================
// ENTRY SUMMARY
// =============================================================================

/// Token-reduced projection of an entry.
///
/// Carries only `id`, `type`, `title`, a truncated `summary` and `tags`.
/// Rationale, links, concepts, confidence and provenance are never included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntrySummary {
    pub id: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub tags: BTreeSet<String>,
}

// =============================================================================
// TIMESTAMPS
// =============================================================================

/// A record timestamp.
///
/// Values that parse as an ISO-8601 date or date-time are held as UTC.
/// Anything else is kept as the raw string and written back unchanged, so a
/// timestamp never makes a record unreadable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timestamp {
    Parsed(DateTime<Utc>),
    Raw(String),
}

impl Timestamp {
    /// Stamp for a record appended now.
    #[must_use]
    pub fn now() -> Self {
        Self::Parsed(timestamp_now())
    }

    /// Interpret a stored string, keeping it verbatim if it does not parse.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match parse_timestamp(raw) {
            Some(ts) => Self::Parsed(ts),
            None => Self::Raw(raw.to_string()),
        }
    }

    /// The instant, if the value was understood.
    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Parsed(ts) => Some(*ts),
            Self::Raw(_) => None,
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Parsed(ts)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parsed(ts) => f.write_str(&format_timestamp(ts)),
            Self::Raw(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Non-string values (numbers, objects) are kept as their JSON text.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(raw) => Self::parse(&raw),
            other => Self::Raw(other.to_string()),
        })
    }
}

/// Offset-carrying forms tried after RFC 3339.
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
];

/// Forms without an offset, read as UTC. A trailing `Z` is stripped first.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339, `±HHMM` offsets, date-times without seconds, naive
/// date-times (read as UTC) and bare dates (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(ts) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts.with_timezone(&Utc));
    }

    let body = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .unwrap_or(raw);
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(body, fmt).ok())
    {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(body, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The current time, truncated to the precision the log stores.
///
/// A record stamped with this value reads back from the log unchanged.
#[must_use]
pub fn timestamp_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Format a timestamp the way the log stores it.
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Lorekeep core.
///
/// Single-call structural errors (`MissingIdentifier`, `NotFound`) go back to
/// the caller. `MalformedRecord` is produced while parsing log lines and is
/// absorbed by replay and streaming: a corrupt line is logged and skipped.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Append called with an empty or missing `id`.
    #[error("Entry must have a non-empty 'id' field")]
    MissingIdentifier,

    /// The requested entry is not in the materialized view.
    #[error("Entry not found: {0}")]
    NotFound(String),

    /// A log line could not be parsed into an entry.
    #[error("Malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    /// The log file could not be read or written.
    #[error("I/O error: {0}")]
    IoError(String),

    /// An entry could not be serialized for the log.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// TESTS
// =============================================================================

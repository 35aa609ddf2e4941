//! # Import Module
//!
//! Validation for entries brought in from outside the log.
//!
//! Unlike replay, which is lossy, import checks every candidate against the
//! entry contract before anything is written:
//! - `id`, `type`, `title` and `summary` present, strings, `id` non-blank
//! - `tags`, `links` and `related_concepts` lists of strings when present
//! - the object otherwise deserializes as an [`Entry`]
//!
//! Every failing candidate is reported; one bad entry never hides the next.

use crate::Entry;
use serde_json::Value;
use std::fmt;
use std::path::Path;

/// Keys every imported entry must carry as strings.
pub const REQUIRED_FIELDS: [&str; 4] = ["id", "type", "title", "summary"];

/// Optional keys that must be lists of strings when present.
pub const LIST_FIELDS: [&str; 3] = ["tags", "links", "related_concepts"];

// =============================================================================
// FORMAT
// =============================================================================

/// Shape of an import document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// One JSON array of entry objects, or a single entry object.
    Json,
    /// One entry object per line.
    Jsonl,
}

impl ImportFormat {
    /// Pick the format from a file extension: `.jsonl`/`.ndjson` are JSONL,
    /// anything else is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                Self::Jsonl
            }
            _ => Self::Json,
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// One rejected candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportIssue {
    /// 1-based line for JSONL, 1-based array element for JSON. Zero when the
    /// document as a whole could not be read.
    pub position: usize,
    /// The candidate's `id`, when it had a readable one.
    pub id: Option<String>,
    pub reason: String,
}

impl ImportIssue {
    fn new(position: usize, id: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            position,
            id: id.map(str::to_string),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "Entry {} ({}): {}", self.position, id, self.reason),
            None => write!(f, "Entry {}: {}", self.position, self.reason),
        }
    }
}

/// Outcome of validating (and possibly writing) an import document.
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Candidates that passed validation, in document order. After a real
    /// import these are the records as written.
    pub entries: Vec<Entry>,
    pub issues: Vec<ImportIssue>,
    /// Records appended to the log. Zero for a dry run.
    pub imported: usize,
}

impl ImportReport {
    /// True if no candidate was rejected.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Validate every candidate in `content`. Nothing is written.
#[must_use]
pub fn validate_document(content: &str, format: ImportFormat) -> ImportReport {
    let mut report = ImportReport::default();

    let candidates: Vec<(usize, Value)> = match format {
        ImportFormat::Json => match serde_json::from_str::<Value>(content) {
            Ok(Value::Array(items)) => (1..).zip(items).collect(),
            Ok(object @ Value::Object(_)) => vec![(1, object)],
            Ok(other) => {
                report.issues.push(ImportIssue::new(
                    0,
                    None,
                    format!("expected a list or an object, got {}", kind(&other)),
                ));
                return report;
            }
            Err(e) => {
                report
                    .issues
                    .push(ImportIssue::new(0, None, format!("invalid JSON: {e}")));
                return report;
            }
        },
        ImportFormat::Jsonl => {
            let mut candidates = Vec::new();
            for (number, line) in (1..).zip(content.lines()) {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<Value>(line) {
                    Ok(value) => candidates.push((number, value)),
                    Err(e) => report
                        .issues
                        .push(ImportIssue::new(number, None, format!("invalid JSON: {e}"))),
                }
            }
            candidates
        }
    };

    for (position, value) in candidates {
        match validate_value(position, value) {
            Ok(entry) => report.entries.push(entry),
            Err(issue) => report.issues.push(issue),
        }
    }

    tracing::debug!(
        valid = report.entries.len(),
        rejected = report.issues.len(),
        "validated import document"
    );
    report
}

/// Check one candidate against the entry contract.
pub fn validate_value(position: usize, value: Value) -> Result<Entry, ImportIssue> {
    let Value::Object(object) = &value else {
        return Err(ImportIssue::new(
            position,
            None,
            format!("not an object (got {})", kind(&value)),
        ));
    };
    let id = object.get("id").and_then(Value::as_str);

    let missing: Vec<&str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| !object.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(ImportIssue::new(
            position,
            id,
            format!("missing required fields: {}", missing.join(", ")),
        ));
    }

    if let Some(field) = REQUIRED_FIELDS
        .into_iter()
        .find(|field| !object.get(*field).is_some_and(Value::is_string))
    {
        return Err(ImportIssue::new(
            position,
            id,
            format!("'{field}' must be a string"),
        ));
    }

    if id.is_some_and(|id| id.trim().is_empty()) {
        return Err(ImportIssue::new(position, id, "'id' must not be blank"));
    }

    if let Some(field) = LIST_FIELDS.into_iter().find(|field| {
        object
            .get(*field)
            .is_some_and(|v| !v.as_array().is_some_and(|items| items.iter().all(Value::is_string)))
    }) {
        return Err(ImportIssue::new(
            position,
            id,
            format!("'{field}' must be a list of strings"),
        ));
    }

    let owned_id = id.map(str::to_string);
    serde_json::from_value(value)
        .map_err(|e| ImportIssue::new(position, owned_id.as_deref(), e.to_string()))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// TESTS
// =============================================================================

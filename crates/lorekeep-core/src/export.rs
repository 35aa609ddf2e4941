//! # Export Module
//!
//! Renders a set of entries for readers outside the store.
//!
//! - JSON: a pretty-printed array in the log's own wire shape, so the output
//!   can be fed back through import
//! - Markdown: a document grouped by entry type, for humans

use crate::{Entry, MemoryError};
use std::collections::BTreeMap;

/// Title line of every Markdown export.
pub const MARKDOWN_TITLE: &str = "# Process Memory";

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

/// Render `entries` in `format`.
pub fn render(entries: &[&Entry], format: ExportFormat) -> Result<String, MemoryError> {
    match format {
        ExportFormat::Json => to_json(entries),
        ExportFormat::Markdown => Ok(to_markdown(entries)),
    }
}

/// Pretty JSON array of the entries.
pub fn to_json(entries: &[&Entry]) -> Result<String, MemoryError> {
    serde_json::to_string_pretty(entries).map_err(|e| MemoryError::SerializationError(e.to_string()))
}

/// Markdown document, one `##` section per type in type order and one `###`
/// block per entry in the order given.
#[must_use]
pub fn to_markdown(entries: &[&Entry]) -> String {
    let mut by_type: BTreeMap<&str, Vec<&Entry>> = BTreeMap::new();
    for &entry in entries {
        let entry_type = if entry.entry_type.is_empty() {
            "Unknown"
        } else {
            entry.entry_type.as_str()
        };
        by_type.entry(entry_type).or_default().push(entry);
    }

    let mut lines: Vec<String> = vec![
        MARKDOWN_TITLE.to_string(),
        String::new(),
        "Accumulated design decisions, lessons learned, and observations.".to_string(),
        String::new(),
    ];

    for (entry_type, group) in by_type {
        lines.push(format!("## {entry_type}"));
        lines.push(String::new());
        for entry in group {
            push_entry(&mut lines, entry);
        }
    }

    lines.join("\n")
}

fn push_entry(lines: &mut Vec<String>, entry: &Entry) {
    lines.push(format!("### {}: {}", entry.id, entry.title));
    lines.push(String::new());

    let mut field = |label: &str, value: String| {
        lines.push(format!("**{label}**: {value}"));
        lines.push(String::new());
    };

    field("Summary", entry.summary.clone());
    if let Some(rationale) = &entry.rationale {
        field("Rationale", rationale.clone());
    }
    if !entry.related_concepts.is_empty() {
        field("Related Concepts", entry.related_concepts.join(", "));
    }
    if !entry.tags.is_empty() {
        let tags: Vec<String> = entry.tags.iter().map(|tag| format!("`{tag}`")).collect();
        field("Tags", tags.join(", "));
    }
    if !entry.links.is_empty() {
        field("Links", entry.links.join(", "));
    }
    if let Some(confidence) = entry.confidence_level {
        field("Confidence", format!("{confidence:.2}"));
    }
    if entry.deprecated {
        let reason = entry.deprecation_reason.as_deref().unwrap_or("no reason given");
        field("Deprecated", reason.to_string());
    }

    lines.push("---".to_string());
    lines.push(String::new());
}

//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Every command writes either a short text rendering or, with `--json`,
//! pretty-printed JSON to the given writer.

use super::AppError;
use crate::config::QueryConfig;
use lorekeep_core::{
    Entry, EntryFilter, ExportFormat, ImportFormat, MemoryError, MemoryStore, SearchQuery,
};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Output mode and query defaults shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    pub json: bool,
    pub query: QueryConfig,
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_entry_line(out: &mut dyn Write, entry: &Entry) -> Result<(), AppError> {
    let marker = if entry.deprecated { " (deprecated)" } else { "" };
    writeln!(
        out,
        "{}  [{}]  {}{}",
        entry.id, entry.entry_type, entry.title, marker
    )?;
    Ok(())
}

/// Render a list of entries, one line each in text mode.
fn write_entries(ctx: &Context, out: &mut dyn Write, entries: &[&Entry]) -> Result<(), AppError> {
    if ctx.json {
        return write_json(out, entries);
    }
    for entry in entries {
        write_entry_line(out, entry)?;
    }
    writeln!(out, "{} entries", entries.len())?;
    Ok(())
}

// =============================================================================
// WRITE COMMANDS
// =============================================================================

/// Append entries from a JSONL file or one inline JSON object.
///
/// Input is parsed strictly: the first line that is not a JSON entry object
/// aborts the command before anything from that line onwards is written. A
/// record without an `id` fails with `MissingIdentifier` from the store.
pub fn cmd_append(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    file: Option<&Path>,
    inline: Option<&str>,
) -> Result<(), AppError> {
    let content = match (file, inline) {
        (Some(path), _) => std::fs::read_to_string(path).map_err(|e| {
            AppError::Input(format!("Cannot read '{}': {}", path.display(), e))
        })?,
        (None, Some(json)) => json.to_string(),
        (None, None) => {
            return Err(AppError::Input(
                "either --file or --entry is required".to_string(),
            ));
        }
    };

    let mut written = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let entry: Entry = serde_json::from_str(line)
            .map_err(|e| AppError::Input(format!("line {}: {}", index + 1, e)))?;
        written.push(store.append(entry)?);
    }
    tracing::info!(count = written.len(), "appended entries");

    if ctx.json {
        let ids: Vec<&str> = written.iter().map(|e| e.id.as_str()).collect();
        return write_json(out, &serde_json::json!({ "appended": ids }));
    }
    writeln!(out, "Appended {} entries", written.len())?;
    Ok(())
}

/// Validate a JSON or JSONL file and append the entries that pass.
///
/// Every rejected entry is reported. Valid entries are still imported
/// unless `dry_run` is set, in which case nothing is written.
pub fn cmd_import(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    file: &Path,
    format: Option<&str>,
    dry_run: bool,
) -> Result<(), AppError> {
    let format = match format {
        None => ImportFormat::from_path(file),
        Some("json") => ImportFormat::Json,
        Some("jsonl") => ImportFormat::Jsonl,
        Some(other) => {
            return Err(AppError::Input(format!(
                "Unknown import format: {}. Use: json, jsonl",
                other
            )));
        }
    };
    let content = std::fs::read_to_string(file)
        .map_err(|e| AppError::Input(format!("Cannot read '{}': {}", file.display(), e)))?;

    let report = store.import(&content, format, dry_run)?;
    for issue in &report.issues {
        tracing::warn!(%issue, "rejected import entry");
    }

    if ctx.json {
        let errors: Vec<String> = report.issues.iter().map(ToString::to_string).collect();
        return write_json(
            out,
            &serde_json::json!({
                "valid": report.entries.len(),
                "imported": report.imported,
                "dry_run": dry_run,
                "errors": errors,
            }),
        );
    }

    for issue in &report.issues {
        writeln!(out, "  {}", issue)?;
    }
    if dry_run {
        writeln!(
            out,
            "Validated {} entries, {} rejected (dry run)",
            report.entries.len(),
            report.issues.len()
        )?;
    } else {
        writeln!(
            out,
            "Imported {} entries, {} rejected",
            report.imported,
            report.issues.len()
        )?;
    }
    Ok(())
}

/// Export entries passing a filter to a file or to `out`.
pub fn cmd_export(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    format: &str,
    output: Option<&Path>,
    filter: &EntryFilter,
) -> Result<(), AppError> {
    let format = match format {
        "json" => ExportFormat::Json,
        "markdown" | "md" => ExportFormat::Markdown,
        other => {
            return Err(AppError::Input(format!(
                "Unknown export format: {}. Use: json, markdown",
                other
            )));
        }
    };
    let rendered = store.export(filter, format)?;

    let Some(path) = output else {
        writeln!(out, "{}", rendered)?;
        return Ok(());
    };
    std::fs::write(path, &rendered)?;
    tracing::info!(path = %path.display(), bytes = rendered.len(), "exported entries");

    if ctx.json {
        return write_json(
            out,
            &serde_json::json!({ "output": path.display().to_string(), "bytes": rendered.len() }),
        );
    }
    writeln!(out, "Exported {} bytes to {}", rendered.len(), path.display())?;
    Ok(())
}

/// Deprecate an entry.
pub fn cmd_deprecate(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    id: &str,
    reason: Option<&str>,
) -> Result<(), AppError> {
    let record = store.deprecate(id, reason)?;
    if ctx.json {
        return write_json(out, &record);
    }
    writeln!(out, "Deprecated {}", record.id)?;
    Ok(())
}

// =============================================================================
// CACHE QUERIES
// =============================================================================

/// Show the current record for an id. Missing ids are an error.
pub fn cmd_get(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    id: &str,
) -> Result<(), AppError> {
    let entry = store
        .get(id)?
        .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;

    if ctx.json {
        return write_json(out, entry);
    }
    write_entry_line(out, entry)?;
    writeln!(out, "  {}", entry.summary)?;
    if let Some(rationale) = &entry.rationale {
        writeln!(out, "  Rationale: {}", rationale)?;
    }
    if !entry.tags.is_empty() {
        let tags: Vec<&str> = entry.tags.iter().map(String::as_str).collect();
        writeln!(out, "  Tags:  {}", tags.join(", "))?;
    }
    if !entry.links.is_empty() {
        writeln!(out, "  Links: {}", entry.links.join(", "))?;
    }
    Ok(())
}

/// List entries passing a filter.
pub fn cmd_list(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    filter: &EntryFilter,
) -> Result<(), AppError> {
    let entries = store.list(filter)?;
    write_entries(ctx, out, &entries)
}

/// Keyword search over live entries.
pub fn cmd_search(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    keyword: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
) -> Result<(), AppError> {
    let query = SearchQuery {
        keyword,
        category,
        tags,
    };
    let entries = store.search(&query)?;
    write_entries(ctx, out, &entries)
}

/// Token-reduced summary of one entry.
pub fn cmd_summary(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    id: &str,
    words: Option<usize>,
) -> Result<(), AppError> {
    let words = words.unwrap_or(ctx.query.summary_words);
    let summary = store.summary(id, words)?;

    if ctx.json {
        return write_json(out, &summary);
    }
    writeln!(
        out,
        "{}  [{}]  {}",
        summary.id, summary.entry_type, summary.title
    )?;
    writeln!(out, "  {}", summary.summary)?;
    Ok(())
}

/// Count entries in the materialized view.
pub fn cmd_count(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    include_deprecated: bool,
) -> Result<(), AppError> {
    let count = store.entry_count(include_deprecated)?;
    if ctx.json {
        return write_json(
            out,
            &serde_json::json!({ "count": count, "include_deprecated": include_deprecated }),
        );
    }
    writeln!(out, "{}", count)?;
    Ok(())
}

// =============================================================================
// STREAMING
// =============================================================================

/// Filter raw log records in append order without building the cache.
///
/// Text mode prints one line per record; JSON mode prints one compact
/// object per line (JSONL) so the output can be piped back into `append`.
pub fn cmd_stream(
    store: &MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    filter: EntryFilter,
) -> Result<(), AppError> {
    let mut count = 0usize;
    for record in store.stream_filtered(filter)? {
        let entry = record?;
        if ctx.json {
            serde_json::to_writer(&mut *out, &entry)?;
            writeln!(out)?;
        } else {
            write_entry_line(out, &entry)?;
        }
        count += 1;
    }
    tracing::debug!(count, "streamed records");
    Ok(())
}

// =============================================================================
// GRAPH QUERIES
// =============================================================================

/// Entries reachable from `id`.
pub fn cmd_related(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    id: &str,
    depth: Option<usize>,
    include_reverse: bool,
) -> Result<(), AppError> {
    let depth = depth.unwrap_or(ctx.query.related_depth);
    let entries = store.related(id, depth, include_reverse)?;
    write_entries(ctx, out, &entries)
}

/// Transitive dependencies of `id`.
pub fn cmd_dependencies(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    id: &str,
) -> Result<(), AppError> {
    let entries = store.dependencies(id)?;
    write_entries(ctx, out, &entries)
}

/// Direct dependents of `id`.
pub fn cmd_dependents(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    id: &str,
) -> Result<(), AppError> {
    let entries = store.dependents(id)?;
    write_entries(ctx, out, &entries)
}

pub fn cmd_concept(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    concept: &str,
) -> Result<(), AppError> {
    let entries = store.find_by_concept(concept)?;
    write_entries(ctx, out, &entries)
}

pub fn cmd_tag(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    tag: &str,
) -> Result<(), AppError> {
    let entries = store.find_by_tag(tag)?;
    write_entries(ctx, out, &entries)
}

/// Subgraph around `id`.
pub fn cmd_network(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
    id: &str,
    depth: Option<usize>,
) -> Result<(), AppError> {
    let depth = depth.unwrap_or(ctx.query.network_depth);
    let network = store.network(id, depth)?;

    if ctx.json {
        return write_json(out, &network);
    }
    writeln!(out, "Nodes ({}):", network.nodes.len())?;
    for node in &network.nodes {
        write!(out, "  ")?;
        write_entry_line(out, node)?;
    }
    writeln!(out, "Edges ({}):", network.edges.len())?;
    for edge in &network.edges {
        writeln!(out, "  {} -> {}", edge.from, edge.to)?;
    }
    Ok(())
}

/// Show graph statistics.
pub fn cmd_stats(
    store: &mut MemoryStore,
    ctx: &Context,
    out: &mut dyn Write,
) -> Result<(), AppError> {
    let stats = store.stats()?;
    let path = store.log().path().display().to_string();

    if ctx.json {
        return write_json(
            out,
            &serde_json::json!({
                "memory": path,
                "total_nodes": stats.total_nodes,
                "total_edges": stats.total_edges,
                "max_outgoing_links": stats.max_outgoing_links,
                "max_incoming_links": stats.max_incoming_links,
            }),
        );
    }

    writeln!(out, "Lorekeep Graph Stats")?;
    writeln!(out, "====================")?;
    writeln!(out, "Memory: {}", path)?;
    writeln!(out)?;
    writeln!(out, "Nodes:              {}", stats.total_nodes)?;
    writeln!(out, "Edges:              {}", stats.total_edges)?;
    writeln!(out, "Max Outgoing Links: {}", stats.max_outgoing_links)?;
    writeln!(out, "Max Incoming Links: {}", stats.max_incoming_links)?;
    Ok(())
}

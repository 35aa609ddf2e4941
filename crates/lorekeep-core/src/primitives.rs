//! # Primitives
//!
//! Hardcoded constants for the Lorekeep CORE.
//!
//! These values are compiled into the binary and shape the query surface:
//! summary sizing, default traversal depths, and the default log location.

/// Approximate characters per word used when truncating summaries.
///
/// `summary(id, max_words)` keeps at most `max_words * CHARS_PER_WORD`
/// characters of the `summary` field. This is a size heuristic, not a
/// word tokenizer.
pub const CHARS_PER_WORD: usize = 6;

/// Default word budget for token-reduced summaries.
pub const DEFAULT_SUMMARY_WORDS: usize = 150;

/// Default depth for `related` traversals (immediate neighbours only).
pub const DEFAULT_RELATED_DEPTH: usize = 1;

/// Default depth for network (subgraph) extraction.
pub const DEFAULT_NETWORK_DEPTH: usize = 2;

/// Depth used for transitive closures.
///
/// Breadth-first expansion stops as soon as a level discovers nothing new,
/// so the closure is bounded by the number of nodes, not by this value.
pub const UNBOUNDED_DEPTH: usize = usize::MAX;

/// Default file name of the process memory log.
pub const DEFAULT_LOG_FILE: &str = "process_memory.jsonl";

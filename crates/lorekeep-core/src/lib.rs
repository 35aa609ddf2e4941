//! # lorekeep-core
//!
//! Process memory for long-running agent work - THE LOGIC.
//!
//! Decisions, lessons, patterns and failures are recorded as entries in an
//! append-only JSONL log. Everything else is derived from that log and can
//! be thrown away and rebuilt at any time:
//! - `cache` → current state per id (last write wins)
//! - `graph` → forward/reverse link index for traversal
//! - `store` → the single object consumers talk to
//! - `import` / `export` → validated ingest and JSON or Markdown output
//!
//! ## Architectural Constraints
//!
//! - The log is the only source of truth; nothing is rewritten in place
//! - Deletion is a new record marked deprecated
//! - No global state: callers own their `MemoryStore`
//! - Deterministic: every listing comes back in id order or BFS order
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod cache;
pub mod export;
pub mod graph;
pub mod import;
pub mod log;
pub mod primitives;
pub mod query;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Entry, EntrySummary, MemoryError, Timestamp, format_timestamp, parse_timestamp, timestamp_now,
};

// =============================================================================
// RE-EXPORTS: Storage & Views
// =============================================================================

pub use cache::EntryCache;
pub use export::ExportFormat;
pub use graph::{EntryNetwork, GraphIndex, GraphState, GraphStats, NetworkEdge, NodeHandle};
pub use import::{ImportFormat, ImportIssue, ImportReport};
pub use log::{EntryLog, EntryStream, parse_record};
pub use query::{EntryFilter, MatchField, SearchQuery};
pub use store::MemoryStore;

// =============================================================================
// RE-EXPORTS: Constants
// =============================================================================

pub use primitives::{
    CHARS_PER_WORD, DEFAULT_LOG_FILE, DEFAULT_NETWORK_DEPTH, DEFAULT_RELATED_DEPTH,
    DEFAULT_SUMMARY_WORDS, UNBOUNDED_DEPTH,
};

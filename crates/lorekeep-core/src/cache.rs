//! # Entry Cache
//!
//! The "current state" view of the log: one entry per id, rebuilt by
//! replaying every record in append order. For a duplicated id the last
//! record wins outright (no field merging), including deprecation records.
//!
//! The cache is an acceleration structure, not a record of truth. It can be
//! dropped at any time and rebuilt from the log.

use crate::log::EntryLog;
use crate::primitives::CHARS_PER_WORD;
use crate::query::{EntryFilter, SearchQuery};
use crate::{Entry, EntrySummary, MemoryError};
use std::collections::BTreeMap;

/// Materialized view of the process memory log, keyed by entry id.
///
/// Uses `BTreeMap` so every listing comes back in id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryCache {
    entries: BTreeMap<String, Entry>,
}

impl EntryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay the whole log into a fresh cache.
    ///
    /// Malformed lines are skipped (see the lossy read contract in
    /// [`crate::log`]); only an unreadable file is an error.
    pub fn replay(log: &EntryLog) -> Result<Self, MemoryError> {
        let mut cache = Self::new();
        let mut stream = log.stream()?;
        let mut records = 0usize;

        for record in stream.by_ref() {
            cache.insert(record?);
            records = records.saturating_add(1);
        }

        tracing::info!(
            path = %log.path().display(),
            records,
            entries = cache.len(),
            skipped = stream.skipped(),
            "replayed process memory log"
        );
        Ok(cache)
    }

    /// Overwrite the slot for `entry.id`. Returns the previous record.
    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.id.clone(), entry)
    }

    /// Current record for `id`, deprecated or not.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Current record for `id` if it is not deprecated.
    #[must_use]
    pub fn get_live(&self, id: &str) -> Option<&Entry> {
        self.get(id).filter(|entry| entry.is_live())
    }

    /// Number of ids in the view, deprecated included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries, optionally counting deprecated ones.
    #[must_use]
    pub fn count(&self, include_deprecated: bool) -> usize {
        if include_deprecated {
            self.len()
        } else {
            self.live().count()
        }
    }

    /// All entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.values()
    }

    /// Non-deprecated entries in id order.
    pub fn live(&self) -> impl Iterator<Item = &Entry> {
        self.iter().filter(|entry| entry.is_live())
    }

    /// Entries passing `filter`.
    #[must_use]
    pub fn list(&self, filter: &EntryFilter) -> Vec<&Entry> {
        self.iter().filter(|entry| filter.matches(entry)).collect()
    }

    /// Entries matching a keyword search. Each entry appears at most once.
    #[must_use]
    pub fn search(&self, query: &SearchQuery) -> Vec<&Entry> {
        self.iter().filter(|entry| query.matches(entry)).collect()
    }

    /// Live entries with a related concept containing `concept`
    /// (case-insensitive). Linear scan.
    #[must_use]
    pub fn find_by_concept(&self, concept: &str) -> Vec<&Entry> {
        let needle = concept.to_lowercase();
        self.live()
            .filter(|entry| {
                entry
                    .related_concepts
                    .iter()
                    .any(|c| c.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Token-reduced projection of one entry.
    ///
    /// The summary text is cut to `max_words * CHARS_PER_WORD` characters.
    pub fn summary(&self, id: &str, max_words: usize) -> Result<EntrySummary, MemoryError> {
        let entry = self
            .get(id)
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;
        let budget = max_words.saturating_mul(CHARS_PER_WORD);

        Ok(EntrySummary {
            id: entry.id.clone(),
            entry_type: entry.entry_type.clone(),
            title: entry.title.clone(),
            summary: entry.summary.chars().take(budget).collect(),
            tags: entry.tags.clone(),
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

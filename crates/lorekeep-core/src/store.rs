//! # Memory Store
//!
//! The explicit store object combining the log, the cache and the graph.
//!
//! There are no process-wide singletons: construct a `MemoryStore` for a log
//! path, pass it by reference to whatever needs it, drop it when done.
//!
//! ## Laziness
//!
//! - The cache is replayed from the log on the first read.
//! - The graph is built on the first traversal and then kept as is.
//!   Appends update a loaded cache but never the graph; call
//!   [`MemoryStore::rebuild_graph`] to see new links.
//!
//! Reads therefore take `&mut self`. The store has no internal locking;
//! callers sharing it between threads must serialize access themselves.

use crate::cache::EntryCache;
use crate::export::{self, ExportFormat};
use crate::graph::{EntryNetwork, GraphIndex, GraphState, GraphStats, NetworkEdge};
use crate::import::{ImportFormat, ImportReport, validate_document};
use crate::log::{EntryLog, EntryStream};
use crate::primitives::UNBOUNDED_DEPTH;
use crate::query::{EntryFilter, SearchQuery};
use crate::{Entry, EntrySummary, MemoryError, Timestamp};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Keep the live cached entries for `ids`, in the order given.
fn materialize<'a, 'b>(
    cache: &'a EntryCache,
    ids: impl IntoIterator<Item = &'b str>,
) -> Vec<&'a Entry> {
    ids.into_iter().filter_map(|id| cache.get_live(id)).collect()
}

/// Process memory: append-only log plus its derived views.
#[derive(Debug)]
pub struct MemoryStore {
    log: EntryLog,
    cache: Option<EntryCache>,
    graph: GraphIndex,
}

impl MemoryStore {
    /// Create a store over the log at `path`. No I/O happens until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_log(EntryLog::new(path))
    }

    /// Create a store over an existing log handle.
    #[must_use]
    pub fn with_log(log: EntryLog) -> Self {
        Self {
            log,
            cache: None,
            graph: GraphIndex::new(),
        }
    }

    #[must_use]
    pub fn log(&self) -> &EntryLog {
        &self.log
    }

    /// True once the log has been replayed into memory.
    #[must_use]
    pub fn is_cache_loaded(&self) -> bool {
        self.cache.is_some()
    }

    #[must_use]
    pub fn graph_state(&self) -> GraphState {
        self.graph.state()
    }

    fn cache(&mut self) -> Result<&EntryCache, MemoryError> {
        let cache = match self.cache.take() {
            Some(cache) => cache,
            None => EntryCache::replay(&self.log)?,
        };
        Ok(self.cache.insert(cache))
    }

    /// Cache and graph together, building whichever is missing.
    fn indexed(&mut self) -> Result<(&GraphIndex, &EntryCache), MemoryError> {
        let cache = match self.cache.take() {
            Some(cache) => cache,
            None => EntryCache::replay(&self.log)?,
        };
        let cache = &*self.cache.insert(cache);
        if !self.graph.is_built() {
            self.graph.build(cache);
        }
        Ok((&self.graph, cache))
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Append an entry to the log and return the record as written.
    ///
    /// The cache, if loaded, picks the record up immediately. The graph
    /// does not.
    pub fn append(&mut self, entry: Entry) -> Result<Entry, MemoryError> {
        let written = self.log.append(entry)?;
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(written.clone());
        }
        Ok(written)
    }

    /// Deprecate an entry by appending a deprecated copy of its current
    /// record. History is never rewritten.
    pub fn deprecate(&mut self, id: &str, reason: Option<&str>) -> Result<Entry, MemoryError> {
        let mut record = self
            .cache()?
            .get(id)
            .cloned()
            .ok_or_else(|| MemoryError::NotFound(id.to_string()))?;

        record.deprecated = true;
        record.timestamp_deprecated = Some(Timestamp::now());
        if let Some(reason) = reason.filter(|r| !r.is_empty()) {
            record.deprecation_reason = Some(reason.to_string());
        }
        self.append(record)
    }

    /// Validate an import document and, unless `dry_run`, append every
    /// entry that passed.
    ///
    /// Rejected candidates are listed in the report and never written; they
    /// do not stop valid ones from being imported.
    pub fn import(
        &mut self,
        content: &str,
        format: ImportFormat,
        dry_run: bool,
    ) -> Result<ImportReport, MemoryError> {
        let mut report = validate_document(content, format);
        if dry_run {
            return Ok(report);
        }

        let mut written = Vec::with_capacity(report.entries.len());
        for entry in std::mem::take(&mut report.entries) {
            written.push(self.append(entry)?);
        }
        report.imported = written.len();
        report.entries = written;

        tracing::info!(
            imported = report.imported,
            rejected = report.issues.len(),
            "imported entries"
        );
        Ok(report)
    }

    // =========================================================================
    // CACHE READS
    // =========================================================================

    /// Current record for `id`, deprecated or not.
    pub fn get(&mut self, id: &str) -> Result<Option<&Entry>, MemoryError> {
        Ok(self.cache()?.get(id))
    }

    /// Entries passing `filter`, in id order.
    pub fn list(&mut self, filter: &EntryFilter) -> Result<Vec<&Entry>, MemoryError> {
        Ok(self.cache()?.list(filter))
    }

    /// Entries passing `filter`, rendered as JSON or Markdown.
    pub fn export(
        &mut self,
        filter: &EntryFilter,
        format: ExportFormat,
    ) -> Result<String, MemoryError> {
        let entries = self.list(filter)?;
        export::render(&entries, format)
    }

    /// Keyword/category/tag search over live entries.
    pub fn search(&mut self, query: &SearchQuery) -> Result<Vec<&Entry>, MemoryError> {
        Ok(self.cache()?.search(query))
    }

    /// Token-reduced projection of an entry. `NotFound` if absent.
    pub fn summary(&mut self, id: &str, max_words: usize) -> Result<EntrySummary, MemoryError> {
        self.cache()?.summary(id, max_words)
    }

    /// Live entries named directly in `id`'s links, read from the cache.
    ///
    /// Unlike [`MemoryStore::related`] this always reflects the current
    /// cache, not the last graph build.
    pub fn related_entries(&mut self, id: &str) -> Result<Vec<&Entry>, MemoryError> {
        let cache = self.cache()?;
        let Some(entry) = cache.get(id) else {
            return Ok(Vec::new());
        };
        Ok(materialize(cache, entry.links.iter().map(String::as_str)))
    }

    /// Number of entries in the materialized view.
    pub fn entry_count(&mut self, include_deprecated: bool) -> Result<usize, MemoryError> {
        Ok(self.cache()?.count(include_deprecated))
    }

    /// Forget the cache; the next read replays the log.
    ///
    /// The graph keeps its last build.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    // =========================================================================
    // STREAMING
    // =========================================================================

    /// Raw records in append order, straight from the file.
    ///
    /// Superseded and deprecated records are included; malformed lines are
    /// skipped.
    pub fn stream(&self) -> Result<EntryStream, MemoryError> {
        self.log.stream()
    }

    /// Raw records passing `filter`, straight from the file.
    pub fn stream_filtered(
        &self,
        filter: EntryFilter,
    ) -> Result<impl Iterator<Item = Result<Entry, MemoryError>> + use<>, MemoryError> {
        Ok(self.log.stream()?.matching(filter))
    }

    // =========================================================================
    // GRAPH
    // =========================================================================

    /// Rebuild the graph from the current cache contents.
    pub fn rebuild_graph(&mut self) -> Result<(), MemoryError> {
        self.graph.clear();
        self.indexed().map(|_| ())
    }

    /// Live entries within `depth` hops of `id` (start excluded).
    pub fn related(
        &mut self,
        id: &str,
        depth: usize,
        include_reverse: bool,
    ) -> Result<Vec<&Entry>, MemoryError> {
        let (graph, cache) = self.indexed()?;
        Ok(materialize(cache, graph.reachable(id, depth, include_reverse)))
    }

    /// Everything `id` depends on, directly or transitively.
    pub fn dependencies(&mut self, id: &str) -> Result<Vec<&Entry>, MemoryError> {
        self.related(id, UNBOUNDED_DEPTH, false)
    }

    /// Entries linking directly to `id`.
    ///
    /// One hop only, unlike the transitive [`MemoryStore::dependencies`].
    pub fn dependents(&mut self, id: &str) -> Result<Vec<&Entry>, MemoryError> {
        let (graph, cache) = self.indexed()?;
        Ok(materialize(cache, graph.linked_from(id)))
    }

    /// Live entries whose related concepts contain `concept`.
    pub fn find_by_concept(&mut self, concept: &str) -> Result<Vec<&Entry>, MemoryError> {
        Ok(self.cache()?.find_by_concept(concept))
    }

    /// Live entries carrying `tag`.
    pub fn find_by_tag(&mut self, tag: &str) -> Result<Vec<&Entry>, MemoryError> {
        self.list(&EntryFilter::new().tag(tag))
    }

    /// Subgraph around `id` for visualization.
    ///
    /// Nodes are the center (when live) plus everything within `max_depth`
    /// hops in either direction; edges are forward links between nodes.
    pub fn network(&mut self, id: &str, max_depth: usize) -> Result<EntryNetwork, MemoryError> {
        let (graph, cache) = self.indexed()?;

        let mut nodes: Vec<&Entry> = cache.get_live(id).into_iter().collect();
        nodes.extend(materialize(cache, graph.reachable(id, max_depth, true)));

        let members: BTreeSet<&str> = nodes.iter().map(|entry| entry.id.as_str()).collect();
        let edges = nodes
            .iter()
            .flat_map(|entry| {
                graph
                    .links_of(&entry.id)
                    .filter(|target| members.contains(target))
                    .map(move |target| NetworkEdge {
                        from: entry.id.clone(),
                        to: target.to_string(),
                    })
            })
            .collect();

        Ok(EntryNetwork {
            nodes: nodes.into_iter().cloned().collect(),
            edges,
        })
    }

    /// Node/edge counts and degree maxima of the graph.
    pub fn stats(&mut self) -> Result<GraphStats, MemoryError> {
        let (graph, _) = self.indexed()?;
        Ok(graph.stats())
    }
}

// =============================================================================
// TESTS
// =============================================================================

//! # Graph Index
//!
//! The knowledge graph derived from entry `links`.
//!
//! The index is an arena: every id seen at build time (live entries and the
//! ids they link to) gets a stable `NodeHandle`, and adjacency is stored as
//! sorted, de-duplicated handle lists in both directions. A single
//! `BTreeMap` translates string ids to handles. Nothing holds a pointer to
//! anything else.
//!
//! ## States
//!
//! `Stale` → `build()` → `Built`. The index is never invalidated
//! automatically: appends made after a build are invisible to traversal
//! until `build()` is called again.
//!
//! ## Dangling Links
//!
//! A link to an id that is missing or deprecated still becomes an edge and
//! is followed during traversal. Such nodes have no outgoing edges (only
//! live entries contribute links) and are dropped when results are
//! materialized against the cache.

use crate::cache::EntryCache;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// HANDLES & STATE
// =============================================================================

/// Opaque handle of a node in the index arena.
///
/// Handles are assigned in id order at build time and are only meaningful
/// for the build that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeHandle(u32);

impl NodeHandle {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Build state of a [`GraphIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GraphState {
    /// Never built, or explicitly cleared.
    #[default]
    Stale,
    /// Adjacency reflects the cache as of the last build.
    Built,
}

// =============================================================================
// RESULT SHAPES
// =============================================================================

/// Aggregate figures over the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Live entries in the index.
    pub total_nodes: usize,
    /// Sum of forward adjacency sizes.
    pub total_edges: usize,
    pub max_outgoing_links: usize,
    pub max_incoming_links: usize,
}

/// A directed edge in a network view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub from: String,
    pub to: String,
}

/// Visualization-ready subgraph around one entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryNetwork {
    pub nodes: Vec<crate::Entry>,
    pub edges: Vec<NetworkEdge>,
}

// =============================================================================
// GRAPH INDEX
// =============================================================================

/// Forward and reverse adjacency over entry ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphIndex {
    state: GraphState,
    /// Arena: handle -> id.
    ids: Vec<String>,
    /// id -> handle, built once per build.
    lookup: BTreeMap<String, NodeHandle>,
    /// handle -> is a live entry (has a forward slot of its own).
    live: Vec<bool>,
    forward: Vec<Vec<NodeHandle>>,
    reverse: Vec<Vec<NodeHandle>>,
}

impl GraphIndex {
    /// Create an unbuilt index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> GraphState {
        self.state
    }

    #[must_use]
    pub fn is_built(&self) -> bool {
        self.state == GraphState::Built
    }

    /// Drop all adjacency and return to `Stale`.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Rebuild both adjacency maps from the live entries of `cache`.
    ///
    /// Idempotent: the same cache contents always produce the same index.
    pub fn build(&mut self, cache: &EntryCache) {
        self.clear();

        let mut known: BTreeSet<&str> = BTreeSet::new();
        for entry in cache.live() {
            known.insert(entry.id.as_str());
            known.extend(entry.links.iter().map(String::as_str));
        }

        self.ids = known.into_iter().map(str::to_owned).collect();
        for (index, id) in self.ids.iter().enumerate() {
            self.lookup.insert(id.clone(), NodeHandle(index as u32));
        }

        let size = self.ids.len();
        self.live = vec![false; size];
        self.forward = vec![Vec::new(); size];
        self.reverse = vec![Vec::new(); size];

        for entry in cache.live() {
            let Some(&from) = self.lookup.get(entry.id.as_str()) else {
                continue;
            };
            self.live[from.index()] = true;
            for link in &entry.links {
                if let Some(&to) = self.lookup.get(link.as_str()) {
                    self.forward[from.index()].push(to);
                    self.reverse[to.index()].push(from);
                }
            }
        }

        for list in self.forward.iter_mut().chain(self.reverse.iter_mut()) {
            list.sort_unstable();
            list.dedup();
        }

        self.state = GraphState::Built;
        tracing::info!(
            nodes = self.live.iter().filter(|live| **live).count(),
            edges = self.edge_count(),
            "built knowledge graph index"
        );
    }

    /// Handle for `id`, if the id took part in the last build.
    #[must_use]
    pub fn handle(&self, id: &str) -> Option<NodeHandle> {
        self.lookup.get(id).copied()
    }

    /// Id behind a handle.
    #[must_use]
    pub fn id(&self, handle: NodeHandle) -> Option<&str> {
        self.ids.get(handle.index()).map(String::as_str)
    }

    /// Handle for `id` if it was a live entry at build time.
    fn source(&self, id: &str) -> Option<NodeHandle> {
        self.handle(id).filter(|h| self.live[h.index()])
    }

    fn id_at(&self, handle: NodeHandle) -> &str {
        self.ids[handle.index()].as_str()
    }

    /// Outgoing link targets of `id`, in id order.
    pub fn links_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        let handles = self
            .handle(id)
            .map(|h| self.forward[h.index()].as_slice())
            .unwrap_or_default();
        handles.iter().map(move |h| self.id_at(*h))
    }

    /// Ids linking directly to `id` (one hop), in id order.
    pub fn linked_from<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a str> + use<'a> {
        let handles = self
            .handle(id)
            .map(|h| self.reverse[h.index()].as_slice())
            .unwrap_or_default();
        handles.iter().map(move |h| self.id_at(*h))
    }

    /// Breadth-first traversal from `id`, up to `depth` levels.
    ///
    /// Forward edges are always followed; reverse edges only when
    /// `include_reverse` is set. Every node is visited at most once.
    /// Returns the visited ids in discovery order, start excluded.
    /// A start that was not a live entry at build time yields nothing.
    #[must_use]
    pub fn reachable(&self, id: &str, depth: usize, include_reverse: bool) -> Vec<&str> {
        let Some(start) = self.source(id) else {
            return Vec::new();
        };

        let mut visited = vec![false; self.ids.len()];
        visited[start.index()] = true;
        let mut frontier = vec![start];
        let mut discovered = Vec::new();

        for _ in 0..depth {
            let mut next = Vec::new();
            for &current in &frontier {
                let backward: &[NodeHandle] = if include_reverse {
                    &self.reverse[current.index()]
                } else {
                    &[]
                };
                for &neighbor in self.forward[current.index()].iter().chain(backward) {
                    if !visited[neighbor.index()] {
                        visited[neighbor.index()] = true;
                        next.push(neighbor);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            discovered.extend_from_slice(&next);
            frontier = next;
        }

        discovered.into_iter().map(|h| self.id_at(h)).collect()
    }

    /// Number of live entries in the index.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }

    /// Sum of forward adjacency sizes.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.forward.iter().map(Vec::len).sum()
    }

    /// Aggregate figures: nodes, edges, and the largest out/in degrees.
    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let max_outgoing_links = self
            .forward
            .iter()
            .zip(&self.live)
            .filter(|(_, live)| **live)
            .map(|(targets, _)| targets.len())
            .max()
            .unwrap_or(0);
        let max_incoming_links = self.reverse.iter().map(Vec::len).max().unwrap_or(0);

        GraphStats {
            total_nodes: self.node_count(),
            total_edges: self.edge_count(),
            max_outgoing_links,
            max_incoming_links,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entry;

    fn cache_of(entries: Vec<Entry>) -> EntryCache {
        let mut cache = EntryCache::new();
        for entry in entries {
            cache.insert(entry);
        }
        cache
    }

    fn built(entries: Vec<Entry>) -> GraphIndex {
        let mut graph = GraphIndex::new();
        graph.build(&cache_of(entries));
        graph
    }

    #[test]
    fn starts_stale() {
        let graph = GraphIndex::new();
        assert_eq!(graph.state(), GraphState::Stale);
        assert!(graph.reachable("a", 3, true).is_empty());
    }

    #[test]
    fn build_creates_forward_and_reverse_edges() {
        let graph = built(vec![
            Entry::new("a", "T", "t", "s").with_links(["b", "c"]),
            Entry::new("b", "T", "t", "s"),
            Entry::new("c", "T", "t", "s"),
        ]);

        assert!(graph.is_built());
        assert_eq!(graph.links_of("a").collect::<Vec<_>>(), vec!["b", "c"]);
        assert_eq!(graph.linked_from("b").collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn duplicate_links_collapse() {
        let graph = built(vec![
            Entry::new("a", "T", "t", "s").with_links(["b", "b", "b"]),
            Entry::new("b", "T", "t", "s"),
        ]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.stats().max_incoming_links, 1);
    }

    #[test]
    fn deprecated_entries_contribute_no_edges() {
        let graph = built(vec![
            Entry::new("a", "T", "t", "s").with_links(["b"]).deprecated(),
            Entry::new("b", "T", "t", "s"),
        ]);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 1);
        assert!(graph.handle("a").is_none());
    }

    #[test]
    fn dangling_target_gets_handle_but_no_node() {
        let graph = built(vec![Entry::new("a", "T", "t", "s").with_links(["ghost"])]);

        let ghost = graph.handle("ghost").expect("handle");
        assert_eq!(graph.id(ghost), Some("ghost"));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.reachable("a", 1, false), vec!["ghost"]);
        assert!(graph.reachable("ghost", 1, true).is_empty());
    }

    #[test]
    fn bfs_respects_depth_and_visits_once() {
        // a -> b -> c -> a (cycle), a -> c
        let graph = built(vec![
            Entry::new("a", "T", "t", "s").with_links(["b", "c"]),
            Entry::new("b", "T", "t", "s").with_links(["c"]),
            Entry::new("c", "T", "t", "s").with_links(["a"]),
        ]);

        assert_eq!(graph.reachable("a", 1, false), vec!["b", "c"]);
        assert_eq!(graph.reachable("b", 1, false), vec!["c"]);
        assert_eq!(graph.reachable("b", 2, false), vec!["c", "a"]);
        assert!(graph.reachable("a", 0, false).is_empty());
    }

    #[test]
    fn reverse_edges_only_when_requested() {
        let graph = built(vec![
            Entry::new("m", "T", "t", "s").with_links(["n"]),
            Entry::new("n", "T", "t", "s"),
        ]);
        assert!(graph.reachable("n", 1, false).is_empty());
        assert_eq!(graph.reachable("n", 1, true), vec!["m"]);
    }

    #[test]
    fn self_loop_does_not_return_start() {
        let graph = built(vec![Entry::new("a", "T", "t", "s").with_links(["a"])]);
        assert!(graph.reachable("a", 5, true).is_empty());
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let cache = cache_of(vec![
            Entry::new("a", "T", "t", "s").with_links(["b", "z"]),
            Entry::new("b", "T", "t", "s").with_links(["a"]),
        ]);
        let mut first = GraphIndex::new();
        first.build(&cache);
        let snapshot = first.clone();
        first.build(&cache);
        assert_eq!(first, snapshot);
    }

    #[test]
    fn stats_report_degrees() {
        let graph = built(vec![
            Entry::new("hub", "T", "t", "s").with_links(["a", "b", "c"]),
            Entry::new("a", "T", "t", "s").with_links(["c"]),
            Entry::new("b", "T", "t", "s").with_links(["c"]),
            Entry::new("c", "T", "t", "s"),
        ]);
        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 5);
        assert_eq!(stats.max_outgoing_links, 3);
        assert_eq!(stats.max_incoming_links, 3);
    }

    #[test]
    fn empty_graph_stats_are_zero() {
        let graph = built(Vec::new());
        assert_eq!(graph.stats(), GraphStats::default());
    }
}

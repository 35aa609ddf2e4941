//! # Validation Tier Tests (T0-T4)
//!
//! If ANY tier fails, the store is INVALID.
//!
//! ## Tiers
//! - T0: Log Integrity
//! - T1: Materialization (last write wins)
//! - T2: Filtering & Search
//! - T3: Graph Traversal
//! - T4: End-to-end Scenarios

use lorekeep_core::{
    Entry, EntryFilter, EntryLog, GraphState, MemoryError, MemoryStore, SearchQuery,
};
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::TempDir;

fn temp_store() -> (TempDir, MemoryStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = MemoryStore::new(dir.path().join("process_memory.jsonl"));
    (dir, store)
}

fn entry(id: &str) -> Entry {
    Entry::new(id, "Decision", format!("title {id}"), format!("summary {id}"))
}

fn ids(entries: &[&Entry]) -> Vec<String> {
    entries.iter().map(|e| e.id.clone()).collect()
}

// =============================================================================
// TIER T0: LOG INTEGRITY
// =============================================================================

mod t0_log_integrity {
    use super::*;

    /// T0.1: Append without an id is rejected and writes nothing.
    #[test]
    fn missing_identifier_rejected() {
        let (_dir, mut store) = temp_store();
        let result = store.append(Entry::new("   ", "Lesson", "t", "s"));

        assert!(matches!(result, Err(MemoryError::MissingIdentifier)));
        assert!(!store.log().exists());
    }

    /// T0.2: Records stream back in append order, duplicates included.
    #[test]
    fn stream_preserves_append_order() {
        let (_dir, mut store) = temp_store();
        for id in ["b", "a", "b", "c"] {
            store.append(entry(id)).expect("append");
        }

        let streamed: Vec<String> = store
            .stream()
            .expect("stream")
            .map(|r| r.expect("record").id)
            .collect();
        assert_eq!(streamed, vec!["b", "a", "b", "c"]);
    }

    /// T0.3: A corrupt line in the middle does not hide later records.
    #[test]
    fn corrupt_line_is_skipped() {
        let (_dir, mut store) = temp_store();
        store.append(entry("a")).expect("append");

        let mut file = OpenOptions::new()
            .append(true)
            .open(store.log().path())
            .expect("open");
        file.write_all(b"{\"id\": \"half\", \"title\"\n").expect("write");
        drop(file);

        store.append(entry("b")).expect("append");

        assert_eq!(store.entry_count(true).expect("count"), 2);
        assert!(store.get("half").expect("get").is_none());
    }

    /// T0.4: Unknown keys survive a round trip through the store.
    #[test]
    fn unknown_keys_preserved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("process_memory.jsonl");
        std::fs::write(
            &path,
            "{\"id\":\"a\",\"type\":\"Lesson\",\"title\":\"t\",\"summary\":\"s\",\"owner\":\"ops\"}\n",
        )
        .expect("write");

        let mut store = MemoryStore::new(&path);
        let record = store.deprecate("a", None).expect("deprecate");
        assert_eq!(
            record.extra.get("owner").and_then(|v| v.as_str()),
            Some("ops")
        );

        let content = std::fs::read_to_string(&path).expect("read");
        let last = content.lines().last().expect("line");
        assert!(last.contains("\"owner\":\"ops\""));
    }

    /// T0.5: Two store handles over one file see each other's appends
    /// after a replay.
    #[test]
    fn log_is_the_source_of_truth() {
        let (dir, mut writer) = temp_store();
        writer.append(entry("a")).expect("append");

        let mut reader = MemoryStore::with_log(EntryLog::new(
            dir.path().join("process_memory.jsonl"),
        ));
        assert!(reader.get("a").expect("get").is_some());

        writer.append(entry("b")).expect("append");
        assert!(reader.get("b").expect("get").is_none());

        reader.clear_cache();
        assert!(reader.get("b").expect("get").is_some());
    }
}

// =============================================================================
// TIER T1: MATERIALIZATION
// =============================================================================

mod t1_materialization {
    use super::*;

    /// T1.1: The last record for an id replaces the whole entry.
    #[test]
    fn last_write_wins() {
        let (_dir, mut store) = temp_store();
        store
            .append(entry("x").with_tags(["old"]).with_links(["y"]))
            .expect("append");
        store
            .append(Entry::new("x", "Lesson", "second", "s"))
            .expect("append");

        let current = store.get("x").expect("get").expect("present");
        assert_eq!(current.title, "second");
        assert_eq!(current.entry_type, "Lesson");
        assert!(current.tags.is_empty());
        assert!(current.links.is_empty());
    }

    /// T1.2: Replay after the fact gives the same view as incremental updates.
    #[test]
    fn replay_matches_incremental() {
        let (_dir, mut store) = temp_store();
        store.get("warm").expect("warm cache");
        for id in ["a", "b", "a", "c"] {
            store.append(entry(id)).expect("append");
        }
        store.deprecate("b", Some("obsolete")).expect("deprecate");

        let incremental: Vec<Entry> = store
            .list(&EntryFilter::new().include_deprecated(true))
            .expect("list")
            .into_iter()
            .cloned()
            .collect();

        store.clear_cache();
        let replayed: Vec<Entry> = store
            .list(&EntryFilter::new().include_deprecated(true))
            .expect("list")
            .into_iter()
            .cloned()
            .collect();

        assert_eq!(incremental, replayed);
    }

    /// T1.3: Counts track deprecation.
    #[test]
    fn counts_track_deprecation() {
        let (_dir, mut store) = temp_store();
        store.append(entry("a")).expect("append");
        store.append(entry("b")).expect("append");
        store.deprecate("a", None).expect("deprecate");

        assert_eq!(store.entry_count(true).expect("count"), 2);
        assert_eq!(store.entry_count(false).expect("count"), 1);
    }

    /// T1.4: Deprecating an unknown id fails.
    #[test]
    fn deprecate_unknown_fails() {
        let (_dir, mut store) = temp_store();
        assert!(matches!(
            store.deprecate("ghost", Some("why")),
            Err(MemoryError::NotFound(id)) if id == "ghost"
        ));
    }

    /// T1.5: Any ISO-8601 timestamp form keeps its record in the view, and a
    /// deprecation stamped with a bare date still supersedes the live record.
    #[test]
    fn timestamp_forms_never_drop_records() {
        let (_dir, mut store) = temp_store();
        let lines = [
            r#"{"id":"a","type":"T","title":"a","summary":"s","timestamp_created":"2025-01-15"}"#,
            r#"{"id":"b","type":"T","title":"b","summary":"s","timestamp_created":"2025-01-15T10:00Z"}"#,
            r#"{"id":"c","type":"T","title":"c","summary":"s","timestamp_created":"2025-01-15T10:00:00+0000"}"#,
            r#"{"id":"d","type":"T","title":"d","summary":"s","timestamp_created":"2025-01-15T10:00:00Z"}"#,
            r#"{"id":"d","type":"T","title":"d","summary":"s","deprecated":true,"timestamp_deprecated":"2025-01-16"}"#,
            r#"{"id":"e","type":"T","title":"e","summary":"s","timestamp_created":"last tuesday"}"#,
        ];
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(store.log().path())
            .expect("open");
        for line in lines {
            writeln!(file, "{line}").expect("write");
        }
        drop(file);

        let all = store
            .list(&EntryFilter::new().include_deprecated(true))
            .expect("list");
        assert_eq!(ids(&all), vec!["a", "b", "c", "d", "e"]);

        let d = store.get("d").expect("get").expect("present");
        assert!(d.deprecated);
        assert_eq!(store.entry_count(false).expect("count"), 4);

        let mut stream = store.log().stream().expect("stream");
        assert_eq!(stream.by_ref().count(), 6);
        assert_eq!(stream.skipped(), 0);
    }
}

// =============================================================================
// TIER T2: FILTERING & SEARCH
// =============================================================================

mod t2_filtering {
    use super::*;

    fn seeded() -> (TempDir, MemoryStore) {
        let (dir, mut store) = temp_store();
        store
            .append(
                Entry::new("p", "Pattern", "Idempotent writes", "Retries are safe")
                    .with_tags(["storage", "reliability"]),
            )
            .expect("append");
        store
            .append(
                Entry::new("q", "Lesson", "Backoff", "Cap retry latency")
                    .with_tags(["network", "reliability"]),
            )
            .expect("append");
        store
            .append(
                Entry::new("r", "Lesson", "Old idea", "Retry forever")
                    .with_tags(["network"])
                    .deprecated(),
            )
            .expect("append");
        (dir, store)
    }

    /// T2.1: Category is an exact match.
    #[test]
    fn list_by_category() {
        let (_dir, mut store) = seeded();
        let lessons = store
            .list(&EntryFilter::new().category("Lesson"))
            .expect("list");
        assert_eq!(ids(&lessons), vec!["q"]);

        let with_dead = store
            .list(&EntryFilter::new().category("Lesson").include_deprecated(true))
            .expect("list");
        assert_eq!(ids(&with_dead), vec!["q", "r"]);
    }

    /// T2.2: Keyword search checks title, summary and tags, live only.
    #[test]
    fn keyword_search() {
        let (_dir, mut store) = seeded();
        let hits = store.search(&SearchQuery::keyword("RETR")).expect("search");
        assert_eq!(ids(&hits), vec!["p", "q"]);

        let by_tag = store.search(&SearchQuery::keyword("stor")).expect("search");
        assert_eq!(ids(&by_tag), vec!["p"]);
    }

    /// T2.3: Search filters combine with the keyword.
    #[test]
    fn search_with_filters() {
        let (_dir, mut store) = seeded();
        let hits = store
            .search(&SearchQuery::keyword("retry").category("Lesson"))
            .expect("search");
        assert_eq!(ids(&hits), vec!["q"]);

        let none = store
            .search(&SearchQuery::keyword("retry").tag("missing"))
            .expect("search");
        assert!(none.is_empty());
    }

    /// T2.4: Filtered streaming agrees with the cache on a log without
    /// superseded records.
    #[test]
    fn stream_filtered_agrees_with_list() {
        let (_dir, mut store) = seeded();
        let filter = EntryFilter::new().tag("network").include_deprecated(true);

        let streamed: Vec<String> = store
            .stream_filtered(filter.clone())
            .expect("stream")
            .map(|r| r.expect("record").id)
            .collect();
        let listed = ids(&store.list(&filter).expect("list"));
        assert_eq!(streamed, listed);
    }

    /// T2.5: Tag lookup goes through the same AND filter.
    #[test]
    fn find_by_tag() {
        let (_dir, mut store) = seeded();
        let tagged = store.find_by_tag("reliability").expect("tag");
        assert_eq!(ids(&tagged), vec!["p", "q"]);
        assert!(store.find_by_tag("nothing").expect("tag").is_empty());
    }
}

// =============================================================================
// TIER T3: GRAPH TRAVERSAL
// =============================================================================

mod t3_traversal {
    use super::*;

    /// T3.1: Traversal depth is monotonic.
    #[test]
    fn depth_is_monotonic() {
        let (_dir, mut store) = temp_store();
        store.append(entry("a").with_links(["b"])).expect("append");
        store.append(entry("b").with_links(["c"])).expect("append");
        store.append(entry("c").with_links(["d"])).expect("append");
        store.append(entry("d")).expect("append");

        let mut previous: Vec<String> = Vec::new();
        for depth in 0..5 {
            let current = ids(&store.related("a", depth, false).expect("related"));
            assert!(previous.iter().all(|id| current.contains(id)));
            previous = current;
        }
        assert_eq!(previous, vec!["b", "c", "d"]);
    }

    /// T3.2: Cycles terminate and never revisit the start.
    #[test]
    fn cycles_terminate() {
        let (_dir, mut store) = temp_store();
        store.append(entry("a").with_links(["b"])).expect("append");
        store.append(entry("b").with_links(["a", "b"])).expect("append");

        assert_eq!(ids(&store.dependencies("a").expect("deps")), vec!["b"]);
    }

    /// T3.3: Deprecated entries contribute no edges and are never returned.
    #[test]
    fn deprecated_entries_are_not_traversed() {
        let (_dir, mut store) = temp_store();
        store.append(entry("a").with_links(["b"])).expect("append");
        store
            .append(entry("b").with_links(["c"]).deprecated())
            .expect("append");
        store.append(entry("c")).expect("append");

        assert!(store.dependencies("a").expect("deps").is_empty());
        assert!(store.related("b", 3, true).expect("related").is_empty());
    }

    /// T3.4: Dangling links are tolerated and filtered at materialization.
    #[test]
    fn dangling_links_tolerated() {
        let (_dir, mut store) = temp_store();
        store
            .append(entry("a").with_links(["ghost", "b"]))
            .expect("append");
        store.append(entry("b")).expect("append");

        assert_eq!(ids(&store.related("a", 1, false).expect("related")), vec!["b"]);
        assert_eq!(ids(&store.dependents("ghost").expect("dependents")), vec!["a"]);
    }

    /// T3.5: The graph does not see appends until it is rebuilt.
    #[test]
    fn graph_needs_explicit_rebuild() {
        let (_dir, mut store) = temp_store();
        store.append(entry("a")).expect("append");
        assert!(store.related("a", 1, false).expect("related").is_empty());
        assert_eq!(store.graph_state(), GraphState::Built);

        store.append(entry("a").with_links(["b"])).expect("append");
        store.append(entry("b")).expect("append");
        assert!(store.related("a", 1, false).expect("related").is_empty());

        store.rebuild_graph().expect("rebuild");
        assert_eq!(ids(&store.related("a", 1, false).expect("related")), vec!["b"]);
    }

    /// T3.6: Stats count live nodes and forward edges.
    #[test]
    fn stats_reflect_structure() {
        let (_dir, mut store) = temp_store();
        store.append(entry("hub").with_links(["a", "b", "c"])).expect("append");
        store.append(entry("a").with_links(["c"])).expect("append");
        store.append(entry("b")).expect("append");
        store.append(entry("c")).expect("append");
        store.append(entry("old").with_links(["c"]).deprecated()).expect("append");

        let stats = store.stats().expect("stats");
        assert_eq!(stats.total_nodes, 4);
        assert_eq!(stats.total_edges, 4);
        assert_eq!(stats.max_outgoing_links, 3);
        assert_eq!(stats.max_incoming_links, 2);
    }

    /// T3.7: Concept lookup is a case-insensitive substring match.
    #[test]
    fn find_by_concept() {
        let (_dir, mut store) = temp_store();
        store
            .append(entry("a").with_concepts(["Write-Ahead Logging"]))
            .expect("append");
        store
            .append(entry("b").with_concepts(["logging"]).deprecated())
            .expect("append");

        let found = store.find_by_concept("ahead log").expect("concept");
        assert_eq!(ids(&found), vec!["a"]);
        assert_eq!(store.find_by_concept("LOGGING").expect("concept").len(), 1);
    }
}

// =============================================================================
// TIER T4: SCENARIOS
// =============================================================================

mod t4_scenarios {
    use super::*;

    /// Scenario A: chained links, depth-bounded and transitive traversal.
    #[test]
    fn scenario_a_chain() {
        let (_dir, mut store) = temp_store();
        store.append(entry("A")).expect("append");
        store.append(entry("B").with_links(["A"])).expect("append");
        store.append(entry("C").with_links(["B"])).expect("append");

        assert_eq!(ids(&store.related("C", 1, false).expect("related")), vec!["B"]);
        assert_eq!(
            ids(&store.related("C", 2, false).expect("related")),
            vec!["B", "A"]
        );
        assert_eq!(ids(&store.dependencies("C").expect("deps")), vec!["B", "A"]);
    }

    /// Scenario B: a deprecation record supersedes the original.
    #[test]
    fn scenario_b_deprecation() {
        let (_dir, mut store) = temp_store();
        store.append(entry("X")).expect("append");
        store.append(entry("X").deprecated()).expect("append");

        let current = store.get("X").expect("get").expect("present");
        assert!(current.deprecated);
        assert!(store.list(&EntryFilter::new()).expect("list").is_empty());
        assert_eq!(
            ids(&store
                .list(&EntryFilter::new().include_deprecated(true))
                .expect("list")),
            vec!["X"]
        );
    }

    /// Scenario C: tag filters use AND semantics.
    #[test]
    fn scenario_c_tags_and() {
        let (_dir, mut store) = temp_store();
        store
            .append(entry("P").with_tags(["foundation", "p1"]))
            .expect("append");
        store
            .append(entry("Q").with_tags(["foundation", "p2"]))
            .expect("append");

        let both = store
            .list(&EntryFilter::new().tag("foundation"))
            .expect("list");
        assert_eq!(ids(&both), vec!["P", "Q"]);

        let only_p = store
            .list(&EntryFilter::new().tags(["foundation", "p1"]))
            .expect("list");
        assert_eq!(ids(&only_p), vec!["P"]);
    }

    /// Scenario D: dependents are one hop along reverse edges.
    #[test]
    fn scenario_d_dependents() {
        let (_dir, mut store) = temp_store();
        store.append(entry("M").with_links(["N"])).expect("append");
        store.append(entry("N")).expect("append");

        assert_eq!(ids(&store.dependents("N").expect("dependents")), vec!["M"]);
        assert!(store.dependents("M").expect("dependents").is_empty());
    }

    /// Dependents stay one hop even where dependencies are transitive.
    #[test]
    fn scenario_d_dependents_are_not_transitive() {
        let (_dir, mut store) = temp_store();
        store.append(entry("L").with_links(["M"])).expect("append");
        store.append(entry("M").with_links(["N"])).expect("append");
        store.append(entry("N")).expect("append");

        assert_eq!(ids(&store.dependents("N").expect("dependents")), vec!["M"]);
        assert_eq!(ids(&store.dependencies("L").expect("deps")), vec!["M", "N"]);
    }

    /// Scenario E: summaries are materially smaller and omit rationale.
    #[test]
    fn scenario_e_summary() {
        let (_dir, mut store) = temp_store();
        let raw = entry("S")
            .with_rationale("because ".repeat(40))
            .with_links(["A"]);
        let raw = Entry {
            summary: "z".repeat(500),
            ..raw
        };
        let written = store.append(raw).expect("append");

        let summary = store.summary("S", 10).expect("summary");
        let raw_size = serde_json::to_string(&written).expect("serialize").len();
        let summary_json = serde_json::to_string(&summary).expect("serialize");

        assert!(summary_json.len() < raw_size / 2);
        assert!(!summary_json.contains("rationale"));
        assert!(summary.summary.len() < 500);
    }
}

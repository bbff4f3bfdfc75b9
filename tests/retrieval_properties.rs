//! Retrieval behavior over the in-memory graph store.
//!
//! Covers the observable contract of `retrieve` and `handle_message`:
//! - Empty results for unmatched queries
//! - Seed-then-neighbor ordering
//! - Case-insensitive matching
//! - Text-less nodes never surface
//! - Monotonic expansion as `hop` grows
//! - Separator joining

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used)]

use graph_retriever::models::{DocumentRecord, Node};
use graph_retriever::storage::graph::InMemoryGraphStore;
use graph_retriever::{ExpandingRetriever, Pipeline, RetrievalConfig, Retriever, RetrieverConfig};
use proptest::prelude::*;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use test_case::test_case;

const NODES: &str = "GraphNodes";
const EDGES: &str = "GraphEdges";

fn handle(key: &str) -> String {
    format!("{NODES}/{key}")
}

fn retrieve(store: &InMemoryGraphStore, query: &str, hop: u32) -> Vec<DocumentRecord> {
    let config = RetrievalConfig::new("policies_graph").with_hop(hop);
    ExpandingRetriever::new(store, config).retrieve(query).unwrap()
}

fn started_pipeline(store: InMemoryGraphStore) -> Pipeline {
    let mut pipeline = Pipeline::with_store(RetrieverConfig::default(), Arc::new(store));
    pipeline.on_startup().unwrap();
    pipeline
}

// ============================================================================
// Fixed scenarios
// ============================================================================

#[test]
fn test_no_seed_gives_empty_results() {
    let store = InMemoryGraphStore::new();
    store.add_node(NODES, Node::new("1").with_text("alpha policy")).unwrap();

    assert!(retrieve(&store, "omega", 100).is_empty());

    let pipeline = started_pipeline(store);
    assert_eq!(
        pipeline.handle_message("omega", "m", &[], &Value::Null).unwrap(),
        ""
    );
}

#[test]
fn test_single_seed_without_edges() {
    let store = InMemoryGraphStore::new();
    store.add_node(NODES, Node::new("n1").with_text("alpha policy")).unwrap();
    store.create_edge_collection(EDGES).unwrap();

    assert_eq!(
        retrieve(&store, "alpha", 1),
        vec![DocumentRecord::new("alpha policy", "n1")]
    );
}

#[test_case(true ; "outbound edge")]
#[test_case(false ; "inbound edge")]
fn test_neighbor_follows_seed(outbound: bool) {
    let store = InMemoryGraphStore::new();
    store.add_node(NODES, Node::new("a").with_text("alpha policy")).unwrap();
    store.add_node(NODES, Node::new("b").with_text("beta rule")).unwrap();
    if outbound {
        store.add_edge(EDGES, handle("a"), handle("b")).unwrap();
    } else {
        store.add_edge(EDGES, handle("b"), handle("a")).unwrap();
    }

    assert_eq!(
        retrieve(&store, "alpha", 1),
        vec![
            DocumentRecord::new("alpha policy", "a"),
            DocumentRecord::new("beta rule", "b"),
        ]
    );
}

#[test]
fn test_textless_nodes_never_returned() {
    let store = InMemoryGraphStore::new();
    store.add_node(NODES, Node::new("a").with_text("alpha policy")).unwrap();
    store
        .add_node(NODES, Node::new("meta").with_attribute("kind", "alpha header"))
        .unwrap();
    store
        .add_node(NODES, Node::new("num").with_attribute("text", 42))
        .unwrap();
    store.add_node(NODES, Node::new("c").with_text("gamma clause")).unwrap();
    store.add_edge(EDGES, handle("a"), handle("meta")).unwrap();
    store.add_edge(EDGES, handle("meta"), handle("num")).unwrap();
    store.add_edge(EDGES, handle("num"), handle("c")).unwrap();

    let records = retrieve(&store, "", 5);
    assert!(records.iter().all(|r| r.id != "meta" && r.id != "num"));
    assert!(records.contains(&DocumentRecord::new("gamma clause", "c")));
}

#[test]
fn test_hop_bound_is_literal() {
    let store = InMemoryGraphStore::new();
    for (key, text) in [("1", "alpha"), ("2", "two"), ("3", "three"), ("4", "four")] {
        store.add_node(NODES, Node::new(key).with_text(text)).unwrap();
    }
    store.add_edge(EDGES, handle("1"), handle("2")).unwrap();
    store.add_edge(EDGES, handle("2"), handle("3")).unwrap();
    store.add_edge(EDGES, handle("3"), handle("4")).unwrap();

    let ids = |hop| {
        retrieve(&store, "alpha", hop)
            .into_iter()
            .map(|r| r.id)
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(0), vec!["1"]);
    assert_eq!(ids(2), vec!["1", "2", "3"]);
    assert_eq!(ids(100), vec!["1", "2", "3", "4"]);
}

#[test]
fn test_repeated_visits_are_kept() {
    // Two seeds on one edge: each expands into the other.
    let store = InMemoryGraphStore::new();
    store.add_node(NODES, Node::new("a").with_text("alpha one")).unwrap();
    store.add_node(NODES, Node::new("b").with_text("alpha two")).unwrap();
    store.add_edge(EDGES, handle("a"), handle("b")).unwrap();

    let ids: Vec<_> = retrieve(&store, "alpha", 1).into_iter().map(|r| r.id).collect();
    assert_eq!(ids, vec!["a", "b", "b", "a"]);
}

#[test]
fn test_handle_message_joins_without_trailing_separator() {
    let store = InMemoryGraphStore::new();
    store.add_node(NODES, Node::new("a").with_text("alpha policy")).unwrap();
    store.add_node(NODES, Node::new("b").with_text("beta rule")).unwrap();
    store.add_node(NODES, Node::new("c").with_text("gamma clause")).unwrap();
    store.add_edge(EDGES, handle("a"), handle("b")).unwrap();
    store.add_edge(EDGES, handle("b"), handle("c")).unwrap();

    let pipeline = started_pipeline(store);
    let output = pipeline.handle_message("alpha", "m", &[], &Value::Null).unwrap();
    assert_eq!(output, "alpha policy\n---\nbeta rule\n---\ngamma clause");
    assert!(!output.ends_with("\n---\n"));
}

// ============================================================================
// Properties over random graphs
// ============================================================================

const VOCAB: [&str; 5] = ["alpha", "beta", "gamma", "delta", "policy"];

/// A random graph: per-node optional text, plus edges between node indices.
fn arb_graph() -> impl Strategy<Value = (Vec<Option<String>>, Vec<(usize, usize)>)> {
    (2_usize..8).prop_flat_map(|n| {
        let texts = prop::collection::vec(
            prop::option::weighted(
                0.8,
                (prop::sample::select(VOCAB.to_vec()), prop::sample::select(VOCAB.to_vec()))
                    .prop_map(|(a, b)| format!("{a} {b}")),
            ),
            n,
        );
        let edges = prop::collection::vec((0..n, 0..n), 0..(n * 2));
        (texts, edges)
    })
}

fn build(texts: &[Option<String>], edges: &[(usize, usize)]) -> InMemoryGraphStore {
    let store = InMemoryGraphStore::new();
    store.create_edge_collection(EDGES).unwrap();
    for (i, text) in texts.iter().enumerate() {
        let mut node = Node::new(i.to_string());
        if let Some(text) = text {
            node = node.with_text(text.clone());
        }
        store.add_node(NODES, node).unwrap();
    }
    for (from, to) in edges {
        store
            .add_edge(EDGES, handle(&from.to_string()), handle(&to.to_string()))
            .unwrap();
    }
    store
}

fn flip_case(s: &str, mask: &[bool]) -> String {
    s.chars()
        .zip(mask.iter().cycle())
        .map(|(c, upper)| if *upper { c.to_ascii_uppercase() } else { c })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: raising `hop` never drops a previously returned node.
    #[test]
    fn prop_expansion_is_monotonic(
        (texts, edges) in arb_graph(),
        query in prop::sample::select(VOCAB.to_vec()),
        hop in 0_u32..4,
    ) {
        let store = build(&texts, &edges);
        let shallow: HashSet<_> = retrieve(&store, query, hop).into_iter().map(|r| r.id).collect();
        let deep: HashSet<_> = retrieve(&store, query, hop + 1).into_iter().map(|r| r.id).collect();
        prop_assert!(shallow.is_subset(&deep));
    }

    /// Property: matching ignores the case of the query.
    #[test]
    fn prop_matching_is_case_insensitive(
        (texts, edges) in arb_graph(),
        query in prop::sample::select(VOCAB.to_vec()),
        mask in prop::collection::vec(any::<bool>(), 1..8),
        hop in 0_u32..3,
    ) {
        let store = build(&texts, &edges);
        let mixed = flip_case(query, &mask);
        prop_assert_eq!(retrieve(&store, query, hop), retrieve(&store, &mixed, hop));
    }

    /// Property: every record carries text and comes from a text node.
    #[test]
    fn prop_only_text_nodes_returned(
        (texts, edges) in arb_graph(),
        query in prop::sample::select(VOCAB.to_vec()),
    ) {
        let store = build(&texts, &edges);
        for record in retrieve(&store, query, 3) {
            let index: usize = record.id.parse().unwrap();
            prop_assert_eq!(texts[index].as_deref(), Some(record.text.as_str()));
        }
    }

    /// Property: the first record is always a seed containing the query.
    #[test]
    fn prop_first_record_is_seed(
        (texts, edges) in arb_graph(),
        query in prop::sample::select(VOCAB.to_vec()),
    ) {
        let store = build(&texts, &edges);
        let records = retrieve(&store, query, 2);
        if let Some(first) = records.first() {
            prop_assert!(first.text.contains(query));
        } else {
            prop_assert!(texts.iter().flatten().all(|t| !t.contains(query)));
        }
    }
}

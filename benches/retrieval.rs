//! Benchmarks for retrieval over the in-memory graph store.
//!
//! These measure the retriever and traversal overhead on synthetic graphs,
//! not network or database latency.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use graph_retriever::models::{DocumentRecord, Node};
use graph_retriever::storage::graph::InMemoryGraphStore;
use graph_retriever::{ExpandingRetriever, RetrievalConfig, Retriever, join_texts};

const NODES: &str = "GraphNodes";
const EDGES: &str = "GraphEdges";

/// Builds a ring of `size` nodes with a chord every tenth node.
///
/// Every 25th node mentions "refund" so a query seeds several traversals.
fn ring(size: usize) -> InMemoryGraphStore {
    let store = InMemoryGraphStore::new();
    for i in 0..size {
        let text = if i % 25 == 0 {
            format!("refund policy section {i}")
        } else {
            format!("clause {i}")
        };
        store.add_node(NODES, Node::new(i.to_string()).with_text(text)).unwrap();
    }
    for i in 0..size {
        let next = (i + 1) % size;
        store
            .add_edge(EDGES, format!("{NODES}/{i}"), format!("{NODES}/{next}"))
            .unwrap();
        if i % 10 == 0 {
            let chord = (i + size / 2) % size;
            store
                .add_edge(EDGES, format!("{NODES}/{i}"), format!("{NODES}/{chord}"))
                .unwrap();
        }
    }
    store
}

fn bench_retrieve_by_hop(c: &mut Criterion) {
    let store = ring(200);
    let mut group = c.benchmark_group("retrieve_by_hop");

    for hop in [0_u32, 1, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(hop), &hop, |b, &hop| {
            let config = RetrievalConfig::new("bench").with_hop(hop);
            let retriever = ExpandingRetriever::new(&store, config);
            b.iter(|| retriever.retrieve(black_box("REFUND")).unwrap());
        });
    }

    group.finish();
}

fn bench_seed_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("seed_scan");

    for size in [100_usize, 1_000, 5_000] {
        let store = ring(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &store, |b, store| {
            let config = RetrievalConfig::new("bench").with_hop(0);
            let retriever = ExpandingRetriever::new(store, config);
            b.iter(|| retriever.retrieve(black_box("policy")).unwrap());
        });
    }

    group.finish();
}

fn bench_join(c: &mut Criterion) {
    let records: Vec<_> = (0..500)
        .map(|i| DocumentRecord::new(format!("record text number {i}"), i.to_string()))
        .collect();

    c.bench_function("join_500_records", |b| {
        b.iter(|| join_texts(black_box(&records)));
    });
}

criterion_group!(benches, bench_retrieve_by_hop, bench_seed_scan, bench_join);
criterion_main!(benches);

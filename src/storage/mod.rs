//! Storage layer abstraction.
//!
//! A single layer: read-only access to a graph store holding text-bearing
//! nodes and the edges between them.
//! - **Traits**: the [`GraphStore`] seam the retriever depends on
//! - **Graph**: backends (`ArangoDB` over HTTP, in-memory) and query templates

// Allow significant_drop_tightening - lock guards are held for one short scan.
#![allow(clippy::significant_drop_tightening)]

pub mod graph;
pub mod traits;

pub use graph::{ArangoConnection, Cursor, InMemoryGraphStore};
pub use traits::{GraphStore, NodeStream};

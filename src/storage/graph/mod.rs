//! Graph store backends and query templates.
//!
//! This module provides implementations of the [`GraphStore`] trait for
//! reading text-bearing nodes and walking the edges between them.
//!
//! # Available Backends
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | [`ArangoConnection`] | Default; remote | AQL cursor API, basic auth |
//! | [`InMemoryGraphStore`] | Testing, dry runs | Snapshot files, no I/O |
//!
//! # Example
//!
//! ```rust,ignore
//! use graph_retriever::storage::graph::{ArangoConnection, GraphQuery};
//! use graph_retriever::storage::traits::GraphStore;
//!
//! let connection = ArangoConnection::connect(&settings)?;
//! for node in connection.execute(&GraphQuery::contains_text("GraphNodes", "refund"))? {
//!     println!("{}", node?.key);
//! }
//! ```

mod arango;
mod memory;
mod query;

pub use arango::{ArangoConnection, Cursor};
pub use memory::{Edge, GraphSnapshot, InMemoryGraphStore};
pub use query::{AqlQuery, GraphQuery, validate_name};

// Re-export trait for convenience
pub use crate::storage::traits::graph::{GraphStore, NodeStream};

//! Graph store trait for read-only node retrieval.
//!
//! A graph store executes the typed queries in
//! [`crate::storage::graph::GraphQuery`] and yields node records lazily.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Features |
//! |---------|----------|----------|
//! | `ArangoConnection` | Default; remote | AQL cursors over HTTP, batched |
//! | `InMemoryGraphStore` | Testing, dry runs | `ArangoDB` traversal semantics, no I/O |
//!
//! # Error Modes and Guarantees
//!
//! | Operation | Failure | Notes |
//! |-----------|---------|-------|
//! | `execute` | `Error::Query` | Raised up front or from the stream |
//! | `close` | `Error::OperationFailed` | Handle is consumed either way |
//!
//! Streams are finite and single-pass. An `Err` item ends the stream.

use crate::Result;
use crate::models::Node;
use crate::storage::graph::GraphQuery;

/// Lazy, single-pass sequence of node records produced by a query.
pub type NodeStream<'a> = Box<dyn Iterator<Item = Result<Node>> + 'a>;

/// Trait for graph store backends.
///
/// # Implementor Notes
///
/// - Methods use `&self`; the handle is long-lived and shared by reference
/// - No retries: surface every failure to the caller
/// - Never mutate the graph
pub trait GraphStore: Send + Sync {
    /// Short backend name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// Executes a read-only query.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Query`] if the query cannot be started. Failures
    /// while reading later results are yielded by the stream itself.
    fn execute(&self, query: &GraphQuery) -> Result<NodeStream<'_>>;

    /// Releases the handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release its resources.
    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl<T: GraphStore + ?Sized> GraphStore for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn execute(&self, query: &GraphQuery) -> Result<NodeStream<'_>> {
        (**self).execute(query)
    }
}

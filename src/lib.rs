//! # Graph Retriever
//!
//! Keyword retrieval with graph expansion over an `ArangoDB` graph.
//!
//! Graph Retriever finds every node whose `text` contains a query substring,
//! walks the graph outward from each match up to a configured hop depth, and
//! joins the collected texts into one blob suitable as language-model context.
//!
//! ## Features
//!
//! - Parameterized AQL (bind variables only, no string interpolation)
//! - Lazy, single-pass `ArangoDB` cursors over the HTTP API
//! - In-memory graph store for tests and offline dry runs
//! - Pipeline lifecycle hooks (`on_startup`, `handle_message`, `on_shutdown`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use graph_retriever::{ExpandingRetriever, RetrievalConfig, Retriever};
//! use graph_retriever::storage::graph::ArangoConnection;
//!
//! let connection = ArangoConnection::connect(&settings)?;
//! let config = RetrievalConfig::new("policies_graph").with_hop(100);
//! let records = ExpandingRetriever::new(&connection, config).retrieve("refund")?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

pub use config::{ArangoSettings, RetrievalSettings, RetrieverConfig};
pub use models::{ChatMessage, DocumentRecord, Node, PipelineRequest};
pub use services::{
    CONTEXT_SEPARATOR, ExpandingRetriever, Pipeline, RetrievalConfig, Retriever, join_texts,
};
pub use storage::graph::{GraphQuery, GraphStore};

/// Error type for graph retriever operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `Connection` | Endpoint unreachable, credentials rejected, database missing |
/// | `Query` | Malformed AQL, query timeout, undecodable result rows |
/// | `InvalidInput` | Invalid collection names, malformed host requests |
/// | `NotConnected` | A message arrives before `on_startup` or after `on_shutdown` |
/// | `OperationFailed` | Config file I/O, observability initialization |
#[derive(Debug, ThisError)]
pub enum Error {
    /// The graph store could not be reached or refused the credentials.
    ///
    /// Fatal to startup; never retried.
    #[error("connection to '{endpoint}' failed: {cause}")]
    Connection {
        /// The endpoint that was contacted.
        endpoint: String,
        /// The underlying cause.
        cause: String,
    },

    /// A query failed to execute or its results could not be read.
    ///
    /// Aborts the whole retrieval call; no partial results are returned.
    #[error("query failed: {message}")]
    Query {
        /// Store-specific error number, when the store reported one.
        code: Option<u32>,
        /// Human-readable failure description.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The pipeline has no open connection.
    #[error("not connected: the pipeline has not been started")]
    NotConnected,

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a [`Error::Query`] without a store error number.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            code: None,
            message: message.into(),
        }
    }
}

/// Result type alias for graph retriever operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("bad collection".to_string());
        assert_eq!(err.to_string(), "invalid input: bad collection");

        let err = Error::Connection {
            endpoint: "http://localhost:8529".to_string(),
            cause: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "connection to 'http://localhost:8529' failed: connection refused"
        );

        let err = Error::Query {
            code: Some(1501),
            message: "syntax error".to_string(),
        };
        assert_eq!(err.to_string(), "query failed: syntax error");

        let err = Error::query("timeout");
        assert_eq!(err.to_string(), "query failed: timeout");
    }
}

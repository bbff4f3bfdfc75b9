//! Expanding retriever: substring match plus bounded graph expansion.
//!
//! # Flow
//!
//! ```text
//! retrieve("refund")
//!     │
//!     ├──▶ ContainsText(start_collection, "refund") → seeds s₁, s₂, …
//!     │
//!     └──▶ for each seed, in store order:
//!              emit (sᵢ.text, sᵢ.key)
//!              Traverse(sᵢ, edge_collection, 1..hop) → emit every text node
//!     │
//!     ▼
//! s₁, s₁'s neighbors…, s₂, s₂'s neighbors…
//! ```
//!
//! Queries run strictly one after another. Any failure aborts the call and
//! discards everything collected so far. Records are not deduplicated: a node
//! reached along several paths, or from several seeds, appears once per visit.

use crate::config::RetrievalSettings;
use crate::models::{DocumentRecord, Node};
use crate::observability::{record_query, record_retrieval};
use crate::storage::graph::{GraphQuery, validate_name};
use crate::storage::traits::GraphStore;
use crate::Result;
use std::time::Instant;

/// Something that turns a text query into document records.
pub trait Retriever {
    /// Retrieves records for `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if any underlying store query fails.
    fn retrieve(&self, query: &str) -> Result<Vec<DocumentRecord>>;
}

/// Configuration for one retrieval call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalConfig {
    /// Graph the collections belong to (used for log context).
    pub graph_name: String,
    /// Collection searched for seed nodes.
    pub start_collection: String,
    /// Edge collection walked from each seed.
    pub edge_collection: String,
    /// Maximum number of hops walked from each seed; 0 disables expansion.
    pub hop: u32,
}

impl RetrievalConfig {
    /// Default seed collection.
    pub const DEFAULT_START_COLLECTION: &'static str = "GraphNodes";

    /// Default edge collection.
    pub const DEFAULT_EDGE_COLLECTION: &'static str = "GraphEdges";

    /// Default hop depth.
    pub const DEFAULT_HOP: u32 = 1;

    /// Creates a configuration for `graph_name` with default collections and
    /// a single hop.
    pub fn new(graph_name: impl Into<String>) -> Self {
        Self {
            graph_name: graph_name.into(),
            start_collection: Self::DEFAULT_START_COLLECTION.to_string(),
            edge_collection: Self::DEFAULT_EDGE_COLLECTION.to_string(),
            hop: Self::DEFAULT_HOP,
        }
    }

    /// Builds a configuration from configured retrieval settings.
    #[must_use]
    pub fn from_settings(settings: &RetrievalSettings) -> Self {
        Self {
            graph_name: settings.graph_name.clone(),
            start_collection: settings.start_collection.clone(),
            edge_collection: settings.edge_collection.clone(),
            hop: settings.hop,
        }
    }

    /// Sets the seed collection.
    #[must_use]
    pub fn with_start_collection(mut self, collection: impl Into<String>) -> Self {
        self.start_collection = collection.into();
        self
    }

    /// Sets the edge collection.
    #[must_use]
    pub fn with_edge_collection(mut self, collection: impl Into<String>) -> Self {
        self.edge_collection = collection.into();
        self
    }

    /// Sets the hop depth.
    #[must_use]
    pub const fn with_hop(mut self, hop: u32) -> Self {
        self.hop = hop;
        self
    }

    /// Checks the collection names.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] for a malformed collection name.
    pub fn validate(&self) -> Result<()> {
        validate_name("start collection", &self.start_collection)?;
        validate_name("edge collection", &self.edge_collection)
    }
}

/// Retriever that expands substring matches through the graph.
///
/// Borrows the store; the connection outlives any number of retrievers.
pub struct ExpandingRetriever<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    config: RetrievalConfig,
}

impl<'a, S: GraphStore + ?Sized> ExpandingRetriever<'a, S> {
    /// Creates a retriever over `store`.
    pub const fn new(store: &'a S, config: RetrievalConfig) -> Self {
        Self { store, config }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    fn expand(&self, query: &str) -> Result<Vec<DocumentRecord>> {
        self.config.validate()?;

        let seeds = self.run(&GraphQuery::contains_text(
            &self.config.start_collection,
            query,
        ))?;
        tracing::debug!(seeds = seeds.len(), "Matched seed nodes");

        let mut records = Vec::with_capacity(seeds.len());
        for seed in seeds {
            let start_vertex = seed.handle(&self.config.start_collection);
            records.extend(seed.into_record());

            if self.config.hop == 0 {
                continue;
            }

            let reached = self.run(&GraphQuery::traverse(
                &start_vertex,
                &self.config.edge_collection,
                self.config.hop,
            ))?;
            tracing::debug!(%start_vertex, reached = reached.len(), "Expanded seed");
            records.extend(reached.into_iter().filter_map(Node::into_record));
        }

        Ok(records)
    }

    /// Executes one query and drains its stream.
    fn run(&self, query: &GraphQuery) -> Result<Vec<Node>> {
        let result = self
            .store
            .execute(query)
            .and_then(|stream| stream.collect::<Result<Vec<_>>>());
        record_query(self.store.name(), query.kind(), result.is_ok());
        result
    }
}

impl<S: GraphStore + ?Sized> Retriever for ExpandingRetriever<'_, S> {
    fn retrieve(&self, query: &str) -> Result<Vec<DocumentRecord>> {
        let span = tracing::info_span!(
            "retrieve",
            graph = %self.config.graph_name,
            hop = self.config.hop,
            backend = self.store.name()
        );
        let _entered = span.enter();

        let started = Instant::now();
        let result = self.expand(query);
        let elapsed = started.elapsed();

        match &result {
            Ok(records) => {
                tracing::debug!(
                    records = records.len(),
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Retrieval complete"
                );
                record_retrieval(records.len(), elapsed, true);
            },
            Err(e) => {
                tracing::warn!(error = %e, "Retrieval failed");
                record_retrieval(0, elapsed, false);
            },
        }

        result
    }
}

//! In-memory graph store for testing and offline dry runs.
//!
//! Interprets [`GraphQuery`] directly over nodes and edges held in memory,
//! mirroring `ArangoDB` semantics closely enough that retrieval behaves the
//! same against either backend:
//!
//! - documents come back in insertion order
//! - traversal is depth-first, edges are unique per path, vertices are not
//!   deduplicated, and edges are followed in either direction
//! - unknown collections fail with errorNum 1203

// Allow excessive_nesting for the recursive traversal walk.
#![allow(clippy::excessive_nesting)]

use super::query::GraphQuery;
use crate::models::Node;
use crate::storage::traits::{GraphStore, NodeStream};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

/// `ArangoDB` errorNum for a missing collection.
const COLLECTION_NOT_FOUND: u32 = 1203;

/// A directed edge between two document handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Source document handle.
    #[serde(rename = "_from")]
    pub from: String,
    /// Target document handle.
    #[serde(rename = "_to")]
    pub to: String,
}

impl Edge {
    /// Creates a new edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns the opposite end when `vertex` is either end of the edge.
    fn other_end(&self, vertex: &str) -> Option<&str> {
        if self.from == vertex {
            Some(&self.to)
        } else if self.to == vertex {
            Some(&self.from)
        } else {
            None
        }
    }
}

/// Serialized form of a whole graph.
///
/// ```json
/// {
///   "nodes": {"GraphNodes": [{"_key": "1", "text": "alpha policy"}]},
///   "edges": {"GraphEdges": [{"_from": "GraphNodes/1", "_to": "GraphNodes/2"}]}
/// }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Node documents per collection.
    #[serde(default)]
    pub nodes: HashMap<String, Vec<Node>>,
    /// Edges per edge collection.
    #[serde(default)]
    pub edges: HashMap<String, Vec<Edge>>,
}

#[derive(Debug, Default)]
struct GraphData {
    collections: HashMap<String, Vec<Node>>,
    handles: HashMap<String, (String, usize)>,
    edges: HashMap<String, Vec<Edge>>,
}

impl GraphData {
    fn lookup(&self, handle: &str) -> Option<&Node> {
        let (collection, index) = self.handles.get(handle)?;
        self.collections.get(collection)?.get(*index)
    }

    fn collection(&self, name: &str) -> Result<&[Node]> {
        self.collections
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| not_found(name))
    }

    fn edge_collection(&self, name: &str) -> Result<&[Edge]> {
        self.edges
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| not_found(name))
    }
}

/// In-memory graph store.
///
/// Uses `RwLock` for thread-safe access with reader-writer semantics.
/// Data is not persisted between runs.
///
/// # Example
///
/// ```rust,ignore
/// use graph_retriever::storage::InMemoryGraphStore;
/// use graph_retriever::Node;
///
/// let store = InMemoryGraphStore::new();
/// store.add_node("GraphNodes", Node::new("1").with_text("alpha policy"))?;
/// store.add_node("GraphNodes", Node::new("2").with_text("beta rule"))?;
/// store.add_edge("GraphEdges", "GraphNodes/1", "GraphNodes/2")?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    data: RwLock<GraphData>,
}

impl InMemoryGraphStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot contains duplicate document handles.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let store = Self::new();
        let mut collections: Vec<_> = snapshot.nodes.into_iter().collect();
        collections.sort_by(|a, b| a.0.cmp(&b.0));
        for (collection, nodes) in collections {
            store.create_collection(&collection)?;
            for node in nodes {
                store.add_node(&collection, node)?;
            }
        }
        for (collection, edges) in snapshot.edges {
            store.create_edge_collection(&collection)?;
            for edge in edges {
                store.add_edge(&collection, edge.from, edge.to)?;
            }
        }
        Ok(store)
    }

    /// Loads a store from a JSON snapshot file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_graph_snapshot".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;
        let snapshot: GraphSnapshot =
            serde_json::from_str(&contents).map_err(|e| Error::OperationFailed {
                operation: "parse_graph_snapshot".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        let store = Self::from_snapshot(snapshot)?;
        tracing::info!(
            path = %path.display(),
            nodes = store.node_count(),
            edges = store.edge_count(),
            "Loaded graph snapshot"
        );
        Ok(store)
    }

    /// Creates an empty document collection if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn create_collection(&self, name: &str) -> Result<()> {
        let mut data = self.write("create_collection")?;
        data.collections.entry(name.to_string()).or_default();
        Ok(())
    }

    /// Creates an empty edge collection if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn create_edge_collection(&self, name: &str) -> Result<()> {
        let mut data = self.write("create_edge_collection")?;
        data.edges.entry(name.to_string()).or_default();
        Ok(())
    }

    /// Adds a node to a collection, creating the collection if needed.
    ///
    /// The node's `_id` is set to `collection/key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the handle already exists.
    pub fn add_node(&self, collection: &str, mut node: Node) -> Result<()> {
        let handle = format!("{collection}/{}", node.key);
        let mut data = self.write("add_node")?;
        if data.handles.contains_key(&handle) {
            return Err(Error::InvalidInput(format!("duplicate document: {handle}")));
        }

        node.id = Some(handle.clone());
        let nodes = data.collections.entry(collection.to_string()).or_default();
        nodes.push(node);
        let index = nodes.len() - 1;
        data.handles.insert(handle, (collection.to_string(), index));
        Ok(())
    }

    /// Adds an edge, creating the edge collection if needed.
    ///
    /// Dangling edges are accepted, as they are by the real store.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn add_edge(
        &self,
        edge_collection: &str,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Result<()> {
        let mut data = self.write("add_edge")?;
        data.edges
            .entry(edge_collection.to_string())
            .or_default()
            .push(Edge::new(from, to));
        Ok(())
    }

    /// Returns the number of nodes stored.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.data.read().map(|d| d.handles.len()).unwrap_or(0)
    }

    /// Returns the number of edges stored.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.data
            .read()
            .map(|d| d.edges.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    fn write(&self, operation: &str) -> Result<std::sync::RwLockWriteGuard<'_, GraphData>> {
        self.data.write().map_err(|_| Error::OperationFailed {
            operation: operation.to_string(),
            cause: "Lock poisoned".to_string(),
        })
    }

    fn contains_text(data: &GraphData, collection: &str, needle: &str) -> Result<Vec<Node>> {
        let needle = needle.to_lowercase();
        Ok(data
            .collection(collection)?
            .iter()
            .filter(|node| {
                node.text
                    .as_ref()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    fn traverse(
        data: &GraphData,
        start_vertex: &str,
        edge_collection: &str,
        min_depth: u32,
        max_depth: u32,
    ) -> Result<Vec<Node>> {
        let edges = data.edge_collection(edge_collection)?;
        let mut visited = Vec::new();
        if data.lookup(start_vertex).is_none() {
            return Ok(visited);
        }

        let walk = Walk {
            data,
            edges,
            min_depth,
            max_depth,
        };
        walk.descend(start_vertex, 0, &mut Vec::new(), &mut visited);
        Ok(visited)
    }
}

/// Depth-first traversal state shared across recursion.
struct Walk<'a> {
    data: &'a GraphData,
    edges: &'a [Edge],
    min_depth: u32,
    max_depth: u32,
}

impl Walk<'_> {
    fn descend(&self, vertex: &str, depth: u32, path: &mut Vec<usize>, out: &mut Vec<Node>) {
        if depth >= self.max_depth {
            return;
        }

        for (index, edge) in self.edges.iter().enumerate() {
            let Some(next) = edge.other_end(vertex) else {
                continue;
            };
            if path.contains(&index) {
                continue;
            }

            let next_depth = depth + 1;
            if next_depth >= self.min_depth
                && let Some(node) = self.data.lookup(next)
                && node.text.is_some()
            {
                out.push(node.clone());
            }

            path.push(index);
            self.descend(next, next_depth, path, out);
            path.pop();
        }
    }
}

impl GraphStore for InMemoryGraphStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn execute(&self, query: &GraphQuery) -> Result<NodeStream<'_>> {
        let data = self.data.read().map_err(|_| Error::OperationFailed {
            operation: "execute".to_string(),
            cause: "Lock poisoned".to_string(),
        })?;

        let nodes = match query {
            GraphQuery::ContainsText { collection, needle } => {
                Self::contains_text(&data, collection, needle)?
            },
            GraphQuery::Traverse {
                start_vertex,
                edge_collection,
                min_depth,
                max_depth,
            } => Self::traverse(&data, start_vertex, edge_collection, *min_depth, *max_depth)?,
        };

        Ok(Box::new(nodes.into_iter().map(Ok)))
    }
}

fn not_found(name: &str) -> Error {
    Error::Query {
        code: Some(COLLECTION_NOT_FOUND),
        message: format!("collection or view not found: {name}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(store: &InMemoryGraphStore, query: &GraphQuery) -> Vec<String> {
        store
            .execute(query)
            .unwrap()
            .map(|node| node.unwrap().key)
            .collect()
    }

    fn chain() -> InMemoryGraphStore {
        // 1 - 2 - 3 - 4, with 3 lacking text
        let store = InMemoryGraphStore::new();
        store.add_node("N", Node::new("1").with_text("alpha")).unwrap();
        store.add_node("N", Node::new("2").with_text("beta")).unwrap();
        store.add_node("N", Node::new("3")).unwrap();
        store.add_node("N", Node::new("4").with_text("delta")).unwrap();
        store.add_edge("E", "N/1", "N/2").unwrap();
        store.add_edge("E", "N/3", "N/2").unwrap();
        store.add_edge("E", "N/3", "N/4").unwrap();
        store
    }

    #[test]
    fn test_contains_text_case_insensitive() {
        let store = chain();
        assert_eq!(keys(&store, &GraphQuery::contains_text("N", "ALPHA")), vec!["1"]);
        assert_eq!(keys(&store, &GraphQuery::contains_text("N", "lt")), vec!["4"]);
    }

    #[test]
    fn test_contains_empty_needle_matches_all_text_nodes() {
        let store = chain();
        assert_eq!(
            keys(&store, &GraphQuery::contains_text("N", "")),
            vec!["1", "2", "4"]
        );
    }

    #[test]
    fn test_traverse_respects_depth_and_skips_textless() {
        let store = chain();
        assert_eq!(keys(&store, &GraphQuery::traverse("N/1", "E", 1)), vec!["2"]);
        assert_eq!(keys(&store, &GraphQuery::traverse("N/1", "E", 2)), vec!["2"]);
        assert_eq!(keys(&store, &GraphQuery::traverse("N/1", "E", 3)), vec!["2", "4"]);
    }

    #[test]
    fn test_traverse_zero_depth_is_empty() {
        let store = chain();
        assert!(keys(&store, &GraphQuery::traverse("N/1", "E", 0)).is_empty());
    }

    #[test]
    fn test_traverse_cycle_revisits_vertices() {
        let store = InMemoryGraphStore::new();
        for key in ["a", "b", "c"] {
            store.add_node("N", Node::new(key).with_text(key)).unwrap();
        }
        store.add_edge("E", "N/a", "N/b").unwrap();
        store.add_edge("E", "N/b", "N/c").unwrap();
        store.add_edge("E", "N/c", "N/a").unwrap();

        assert_eq!(
            keys(&store, &GraphQuery::traverse("N/a", "E", 3)),
            vec!["b", "c", "a", "c", "b", "a"]
        );
    }

    #[test]
    fn test_traverse_missing_start_vertex_is_empty() {
        let store = chain();
        assert!(keys(&store, &GraphQuery::traverse("N/missing", "E", 5)).is_empty());
    }

    #[test]
    fn test_unknown_collections_fail() {
        let store = chain();
        assert!(matches!(
            store.execute(&GraphQuery::contains_text("Missing", "a")),
            Err(Error::Query { code: Some(1203), .. })
        ));
        assert!(matches!(
            store.execute(&GraphQuery::traverse("N/1", "Missing", 1)),
            Err(Error::Query { code: Some(1203), .. })
        ));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let store = InMemoryGraphStore::new();
        store.add_node("N", Node::new("1")).unwrap();
        assert!(matches!(
            store.add_node("N", Node::new("1")),
            Err(Error::InvalidInput(_))
        ));
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_snapshot_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(
            &path,
            r#"{
                "nodes": {"GraphNodes": [{"_key": "1", "text": "alpha"}, {"_key": "2", "text": "beta"}]},
                "edges": {"GraphEdges": [{"_from": "GraphNodes/2", "_to": "GraphNodes/1"}]}
            }"#,
        )
        .unwrap();

        let store = InMemoryGraphStore::load_file(&path).unwrap();
        assert_eq!(store.node_count(), 2);
        assert_eq!(store.edge_count(), 1);
        assert_eq!(
            keys(&store, &GraphQuery::traverse("GraphNodes/1", "GraphEdges", 1)),
            vec!["2"]
        );
    }
}

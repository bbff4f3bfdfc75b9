//! Typed read-only graph queries and their AQL rendering.
//!
//! User-supplied text only ever reaches the store as a bind parameter.
//! Collection names travel as collection bind parameters (`@@name`) and are
//! validated against `ArangoDB` naming rules before use.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// Maximum length of a collection or database name.
const MAX_NAME_LENGTH: usize = 256;

const CONTAINS_TEXT_AQL: &str = "\
FOR node IN @@collection
    FILTER IS_STRING(node.text) AND CONTAINS(LOWER(node.text), LOWER(@needle))
    RETURN node";

const TRAVERSE_AQL: &str = "\
FOR v IN @min_depth..@max_depth ANY @start_vertex @@edge_collection
    FILTER IS_STRING(v.text)
    RETURN v";

/// A read-only query understood by every [`crate::GraphStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphQuery {
    /// Nodes in `collection` whose text contains `needle`, case-insensitively.
    ContainsText {
        /// Collection to scan.
        collection: String,
        /// Substring to look for.
        needle: String,
    },
    /// Text-bearing nodes reachable from `start_vertex` in either direction.
    Traverse {
        /// Document handle (`collection/key`) of the start vertex.
        start_vertex: String,
        /// Edge collection to walk.
        edge_collection: String,
        /// Minimum path length emitted.
        min_depth: u32,
        /// Maximum path length walked.
        max_depth: u32,
    },
}

impl GraphQuery {
    /// Builds a substring-match query.
    pub fn contains_text(collection: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::ContainsText {
            collection: collection.into(),
            needle: needle.into(),
        }
    }

    /// Builds a traversal of `1..=max_depth` hops.
    pub fn traverse(
        start_vertex: impl Into<String>,
        edge_collection: impl Into<String>,
        max_depth: u32,
    ) -> Self {
        Self::Traverse {
            start_vertex: start_vertex.into(),
            edge_collection: edge_collection.into(),
            min_depth: 1,
            max_depth,
        }
    }

    /// Label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ContainsText { .. } => "contains_text",
            Self::Traverse { .. } => "traverse",
        }
    }

    /// Renders the query as AQL with bind parameters.
    #[must_use]
    pub fn to_aql(&self) -> AqlQuery {
        let mut bind_vars = Map::new();
        let query = match self {
            Self::ContainsText { collection, needle } => {
                bind_vars.insert("@collection".to_string(), Value::from(collection.as_str()));
                bind_vars.insert("needle".to_string(), Value::from(needle.as_str()));
                CONTAINS_TEXT_AQL
            },
            Self::Traverse {
                start_vertex,
                edge_collection,
                min_depth,
                max_depth,
            } => {
                bind_vars.insert("min_depth".to_string(), Value::from(*min_depth));
                bind_vars.insert("max_depth".to_string(), Value::from(*max_depth));
                bind_vars.insert("start_vertex".to_string(), Value::from(start_vertex.as_str()));
                bind_vars.insert(
                    "@edge_collection".to_string(),
                    Value::from(edge_collection.as_str()),
                );
                TRAVERSE_AQL
            },
        };

        AqlQuery {
            query: query.to_string(),
            bind_vars,
        }
    }
}

/// AQL text plus its bind parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AqlQuery {
    /// Query text.
    pub query: String,
    /// Bind parameters, keyed without the leading `@`.
    #[serde(rename = "bindVars")]
    pub bind_vars: Map<String, Value>,
}

impl AqlQuery {
    /// Creates a query without bind parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            bind_vars: Map::new(),
        }
    }

    /// Adds a bind parameter.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind_vars.insert(name.into(), value.into());
        self
    }
}

/// Validates a collection or database name.
///
/// Accepts the traditional `ArangoDB` naming scheme: a letter or underscore,
/// then letters, digits, underscores or hyphens, up to 256 bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] naming `what` if the name is rejected.
pub fn validate_name(what: &str, name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid_start && valid_rest && name.len() <= MAX_NAME_LENGTH {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("invalid {what} name: '{name}'")))
    }
}

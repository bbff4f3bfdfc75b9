//! Graph node records.

use super::DocumentRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node record as stored in the graph database.
///
/// Only `_key` is required. The optional `text` attribute is what retrieval
/// matches against and returns; every other attribute is carried through
/// untouched in [`Node::attributes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Document key, unique within its collection.
    #[serde(rename = "_key")]
    pub key: String,
    /// Full document handle (`collection/key`), when the store supplied one.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Free-form text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Remaining document attributes.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Node {
    /// Creates a node with the given key and no text.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: None,
            text: None,
            attributes: Map::new(),
        }
    }

    /// Sets the text content.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the document handle.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds an extra attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns the document handle used as a traversal start vertex.
    ///
    /// Prefers the store-supplied `_id` and falls back to `collection/key`.
    #[must_use]
    pub fn handle(&self, collection: &str) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{collection}/{}", self.key))
    }

    /// Projects the node into a document record.
    ///
    /// Returns `None` for nodes without text.
    #[must_use]
    pub fn into_record(self) -> Option<DocumentRecord> {
        let key = self.key;
        self.text.map(|text| DocumentRecord::new(text, key))
    }
}

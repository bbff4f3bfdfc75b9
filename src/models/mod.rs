//! Data models for graph retrieval.
//!
//! Nodes come from the graph store, document records go out to callers, and
//! pipeline requests describe what a host hands to [`crate::Pipeline`].

mod document;
mod node;
mod request;

pub use document::DocumentRecord;
pub use node::Node;
pub use request::{ChatMessage, PipelineRequest};

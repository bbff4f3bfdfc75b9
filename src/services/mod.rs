//! Service layer.
//!
//! - [`ExpandingRetriever`]: substring match plus graph expansion
//! - [`Pipeline`]: connection lifecycle and message handling for hosts

mod pipeline;
mod retriever;

pub use pipeline::{CONTEXT_SEPARATOR, Pipeline, StoreConnector, join_texts};
pub use retriever::{ExpandingRetriever, RetrievalConfig, Retriever};

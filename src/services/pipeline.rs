//! Pipeline host surface.
//!
//! A host framework drives the pipeline through three hooks:
//!
//! - `on_startup`: open the graph store connection (process lifetime)
//! - `handle_message`: retrieve context for one user message
//! - `on_shutdown`: release the connection
//!
//! The connection is owned by the [`Pipeline`] value and lent to a fresh
//! [`ExpandingRetriever`] for every message.

use super::retriever::{ExpandingRetriever, RetrievalConfig, Retriever};
use crate::config::RetrieverConfig;
use crate::models::{ChatMessage, DocumentRecord, PipelineRequest};
use crate::storage::graph::ArangoConnection;
use crate::storage::traits::GraphStore;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Separator placed between record texts in the joined output.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";

/// Opens a graph store from configuration.
pub type StoreConnector = Box<dyn Fn(&RetrieverConfig) -> Result<Box<dyn GraphStore>> + Send + Sync>;

/// Joins record texts with [`CONTEXT_SEPARATOR`].
///
/// No leading or trailing separator; an empty slice yields an empty string.
#[must_use]
pub fn join_texts(records: &[DocumentRecord]) -> String {
    records
        .iter()
        .map(|record| record.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Graph context pipeline.
pub struct Pipeline {
    config: RetrieverConfig,
    connector: StoreConnector,
    store: Option<Box<dyn GraphStore>>,
}

impl Pipeline {
    /// Display name reported to hosts.
    pub const NAME: &'static str = "ArangoDB Graph Entity Streamer";

    /// Creates a pipeline that connects to `ArangoDB` on startup.
    #[must_use]
    pub fn new(config: RetrieverConfig) -> Self {
        Self::with_connector(
            config,
            Box::new(|config: &RetrieverConfig| -> Result<Box<dyn GraphStore>> {
                let connection = ArangoConnection::connect(&config.arangodb)?;
                Ok(Box::new(connection) as Box<dyn GraphStore>)
            }),
        )
    }

    /// Creates a pipeline over an already-open store.
    ///
    /// Startup hands the pipeline a shared handle; shutdown only drops it.
    #[must_use]
    pub fn with_store<S: GraphStore + 'static>(config: RetrieverConfig, store: Arc<S>) -> Self {
        Self::with_connector(
            config,
            Box::new(move |_: &RetrieverConfig| -> Result<Box<dyn GraphStore>> {
                Ok(Box::new(Arc::clone(&store)))
            }),
        )
    }

    /// Creates a pipeline with a custom store connector.
    #[must_use]
    pub fn with_connector(config: RetrieverConfig, connector: StoreConnector) -> Self {
        Self {
            config,
            connector,
            store: None,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &RetrieverConfig {
        &self.config
    }

    /// Whether a store connection is open.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.store.is_some()
    }

    /// Opens the store connection.
    ///
    /// Calling it while already connected does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the store cannot be reached or
    /// rejects the credentials.
    pub fn on_startup(&mut self) -> Result<()> {
        if self.store.is_some() {
            tracing::debug!("Pipeline already started");
            return Ok(());
        }

        let store = (self.connector)(&self.config)?;
        tracing::info!(pipeline = Self::NAME, backend = store.name(), "Pipeline started");
        self.store = Some(store);
        Ok(())
    }

    /// Closes the store connection, if open.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to close. The handle is dropped
    /// either way.
    pub fn on_shutdown(&mut self) -> Result<()> {
        let Some(store) = self.store.take() else {
            return Ok(());
        };
        let backend = store.name();
        store.close()?;
        tracing::info!(pipeline = Self::NAME, backend, "Pipeline stopped");
        Ok(())
    }

    /// Builds the retrieval configuration for one message.
    #[must_use]
    pub fn retrieval_config(&self) -> RetrievalConfig {
        RetrievalConfig::from_settings(&self.config.retrieval)
    }

    /// Retrieves records for `query` with a fresh retrieval configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before startup, or any retrieval error.
    pub fn retrieve(&self, query: &str) -> Result<Vec<DocumentRecord>> {
        self.retrieve_with(query, self.retrieval_config())
    }

    /// Retrieves records for `query` with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before startup, or any retrieval error.
    pub fn retrieve_with(&self, query: &str, config: RetrievalConfig) -> Result<Vec<DocumentRecord>> {
        let store = self.store.as_deref().ok_or(Error::NotConnected)?;
        ExpandingRetriever::new(store, config).retrieve(query)
    }

    /// Handles one user message and returns the joined context text.
    ///
    /// Only `user_message` affects the result; the model id, history and body
    /// are accepted for host compatibility.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] before startup, or any retrieval error.
    /// No fallback text is produced on failure.
    pub fn handle_message(
        &self,
        user_message: &str,
        model_id: &str,
        messages: &[ChatMessage],
        body: &Value,
    ) -> Result<String> {
        tracing::info!(
            user_message,
            model_id,
            history = messages.len(),
            has_body = !body.is_null(),
            "Handling user message"
        );

        let records = self.retrieve(user_message)?;
        Ok(join_texts(&records))
    }

    /// Handles a deserialized host request.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::handle_message`].
    pub fn handle_request(&self, request: &PipelineRequest) -> Result<String> {
        self.handle_message(
            &request.user_message,
            &request.model_id,
            &request.messages,
            &request.body,
        )
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(e) = self.on_shutdown() {
            tracing::warn!(error = %e, "Pipeline shutdown on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Node;
    use crate::storage::graph::InMemoryGraphStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_pipeline(store: Arc<InMemoryGraphStore>) -> Pipeline {
        Pipeline::with_store(RetrieverConfig::default(), store)
    }

    fn policy_store() -> Arc<InMemoryGraphStore> {
        let store = InMemoryGraphStore::new();
        store.add_node("GraphNodes", Node::new("1").with_text("alpha policy")).unwrap();
        store.add_node("GraphNodes", Node::new("2").with_text("beta rule")).unwrap();
        store.add_edge("GraphEdges", "GraphNodes/1", "GraphNodes/2").unwrap();
        Arc::new(store)
    }

    #[test]
    fn test_join_texts() {
        assert_eq!(join_texts(&[]), "");
        assert_eq!(join_texts(&[DocumentRecord::new("a", "1")]), "a");
        assert_eq!(
            join_texts(&[DocumentRecord::new("a", "1"), DocumentRecord::new("b", "2")]),
            "a\n---\nb"
        );
    }

    #[test]
    fn test_handle_message_before_startup_fails() {
        let pipeline = memory_pipeline(policy_store());
        let err = pipeline
            .handle_message("alpha", "m", &[], &Value::Null)
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    fn test_lifecycle() {
        let mut pipeline = memory_pipeline(policy_store());
        pipeline.on_startup().unwrap();
        assert!(pipeline.is_connected());

        let output = pipeline
            .handle_message("ALPHA", "policies", &[], &Value::Null)
            .unwrap();
        assert_eq!(output, "alpha policy\n---\nbeta rule");

        pipeline.on_shutdown().unwrap();
        assert!(!pipeline.is_connected());
        pipeline.on_shutdown().unwrap();
        assert!(matches!(
            pipeline.handle_message("alpha", "", &[], &Value::Null),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_startup_is_idempotent() {
        let opened = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&opened);
        let store = policy_store();
        let mut pipeline = Pipeline::with_connector(
            RetrieverConfig::default(),
            Box::new(move |_: &RetrieverConfig| -> Result<Box<dyn GraphStore>> {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Box::new(Arc::clone(&store)) as Box<dyn GraphStore>)
            }),
        );

        pipeline.on_startup().unwrap();
        pipeline.on_startup().unwrap();
        assert_eq!(opened.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_startup_failure_propagates() {
        let mut pipeline = Pipeline::with_connector(
            RetrieverConfig::default(),
            Box::new(|_: &RetrieverConfig| -> Result<Box<dyn GraphStore>> {
                Err(Error::Connection {
                    endpoint: "http://nowhere:8529".to_string(),
                    cause: "refused".to_string(),
                })
            }),
        );
        assert!(matches!(pipeline.on_startup(), Err(Error::Connection { .. })));
        assert!(!pipeline.is_connected());
    }

    #[test]
    fn test_handle_request_uses_user_message_only() {
        let mut pipeline = memory_pipeline(policy_store());
        pipeline.on_startup().unwrap();

        let request: PipelineRequest = serde_json::from_value(serde_json::json!({
            "user_message": "beta",
            "model_id": "ignored",
            "messages": [{"role": "user", "content": "alpha"}],
            "body": {"user": {"name": "x"}}
        }))
        .unwrap();

        assert_eq!(
            pipeline.handle_request(&request).unwrap(),
            "beta rule\n---\nalpha policy"
        );
    }

    #[test]
    fn test_retrieve_with_explicit_hop() {
        let mut pipeline = memory_pipeline(policy_store());
        pipeline.on_startup().unwrap();

        let config = pipeline.retrieval_config().with_hop(0);
        let records = pipeline.retrieve_with("alpha", config).unwrap();
        assert_eq!(records, vec![DocumentRecord::new("alpha policy", "1")]);
    }
}

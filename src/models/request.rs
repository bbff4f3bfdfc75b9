//! Host pipeline request shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One chat message from the conversation history.
///
/// `content` is kept as raw JSON because chat hosts send either a string or a
/// list of content parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message author role (`user`, `assistant`, `system`).
    pub role: String,
    /// Message content.
    #[serde(default)]
    pub content: Value,
}

/// A single request from a pipeline host.
///
/// Only `user_message` influences retrieval; the remaining fields are accepted
/// so hosts can pass their full request through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// The latest user message.
    pub user_message: String,
    /// Model identifier selected by the host.
    #[serde(default)]
    pub model_id: String,
    /// Conversation history.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Raw request body.
    #[serde(default)]
    pub body: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_request() {
        let request: PipelineRequest =
            serde_json::from_str(r#"{"user_message": "refund policy"}"#).unwrap();
        assert_eq!(request.user_message, "refund policy");
        assert!(request.model_id.is_empty());
        assert!(request.messages.is_empty());
        assert!(request.body.is_null());
    }

    #[test]
    fn test_full_request() {
        let request: PipelineRequest = serde_json::from_str(
            r#"{
                "user_message": "hi",
                "model_id": "policies",
                "messages": [{"role": "user", "content": [{"type": "text", "text": "hi"}]}],
                "body": {"stream": false}
            }"#,
        )
        .unwrap();
        assert_eq!(request.model_id, "policies");
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
        assert!(request.messages[0].content.is_array());
    }
}

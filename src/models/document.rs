//! Retrieval output records.

use serde::{Deserialize, Serialize};

/// One retrieved text and the key of the node it came from.
///
/// Records carry no identity beyond this pair. The same node reached through
/// several paths yields several equal records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Node text.
    pub text: String,
    /// Node key.
    pub id: String,
}

impl DocumentRecord {
    /// Creates a new record.
    #[must_use]
    pub fn new(text: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            id: id.into(),
        }
    }
}

//! # Message Envelope
//!
//! The wrapper for every repository-to-repository message.
//!
//! ## Properties
//!
//! - **Routing**: a request names its target repository; the messenger turns
//!   it into a bus event on that repository's scope.
//! - **Envelope Authority**: `source` is stamped by the sending messenger and
//!   is the sole source of truth for the sender's identity.

use serde::{Deserialize, Serialize};

use crate::Payload;

/// Event name under which messenger traffic is published on the bus.
pub const DISPATCH_EVENT: &str = "dispatch";

/// What a repository asks its messenger to send.
///
/// Wire shape: `{ "type", "repositoryId", "message"? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRequest {
    /// Application-defined message kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Target repository id.
    pub repository_id: String,
    /// Optional body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Payload>,
}

impl MessageRequest {
    /// Create a request without a body.
    pub fn new(kind: impl Into<String>, repository_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            repository_id: repository_id.into(),
            message: None,
        }
    }

    /// Attach a body.
    #[must_use]
    pub fn with_message(mut self, message: Payload) -> Self {
        self.message = Some(message);
        self
    }
}

/// What a subscribed repository receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Application-defined message kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Payload>,
    /// Id of the sending repository.
    pub source: String,
}

impl Message {
    /// Serialize into the bus payload representation.
    #[must_use]
    pub fn to_payload(&self) -> Payload {
        serde_json::json!({
            "type": self.kind,
            "message": self.message,
            "source": self.source,
        })
    }

    /// Parse a bus payload back into a message.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the payload lacks `type` or `source`.
    pub fn from_payload(payload: &Payload) -> Result<Self, serde_json::Error> {
        let mut message: Self = serde_json::from_value(payload.clone())?;
        if matches!(message.message, Some(Payload::Null)) {
            message.message = None;
        }
        Ok(message)
    }
}

//! # Bus Events
//!
//! Defines the records that flow through the scoped bus and the request
//! shapes used to publish and subscribe.

use serde::{Deserialize, Serialize};
use shared_types::Payload;

/// Identity of one event stream: a `(scope, event_name)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreamKey {
    /// Scope the stream belongs to (usually a repository id).
    pub scope: String,
    /// Event name within the scope.
    pub event_name: String,
}

impl StreamKey {
    /// Build a key.
    pub fn new(scope: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            event_name: event_name.into(),
        }
    }
}

/// One published event within a stream.
///
/// Records are retained for the lifetime of the bus. Only `acknowledged`
/// ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic, starting at 1, unique within `(scope, event_name)`.
    pub sequence: u64,
    /// Scope the event was published to.
    pub scope: String,
    /// Event name.
    pub event_name: String,
    /// Opaque body.
    pub payload: Payload,
    /// Publisher identity, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// True once delivered to at least one subscriber.
    pub acknowledged: bool,
}

impl EventRecord {
    /// Key of the stream this record belongs to.
    #[must_use]
    pub fn key(&self) -> StreamKey {
        StreamKey::new(self.scope.clone(), self.event_name.clone())
    }
}

/// Arguments of `ScopedEventBus::publish`.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub scope: String,
    pub event_name: String,
    pub payload: Payload,
    pub source: Option<String>,
}

impl PublishRequest {
    /// Publish `payload` under `(scope, event_name)` with no source.
    pub fn new(scope: impl Into<String>, event_name: impl Into<String>, payload: Payload) -> Self {
        Self {
            scope: scope.into(),
            event_name: event_name.into(),
            payload,
            source: None,
        }
    }

    /// Set the publisher identity.
    #[must_use]
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Arguments of `ScopedEventBus::subscribe`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    pub scope: String,
    pub event_name: String,
    /// Owner used by the double-subscribe guard. `None` disables the guard.
    pub owner: Option<String>,
    /// Replay unacknowledged history before returning.
    pub from_beginning: bool,
}

impl SubscribeOptions {
    /// Subscribe to `(scope, event_name)` from now on.
    pub fn new(scope: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            event_name: event_name.into(),
            owner: None,
            from_beginning: false,
        }
    }

    /// Set the owner for the double-subscribe guard.
    #[must_use]
    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Request catch-up replay.
    #[must_use]
    pub fn from_beginning(mut self) -> Self {
        self.from_beginning = true;
        self
    }

    /// Stream key targeted by these options.
    #[must_use]
    pub fn key(&self) -> StreamKey {
        StreamKey::new(self.scope.clone(), self.event_name.clone())
    }
}

/// Result of a successful `publish` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The interceptor chain passed; `receivers` subscribers were notified.
    Delivered { sequence: u64, receivers: usize },
    /// An interceptor vetoed the record. Nobody was notified.
    Vetoed { sequence: u64 },
    /// The stream was mid-delivery (a subscriber published re-entrantly).
    /// The record passed the interceptor chain and is delivered by the
    /// outer `publish` once the records ahead of it have been delivered.
    Queued { sequence: u64 },
    /// The publisher targeted its own scope. Nothing was recorded.
    SelfTargeted,
}

impl PublishOutcome {
    /// Number of subscribers notified.
    #[must_use]
    pub fn receivers(&self) -> usize {
        match self {
            Self::Delivered { receivers, .. } => *receivers,
            Self::Vetoed { .. } | Self::Queued { .. } | Self::SelfTargeted => 0,
        }
    }

    /// Sequence assigned to the record, if one was created.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        match self {
            Self::Delivered { sequence, .. } | Self::Vetoed { sequence } | Self::Queued { sequence } => {
                Some(*sequence)
            }
            Self::SelfTargeted => None,
        }
    }

    #[must_use]
    pub fn is_vetoed(&self) -> bool {
        matches!(self, Self::Vetoed { .. })
    }
}

//! # Shared Bus - Scoped Event Bus for Inter-Repository Communication
//!
//! Publish/subscribe keyed by `(scope, event_name)`, with an ordered
//! interceptor pipeline per event name and catch-up replay for late
//! subscribers.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                                     ┌──────────────┐
//! │ Repository A │  publish(scope = "B", "dispatch")   │ Repository B │
//! │              │ ──────┐                             │              │
//! └──────────────┘       │                             └──────────────┘
//!                        ▼                                     ↑
//!                  ┌──────────────┐   ┌──────────────┐        │
//!                  │ Interceptors │ → │   Streams    │ ───────┘
//!                  │ (veto/rewrite)│   │ (history)    │  subscribe()
//!                  └──────────────┘   └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Ordering:** within one stream, records are delivered in publish order,
//!   and within one publish, subscribers are notified in subscription order.
//!   A record published by a subscriber onto the stream it is being notified
//!   on is queued behind the record in flight.
//! - **Self-dispatch guard:** a publish whose `source` equals its `scope` is
//!   logged and skipped.
//! - **Double-subscribe guard:** one live subscription per
//!   `(owner, scope, event_name)`.
//! - **Retention:** records are kept for the lifetime of the bus.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod error;
pub mod events;
pub mod interceptor;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use error::BusError;
pub use events::{EventRecord, PublishOutcome, PublishRequest, StreamKey, SubscribeOptions};
pub use interceptor::InterceptorHandle;
pub use publisher::ScopedEventBus;
pub use subscriber::Subscription;

//! # Shared Types Crate
//!
//! Types shared by every subsystem of the repository manager: the payload
//! representation carried by the bus, the message envelope exchanged between
//! repositories, and the `Repository` trait that resource values implement.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-crate types are defined here only.
//! - **Dynamic payloads**: events and method arguments are `serde_json::Value`,
//!   so the bus and the middleware chain stay independent of concrete
//!   repository types.
//! - **Envelope Authority**: the `source` of a `Message` is filled in by the
//!   messenger, never by the payload author.

pub mod errors;
pub mod message;
pub mod repository;

pub use errors::*;
pub use message::{Message, MessageRequest, DISPATCH_EVENT};
pub use repository::{Args, MethodTable, Repository};

/// Opaque payload carried by events and method calls.
pub type Payload = serde_json::Value;

//! # RM-02 Resource
//!
//! Reference-counted resource lifecycle.
//!
//! ## Invariants
//!
//! - The value is present iff `connections > 0`.
//! - The factory runs exactly once per 0→1 transition; the value is dropped
//!   exactly once per 1→0 transition and never while connections remain.
//! - `disconnect` without an open connection is a logged no-op; the counter
//!   never goes below zero.
//!
//! ## Usage Example
//!
//! ```
//! use rm_02_resource::{ReferenceCountedResource, Transition};
//! use std::convert::Infallible;
//! use std::sync::Arc;
//!
//! let resource = ReferenceCountedResource::new(
//!     |base_url: &String| Ok::<_, Infallible>(Arc::new(format!("{base_url}/users"))),
//!     "https://api".to_string(),
//! );
//!
//! assert_eq!(resource.connect().unwrap(), Transition::Created);
//! assert_eq!(resource.connect().unwrap(), Transition::Shared);
//! assert_eq!(resource.disconnect(), Transition::Released);
//! assert_eq!(resource.disconnect(), Transition::Destroyed);
//! assert!(resource.reference().is_none());
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod resource;

pub use resource::{Factory, ReferenceCountedResource, Transition};

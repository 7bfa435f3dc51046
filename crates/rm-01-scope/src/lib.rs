//! # RM-01 Scope
//!
//! Dynamically-scoped values for nested, synchronous callbacks.
//!
//! ## Components
//!
//! - [`Scope`]: one typed stack with a default value (`create_scope`).
//! - [`ScopeRegistry`]: named stacks of type-erased values owned by a
//!   workspace, with [`KeyedScope`] for producers and [`ScopeReader`] for
//!   consumers.
//!
//! ## Invariants
//!
//! - Frames are pushed and popped in strict LIFO order.
//! - A frame is popped on every exit path of its `provider` call, including
//!   unwinding.
//! - Reading an empty scope yields its default value (typed scopes) or `None`
//!   (registry reads).
//!
//! ## Usage Example
//!
//! ```
//! use rm_01_scope::create_scope;
//!
//! let theme = create_scope("light");
//! theme.provider(Some("dark"), || {
//!     assert_eq!(theme.current_value(), "dark");
//! });
//! assert_eq!(theme.current_value(), "light");
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod frame;
pub mod registry;
pub mod stack;

pub use registry::{KeyedScope, ScopeKey, ScopeReader, ScopeRegistry};
pub use stack::{create_scope, Scope};

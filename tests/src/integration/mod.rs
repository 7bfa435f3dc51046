//! # Integration Scenarios
//!
//! Cross-crate flows exercised through the public APIs only.

pub mod lifecycle;
pub mod messaging;
pub mod scopes;

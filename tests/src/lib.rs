//! # Repository Manager Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Repositories and workspaces shared by tests and benches
//! │
//! └── integration/      # Cross-crate scenarios
//!     ├── lifecycle.rs  # define/query/disconnect, hooks, re-entrant installs
//!     ├── messaging.rs  # bus, messenger, interceptors, replay
//!     └── scopes.rs     # scope stacks and context providers
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p rm-tests
//!
//! # By category
//! cargo test -p rm-tests integration::messaging
//!
//! # Benchmarks
//! cargo bench -p rm-tests
//! ```

pub mod fixtures;
pub mod integration;

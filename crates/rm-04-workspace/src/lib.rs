//! # RM-04 Workspace
//!
//! The registry that ties the kernel together: one reference-counted entry
//! per repository id, installed lazily, wrapped by its middleware chain and
//! wired to the workspace bus through a per-repository messenger.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): configuration, descriptors, install context
//! - **Adapters Layer** (`adapters/`): `Messenger`, the bus facade handed
//!   to each repository
//! - **Service Layer** (`service/`): `Workspace`, define/query orchestration
//!
//! ## Lifecycle
//!
//! ```text
//! define_repository ──► entry (connections = 0)
//!                          │ query_repository
//!                          ▼
//!   0→1: install(ctx) → apply middleware → subscribe on_message → on_connect
//!   n→n+1: share the existing value
//!                          │ QueryResult::disconnect
//!                          ▼
//!   1→0: drop value → unsubscribe messenger → on_disconnect
//! ```
//!
//! ## Usage Example
//!
//! ```
//! use rm_04_workspace::{RepositoryDescriptor, Workspace, WorkspaceConfig};
//! use serde_json::json;
//! use shared_types::{MethodTable, Repository};
//! use std::sync::Arc;
//!
//! let workspace = Workspace::new(WorkspaceConfig::new("app"), ()).unwrap();
//! workspace.define_repository(RepositoryDescriptor::new("user-repo", |_| {
//!     let repo: Arc<dyn Repository> =
//!         Arc::new(MethodTable::new().method("name", |_| Ok(json!("Ada"))));
//!     Ok(repo)
//! }));
//!
//! let user = workspace.query_repository("user-repo").unwrap();
//! assert_eq!(user.repository().call("name", vec![]).unwrap(), json!("Ada"));
//! user.disconnect();
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod domain;
pub mod error;
pub mod service;

pub use adapters::Messenger;
pub use domain::{
    InstallContext, InstallFn, LifecycleHook, MessageHook, RepositoryDescriptor,
    RepositoryStatus, WorkspaceConfig,
};
pub use error::WorkspaceError;
pub use service::{ContextHandle, QueryResult, Workspace};

// Re-exported so callers can match on connect/disconnect outcomes.
pub use rm_02_resource::Transition;

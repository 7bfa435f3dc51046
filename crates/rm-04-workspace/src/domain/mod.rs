//! Domain types of the workspace.

pub mod config;
pub mod context;
pub mod descriptor;

pub use config::WorkspaceConfig;
pub use context::InstallContext;
pub use descriptor::{InstallFn, LifecycleHook, MessageHook, RepositoryDescriptor};

use serde::Serialize;

/// Connection count of one defined repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryStatus {
    pub id: String,
    pub connections: usize,
}

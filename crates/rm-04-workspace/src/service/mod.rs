//! Workspace service.

pub mod workspace;

pub use workspace::{ContextHandle, QueryResult, Workspace};

//! Error types for the workspace.

use rm_telemetry::TelemetryError;
use shared_types::HandlerError;
use thiserror::Error;

/// Errors surfaced by workspace operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// No repository is defined under this id.
    #[error("Repository \"{id}\" not found")]
    NotFound { id: String },

    /// The repository's install function failed on the 0→1 transition.
    #[error("Repository \"{id}\" failed to install: {source}")]
    Install {
        id: String,
        #[source]
        source: HandlerError,
    },

    /// The message hook could not be subscribed while connecting.
    #[error("Repository \"{id}\" failed to subscribe its message hook: {source}")]
    Subscribe {
        id: String,
        #[source]
        source: shared_bus::BusError,
    },

    #[error("Metrics setup failed: {0}")]
    Metrics(#[from] TelemetryError),
}

impl WorkspaceError {
    /// Id of the repository the error refers to, if any.
    #[must_use]
    pub fn repository_id(&self) -> Option<&str> {
        match self {
            Self::NotFound { id } | Self::Install { id, .. } | Self::Subscribe { id, .. } => {
                Some(id.as_str())
            }
            Self::Metrics(_) => None,
        }
    }
}

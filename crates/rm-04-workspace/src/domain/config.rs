//! Workspace configuration.

use serde::{Deserialize, Serialize};

/// Settings for one workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Name used in log lines.
    pub id: String,
    /// Log define/connect/disconnect transitions at `info` with metadata.
    /// When off they are still emitted at `debug`, without metadata.
    pub logging: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            id: "workspace".to_string(),
            logging: false,
        }
    }
}

impl WorkspaceConfig {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_logging(mut self, logging: bool) -> Self {
        self.logging = logging;
        self
    }
}

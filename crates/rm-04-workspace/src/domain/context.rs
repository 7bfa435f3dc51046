//! What a repository's install function receives.

use crate::adapters::Messenger;
use rm_01_scope::ScopeReader;
use std::fmt;
use std::sync::Arc;

/// Injected into every install call.
pub struct InstallContext<D> {
    dependencies: Arc<D>,
    messenger: Messenger,
    scopes: ScopeReader,
}

impl<D> InstallContext<D> {
    pub(crate) fn new(dependencies: Arc<D>, messenger: Messenger, scopes: ScopeReader) -> Self {
        Self {
            dependencies,
            messenger,
            scopes,
        }
    }

    /// Id of the repository being installed.
    #[must_use]
    pub fn repository_id(&self) -> &str {
        self.messenger.owner()
    }

    /// The workspace-wide dependency bag.
    #[must_use]
    pub fn dependencies(&self) -> &D {
        &self.dependencies
    }

    /// Shared handle to the dependency bag, for repositories that keep it.
    #[must_use]
    pub fn shared_dependencies(&self) -> Arc<D> {
        self.dependencies.clone()
    }

    /// Messenger bound to this repository's id.
    #[must_use]
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Values provided by enclosing context providers.
    #[must_use]
    pub fn scopes(&self) -> &ScopeReader {
        &self.scopes
    }
}

impl<D> Clone for InstallContext<D> {
    fn clone(&self) -> Self {
        Self {
            dependencies: self.dependencies.clone(),
            messenger: self.messenger.clone(),
            scopes: self.scopes.clone(),
        }
    }
}

impl<D> fmt::Debug for InstallContext<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstallContext")
            .field("repository_id", &self.repository_id())
            .finish_non_exhaustive()
    }
}

//! # Workspace
//!
//! Holds one reference-counted entry per defined repository id and mediates
//! define/query operations. Each entry's install function receives the
//! shared dependency bag, a messenger bound to the repository id and a
//! reader over the workspace's context scopes.

use crate::adapters::Messenger;
use crate::domain::{
    InstallContext, LifecycleHook, MessageHook, RepositoryDescriptor, RepositoryStatus,
    WorkspaceConfig,
};
use crate::error::WorkspaceError;
use parking_lot::RwLock;
use rm_01_scope::{KeyedScope, ScopeReader, ScopeRegistry};
use rm_02_resource::{ReferenceCountedResource, Transition};
use rm_telemetry::{log_transition, repository_span, KernelMetrics};
use shared_bus::{EventRecord, InterceptorHandle, ScopedEventBus};
use shared_types::{HandlerError, Repository};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Producer side of a context scope created by [`Workspace::create_context`].
pub type ContextHandle<V> = KeyedScope<V>;

type Resource<D> = ReferenceCountedResource<InstallContext<D>, Arc<dyn Repository>, HandlerError>;

struct RepositoryEntry<D> {
    id: String,
    resource: Resource<D>,
    messenger: Messenger,
    on_connect: Option<LifecycleHook>,
    on_disconnect: Option<LifecycleHook>,
    on_message: Option<MessageHook>,
}

struct Entries<D> {
    by_id: HashMap<String, Arc<RepositoryEntry<D>>>,
    /// Ids in definition order.
    order: Vec<String>,
}

struct WorkspaceInner<D> {
    config: WorkspaceConfig,
    dependencies: Arc<D>,
    bus: ScopedEventBus,
    scopes: ScopeRegistry,
    entries: RwLock<Entries<D>>,
    metrics: KernelMetrics,
}

/// Registry of lazily-installed, reference-counted repositories.
///
/// Cloning is cheap and yields a handle to the same workspace.
pub struct Workspace<D> {
    inner: Arc<WorkspaceInner<D>>,
}

impl<D> Clone for Workspace<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Send + Sync + 'static> Workspace<D> {
    /// Create an empty workspace around a dependency bag.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::Metrics` if the metrics registry cannot be
    /// set up.
    pub fn new(config: WorkspaceConfig, dependencies: D) -> Result<Self, WorkspaceError> {
        Self::with_shared_dependencies(config, Arc::new(dependencies))
    }

    /// Same as [`Workspace::new`] for a bag that is already shared.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::Metrics` if the metrics registry cannot be
    /// set up.
    pub fn with_shared_dependencies(
        config: WorkspaceConfig,
        dependencies: Arc<D>,
    ) -> Result<Self, WorkspaceError> {
        Ok(Self {
            inner: Arc::new(WorkspaceInner {
                config,
                dependencies,
                bus: ScopedEventBus::new(),
                scopes: ScopeRegistry::new(),
                entries: RwLock::new(Entries {
                    by_id: HashMap::new(),
                    order: Vec::new(),
                }),
                metrics: KernelMetrics::new()?,
            }),
        })
    }

    /// Define a repository. The first definition of an id wins; later ones
    /// are logged and ignored. Returns whether the descriptor was stored.
    pub fn define_repository(&self, descriptor: RepositoryDescriptor<D>) -> bool {
        let RepositoryDescriptor {
            id,
            install,
            middlewares,
            on_connect,
            on_disconnect,
            on_message,
        } = descriptor;

        {
            let mut entries = self.inner.entries.write();
            if entries.by_id.contains_key(&id) {
                drop(entries);
                warn!(
                    workspace = %self.inner.config.id,
                    repository = %id,
                    "Repository already defined, definition ignored"
                );
                return false;
            }

            let messenger = Messenger::new(id.clone(), self.inner.bus.clone());
            let context = InstallContext::new(
                self.inner.dependencies.clone(),
                messenger.clone(),
                self.inner.scopes.reader(),
            );
            let resource = ReferenceCountedResource::new(
                move |context: &InstallContext<D>| {
                    let _span = repository_span!("install", context.repository_id()).entered();
                    let raw = install(context.clone())?;
                    Ok(middlewares.apply(raw))
                },
                context,
            );

            entries.order.push(id.clone());
            entries.by_id.insert(
                id.clone(),
                Arc::new(RepositoryEntry {
                    id: id.clone(),
                    resource,
                    messenger,
                    on_connect,
                    on_disconnect,
                    on_message,
                }),
            );
        }

        self.inner.metrics.record_defined();
        self.inner.log_transition("repository.define", &id);
        true
    }

    /// Connect to a repository, installing it on the first connection.
    ///
    /// # Errors
    ///
    /// - `WorkspaceError::NotFound` if `id` was never defined
    /// - `WorkspaceError::Install` if the install function failed; the
    ///   repository stays disconnected and anything it subscribed through its
    ///   messenger is dropped
    /// - `WorkspaceError::Subscribe` if the message hook failed while
    ///   catching up on pending messages; the connection is rolled back
    pub fn query_repository(&self, id: &str) -> Result<QueryResult, WorkspaceError> {
        let entry = self.inner.entry(id).ok_or_else(|| WorkspaceError::NotFound {
            id: id.to_string(),
        })?;

        let (transition, repository) = match entry.resource.acquire() {
            Ok(acquired) => acquired,
            Err(source) => {
                // Whatever the failed install subscribed must not outlive it.
                if !entry.resource.is_connected() {
                    entry.messenger.close();
                }
                return Err(WorkspaceError::Install {
                    id: id.to_string(),
                    source,
                });
            }
        };
        self.inner.metrics.record_connect(transition.is_created());

        if transition.is_created() {
            if let Err(e) = attach_message_hook(&entry, &repository) {
                let rollback = entry.resource.disconnect();
                self.inner.metrics.record_disconnect(rollback.is_destroyed());
                if rollback.is_destroyed() {
                    entry.messenger.close();
                }
                return Err(e);
            }
            if let Some(hook) = &entry.on_connect {
                hook();
            }
        }
        self.inner.log_transition("repository.connect", id);

        let inner = self.inner.clone();
        Ok(QueryResult {
            repository,
            release: Box::new(move || inner.release(&entry)),
            released: AtomicBool::new(false),
        })
    }

    /// Whether `id` has been defined.
    #[must_use]
    pub fn has_repository(&self, id: &str) -> bool {
        self.inner.entries.read().by_id.contains_key(id)
    }

    /// Every defined repository with its connection count, in definition order.
    #[must_use]
    pub fn all_repositories(&self) -> Vec<RepositoryStatus> {
        self.inner.all_repositories()
    }

    /// Connection count of `id`, or `None` if it is not defined.
    #[must_use]
    pub fn connections(&self, id: &str) -> Option<usize> {
        self.inner.entry(id).map(|entry| entry.resource.connections())
    }

    /// Declare a context scope whose values install functions can read
    /// through [`InstallContext::scopes`].
    pub fn create_context<V>(&self, id: impl Into<String>, default_value: V) -> ContextHandle<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        self.inner.scopes.scope(id, default_value)
    }

    /// Read access to the context scopes.
    #[must_use]
    pub fn scopes(&self) -> ScopeReader {
        self.inner.scopes.reader()
    }

    /// Append an interceptor for messages or other events named `event_name`.
    pub fn intercept<F>(&self, event_name: impl Into<String>, transform: F) -> InterceptorHandle
    where
        F: Fn(EventRecord) -> Option<EventRecord> + Send + Sync + 'static,
    {
        self.inner.bus.intercept(event_name, transform)
    }

    /// A messenger speaking for `owner`, for code outside any repository.
    pub fn messenger(&self, owner: impl Into<String>) -> Messenger {
        Messenger::new(owner, self.inner.bus.clone())
    }

    /// The bus shared by every messenger of this workspace.
    #[must_use]
    pub fn bus(&self) -> &ScopedEventBus {
        &self.inner.bus
    }

    #[must_use]
    pub fn metrics(&self) -> &KernelMetrics {
        &self.inner.metrics
    }

    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.inner.config
    }

    /// The dependency bag handed to every install function.
    #[must_use]
    pub fn dependencies(&self) -> &D {
        &self.inner.dependencies
    }
}

impl<D> WorkspaceInner<D> {
    fn entry(&self, id: &str) -> Option<Arc<RepositoryEntry<D>>> {
        self.entries.read().by_id.get(id).cloned()
    }

    fn all_repositories(&self) -> Vec<RepositoryStatus> {
        let entries = self.entries.read();
        entries
            .order
            .iter()
            .filter_map(|id| entries.by_id.get(id))
            .map(|entry| RepositoryStatus {
                id: entry.id.clone(),
                connections: entry.resource.connections(),
            })
            .collect()
    }

    fn release(&self, entry: &RepositoryEntry<D>) -> Transition {
        let transition = entry.resource.disconnect();
        if transition == Transition::Ignored {
            return transition;
        }
        self.metrics.record_disconnect(transition.is_destroyed());

        if transition.is_destroyed() {
            entry.messenger.close();
            if let Some(hook) = &entry.on_disconnect {
                hook();
            }
        }
        self.log_transition("repository.disconnect", &entry.id);
        transition
    }

    /// Info with repository metadata when logging is on, debug otherwise.
    fn log_transition(&self, action: &'static str, id: &str) {
        let connections = self.entry(id).map_or(0, |entry| entry.resource.connections());
        let repositories = self.config.logging.then(|| self.all_repositories());
        log_transition!(
            self.config.logging,
            action,
            id,
            workspace = %self.config.id,
            connections,
            repositories = ?repositories
        );
    }
}

/// Subscribe the entry's message hook, if any, on behalf of `repository`.
fn attach_message_hook<D>(
    entry: &RepositoryEntry<D>,
    repository: &Arc<dyn Repository>,
) -> Result<(), WorkspaceError> {
    let Some(hook) = entry.on_message.clone() else {
        return Ok(());
    };
    let target = Arc::downgrade(repository);
    entry
        .messenger
        .attach_hook(move |message| match target.upgrade() {
            Some(repository) => hook(message, repository.as_ref()),
            None => Ok(()),
        })
        .map_err(|source| WorkspaceError::Subscribe {
            id: entry.id.clone(),
            source,
        })?;
    Ok(())
}

impl<D> fmt::Debug for Workspace<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("config", &self.inner.config)
            .field("repositories", &self.inner.all_repositories())
            .finish()
    }
}

/// A live connection to a repository.
///
/// Dropping the result does not disconnect; call [`QueryResult::disconnect`].
pub struct QueryResult {
    repository: Arc<dyn Repository>,
    release: Box<dyn Fn() -> Transition + Send + Sync>,
    released: AtomicBool,
}

impl QueryResult {
    /// The middleware-wrapped repository, shared by every current connection.
    #[must_use]
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Close this connection. Only the first call has an effect; later calls
    /// return `Transition::Ignored`.
    pub fn disconnect(&self) -> Transition {
        if self.released.swap(true, Ordering::AcqRel) {
            return Transition::Ignored;
        }
        (self.release)()
    }

    /// Whether [`QueryResult::disconnect`] has been called.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("repository", &self.repository)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

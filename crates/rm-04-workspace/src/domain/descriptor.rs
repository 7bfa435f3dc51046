//! Repository descriptors: everything `define_repository` needs to know.

use crate::domain::InstallContext;
use rm_03_middleware::{Middleware, MiddlewareChain};
use shared_types::{HandlerError, Message, Repository};
use std::fmt;
use std::sync::Arc;

/// Builds the repository value on a 0→1 transition.
pub type InstallFn<D> =
    Arc<dyn Fn(InstallContext<D>) -> Result<Arc<dyn Repository>, HandlerError> + Send + Sync>;

/// Side effect run on a lifecycle transition.
pub type LifecycleHook = Arc<dyn Fn() + Send + Sync>;

/// Receives messages addressed to the repository while it is connected.
pub type MessageHook = Arc<dyn Fn(&Message, &dyn Repository) -> Result<(), HandlerError> + Send + Sync>;

/// Declaration of one repository.
pub struct RepositoryDescriptor<D> {
    pub(crate) id: String,
    pub(crate) install: InstallFn<D>,
    pub(crate) middlewares: MiddlewareChain,
    pub(crate) on_connect: Option<LifecycleHook>,
    pub(crate) on_disconnect: Option<LifecycleHook>,
    pub(crate) on_message: Option<MessageHook>,
}

impl<D> RepositoryDescriptor<D> {
    pub fn new<F>(id: impl Into<String>, install: F) -> Self
    where
        F: Fn(InstallContext<D>) -> Result<Arc<dyn Repository>, HandlerError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            install: Arc::new(install),
            middlewares: MiddlewareChain::new(),
            on_connect: None,
            on_disconnect: None,
            on_message: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append one middleware to the chain wrapping the installed value.
    #[must_use]
    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middlewares.push(middleware);
        self
    }

    /// Replace the whole middleware chain.
    #[must_use]
    pub fn middlewares(mut self, chain: impl Into<MiddlewareChain>) -> Self {
        self.middlewares = chain.into();
        self
    }

    /// Run `hook` after each 0→1 transition.
    #[must_use]
    pub fn on_connect(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(hook));
        self
    }

    /// Run `hook` after each 1→0 transition.
    #[must_use]
    pub fn on_disconnect(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(hook));
        self
    }

    /// Deliver messages addressed to this repository to `hook` while it is
    /// connected.
    #[must_use]
    pub fn on_message<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Message, &dyn Repository) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.on_message = Some(Arc::new(hook));
        self
    }
}

impl<D> fmt::Debug for RepositoryDescriptor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryDescriptor")
            .field("id", &self.id)
            .field("middlewares", &self.middlewares.len())
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

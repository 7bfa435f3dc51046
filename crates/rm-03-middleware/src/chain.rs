//! # Method Middleware Chain
//!
//! Onion-style interception of repository methods. Middleware 0 wraps
//! middleware 1 wraps ... wraps the real method. Each link sees the method
//! name and the arguments it was called with, and receives a [`Next`]
//! continuation it may run (optionally with replacement arguments) or skip
//! to short-circuit the call.

use shared_types::{Args, MethodError, Payload, Repository};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// One link of the chain.
pub type Middleware = Arc<dyn Fn(&str, &Args, Next<'_>) -> Result<Payload, MethodError> + Send + Sync>;

/// Wrap a closure as a [`Middleware`].
pub fn middleware<F>(f: F) -> Middleware
where
    F: Fn(&str, &Args, Next<'_>) -> Result<Payload, MethodError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Continuation handed to each middleware.
pub struct Next<'a> {
    method: &'a str,
    args: &'a Args,
    rest: &'a [Middleware],
    target: &'a dyn Repository,
}

impl Next<'_> {
    /// Continue with the arguments this link received.
    pub fn proceed(self) -> Result<Payload, MethodError> {
        dispatch(self.method, self.args.clone(), self.rest, self.target)
    }

    /// Continue with replacement arguments. Every later link and the real
    /// method see `args`.
    pub fn proceed_with(self, args: Args) -> Result<Payload, MethodError> {
        dispatch(self.method, args, self.rest, self.target)
    }

    /// Number of links still ahead, excluding the real method.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

fn dispatch(
    method: &str,
    args: Args,
    chain: &[Middleware],
    target: &dyn Repository,
) -> Result<Payload, MethodError> {
    let Some((link, rest)) = chain.split_first() else {
        return target.call(method, args);
    };
    link(
        method,
        &args,
        Next {
            method,
            args: &args,
            rest,
            target,
        },
    )
}

/// A repository whose methods run through a middleware chain.
///
/// Callable members are enumerated once, when the wrapper is built. Calls to
/// any other name, and all property reads, go straight to the target.
pub struct Wrapped {
    target: Arc<dyn Repository>,
    middlewares: Arc<[Middleware]>,
    methods: Vec<&'static str>,
    intercepted: HashSet<&'static str>,
}

impl Wrapped {
    fn new(target: Arc<dyn Repository>, middlewares: Arc<[Middleware]>) -> Self {
        let methods = target.methods();
        let intercepted = methods.iter().copied().collect();
        Self {
            target,
            middlewares,
            methods,
            intercepted,
        }
    }

    /// The unwrapped repository.
    #[must_use]
    pub fn target(&self) -> &Arc<dyn Repository> {
        &self.target
    }
}

impl Repository for Wrapped {
    fn methods(&self) -> Vec<&'static str> {
        self.methods.clone()
    }

    fn call(&self, method: &str, args: Args) -> Result<Payload, MethodError> {
        if !self.intercepted.contains(method) {
            return self.target.call(method, args);
        }
        dispatch(method, args, &self.middlewares, self.target.as_ref())
    }

    fn property(&self, name: &str) -> Option<Payload> {
        self.target.property(name)
    }
}

impl fmt::Debug for Wrapped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("methods", &self.methods)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

/// Wrap `target` so each of its methods flows through `middlewares`.
///
/// With no middleware, `target` is returned unchanged.
pub fn apply_middleware(target: Arc<dyn Repository>, middlewares: &[Middleware]) -> Arc<dyn Repository> {
    if middlewares.is_empty() {
        return target;
    }
    Arc::new(Wrapped::new(target, middlewares.into()))
}

/// An ordered, reusable list of middleware.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    links: Vec<Middleware>,
}

impl MiddlewareChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a link. Links run in the order they were added.
    #[must_use]
    pub fn with(mut self, link: Middleware) -> Self {
        self.links.push(link);
        self
    }

    /// Append a link in place.
    pub fn push(&mut self, link: Middleware) {
        self.links.push(link);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Wrap `target` with this chain.
    pub fn apply(&self, target: Arc<dyn Repository>) -> Arc<dyn Repository> {
        apply_middleware(target, &self.links)
    }

    /// The links, in order.
    #[must_use]
    pub fn links(&self) -> &[Middleware] {
        &self.links
    }
}

impl From<Vec<Middleware>> for MiddlewareChain {
    fn from(links: Vec<Middleware>) -> Self {
        Self { links }
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("links", &self.links.len())
            .finish()
    }
}

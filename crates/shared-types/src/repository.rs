//! # Repository Trait
//!
//! Defines the contract every resource value managed by a workspace
//! implements, so that it can be invoked dynamically by name and wrapped by
//! the method middleware chain.
//!
//! ## Example Implementation
//!
//! ```rust,ignore
//! use shared_types::{Args, MethodError, Payload, Repository};
//!
//! struct Counter { value: parking_lot::Mutex<i64> }
//!
//! impl Repository for Counter {
//!     fn methods(&self) -> Vec<&'static str> { vec!["increment"] }
//!     fn call(&self, method: &str, args: Args) -> Result<Payload, MethodError> {
//!         match method {
//!             "increment" => { *self.value.lock() += 1; Ok(Payload::Null) }
//!             _ => Err(MethodError::UnknownMethod { method: method.into() }),
//!         }
//!     }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::errors::MethodError;
use crate::Payload;

/// Positional method arguments.
pub type Args = Vec<Payload>;

/// A resource value that exposes named operations.
pub trait Repository: Send + Sync {
    /// Names of all callable members.
    fn methods(&self) -> Vec<&'static str>;

    /// Invoke a callable member.
    fn call(&self, method: &str, args: Args) -> Result<Payload, MethodError>;

    /// Read a non-callable member. Defaults to none.
    fn property(&self, _name: &str) -> Option<Payload> {
        None
    }
}

impl fmt::Debug for dyn Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("methods", &self.methods())
            .finish()
    }
}

type MethodFn = Arc<dyn Fn(Args) -> Result<Payload, MethodError> + Send + Sync>;

/// A `Repository` assembled from closures.
///
/// Convenient for repositories whose state lives in captured `Arc`s.
#[derive(Default, Clone)]
pub struct MethodTable {
    methods: BTreeMap<&'static str, MethodFn>,
    properties: BTreeMap<String, Payload>,
}

impl MethodTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable member.
    #[must_use]
    pub fn method<F>(mut self, name: &'static str, f: F) -> Self
    where
        F: Fn(Args) -> Result<Payload, MethodError> + Send + Sync + 'static,
    {
        self.methods.insert(name, Arc::new(f));
        self
    }

    /// Register a non-callable member.
    #[must_use]
    pub fn property(mut self, name: impl Into<String>, value: Payload) -> Self {
        self.properties.insert(name.into(), value);
        self
    }
}

impl Repository for MethodTable {
    fn methods(&self) -> Vec<&'static str> {
        self.methods.keys().copied().collect()
    }

    fn call(&self, method: &str, args: Args) -> Result<Payload, MethodError> {
        let Some(f) = self.methods.get(method) else {
            return Err(MethodError::UnknownMethod {
                method: method.to_string(),
            });
        };
        f(args)
    }

    fn property(&self, name: &str) -> Option<Payload> {
        self.properties.get(name).cloned()
    }
}

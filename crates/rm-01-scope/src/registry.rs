//! # Keyed Scope Registry
//!
//! Many named scopes holding values of arbitrary types, owned by one
//! long-lived context (a workspace). Producers push through a
//! [`KeyedScope`]; consumers read through a [`ScopeReader`] without knowing
//! who provided the value.

use crate::frame::FrameGuard;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, trace};

type Frame = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    stacks: RwLock<HashMap<String, Arc<Mutex<Vec<Frame>>>>>,
}

impl RegistryInner {
    fn stack(&self, id: &str) -> Arc<Mutex<Vec<Frame>>> {
        if let Some(stack) = self.stacks.read().get(id) {
            return stack.clone();
        }
        self.stacks
            .write()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Innermost frame of stack `id` holding a `V`.
    fn innermost<V: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<V>> {
        let stacks = self.stacks.read();
        let stack = stacks.get(id)?.lock();
        let found = stack
            .iter()
            .rev()
            .find_map(|frame| frame.clone().downcast::<V>().ok());
        found
    }
}

/// Named stacks of type-erased values.
///
/// Clones share the same stacks.
#[derive(Clone, Default)]
pub struct ScopeRegistry {
    inner: Arc<RegistryInner>,
}

impl ScopeRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `body` with `value` pushed onto the stack named `id`.
    pub fn provide<V, R>(&self, id: &str, value: V, body: impl FnOnce() -> R) -> R
    where
        V: Send + Sync + 'static,
    {
        let stack = self.inner.stack(id);
        let _frame = FrameGuard::push(&stack, Arc::new(value) as Frame);
        trace!(scope = id, "Scope frame pushed");
        body()
    }

    /// Innermost value of type `V` on the stack named `id`. Frames of other
    /// types are skipped.
    #[must_use]
    pub fn current<V: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<V>> {
        let value = self.inner.innermost::<V>(id);
        if value.is_none() && self.depth(id) > 0 {
            debug!(scope = id, "No scope value of the requested type");
        }
        value
    }

    /// Number of active frames on the stack named `id`.
    #[must_use]
    pub fn depth(&self, id: &str) -> usize {
        self.inner
            .stacks
            .read()
            .get(id)
            .map_or(0, |stack| stack.lock().len())
    }

    /// Declare a typed scope with a default value.
    pub fn scope<V>(&self, id: impl Into<String>, default_value: V) -> KeyedScope<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        KeyedScope {
            id: id.into(),
            default_value,
            registry: self.clone(),
        }
    }

    /// Read-only view of this registry.
    #[must_use]
    pub fn reader(&self) -> ScopeReader {
        ScopeReader {
            registry: self.clone(),
        }
    }
}

/// A typed, named scope inside a [`ScopeRegistry`].
#[derive(Clone)]
pub struct KeyedScope<V> {
    id: String,
    default_value: V,
    registry: ScopeRegistry,
}

impl<V> KeyedScope<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Run `body` with `value` (or the default when `None`) on top of this scope.
    pub fn provider<R>(&self, value: Option<V>, body: impl FnOnce() -> R) -> R {
        let value = value.unwrap_or_else(|| self.default_value.clone());
        self.registry.provide(&self.id, value, body)
    }

    /// Innermost provided value, or the default.
    #[must_use]
    pub fn current_value(&self) -> V {
        self.registry
            .current::<V>(&self.id)
            .map_or_else(|| self.default_value.clone(), |v| V::clone(&v))
    }

    /// Name of the scope.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reader handle typed for this scope.
    #[must_use]
    pub fn key(&self) -> ScopeKey<V> {
        ScopeKey {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

/// Typed name of a scope, for reading through a [`ScopeReader`].
#[derive(Debug)]
pub struct ScopeKey<V> {
    id: String,
    _marker: PhantomData<fn() -> V>,
}

impl<V> Clone for ScopeKey<V> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            _marker: PhantomData,
        }
    }
}

impl<V> ScopeKey<V> {
    /// Typed key for the scope named `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Read accessor bound to the frames currently on a registry.
#[derive(Clone)]
pub struct ScopeReader {
    registry: ScopeRegistry,
}

impl ScopeReader {
    /// Innermost value of type `V` in the scope named `id`.
    #[must_use]
    pub fn current<V: Send + Sync + 'static>(&self, id: &str) -> Option<Arc<V>> {
        self.registry.current::<V>(id)
    }

    /// Innermost value of a typed scope key.
    #[must_use]
    pub fn get<V: Send + Sync + 'static>(&self, key: &ScopeKey<V>) -> Option<Arc<V>> {
        self.registry.current::<V>(&key.id)
    }
}

//! # Reference-Counted Resource
//!
//! Wraps a factory with connect/disconnect semantics: the value is built on
//! the 0→1 transition, shared while at least one connection is open and
//! dropped on the 1→0 transition.

use parking_lot::Mutex;
use std::convert::Infallible;
use std::fmt;
use tracing::{trace, warn};

/// Builds the resource value from its dependencies.
pub type Factory<D, R, E> = Box<dyn Fn(&D) -> Result<R, E> + Send + Sync>;

/// What a `connect` or `disconnect` call did to the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// 0→1: the factory ran and the value was stored.
    Created,
    /// n→n+1 with n ≥ 1: the existing value is shared.
    Shared,
    /// n→n-1 with n ≥ 2: the value stays alive.
    Released,
    /// 1→0: the value was dropped.
    Destroyed,
    /// Disconnect with no open connection.
    Ignored,
}

impl Transition {
    #[must_use]
    pub fn is_created(self) -> bool {
        self == Self::Created
    }

    #[must_use]
    pub fn is_destroyed(self) -> bool {
        self == Self::Destroyed
    }
}

/// A built value and the connections sharing it.
struct Live<R> {
    value: R,
    /// Always at least 1.
    connections: usize,
}

/// A lazily-built, shared value with a connection counter.
///
/// The value exists exactly while at least one connection is open: the state
/// is either empty or holds the value together with its count.
pub struct ReferenceCountedResource<D, R, E = Infallible> {
    factory: Factory<D, R, E>,
    dependencies: D,
    slot: Mutex<Option<Live<R>>>,
}

impl<D, R, E> ReferenceCountedResource<D, R, E> {
    /// Create a resource with no open connections.
    pub fn new<F>(factory: F, dependencies: D) -> Self
    where
        F: Fn(&D) -> Result<R, E> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            dependencies,
            slot: Mutex::new(None),
        }
    }

    /// Open a connection, building the value if this is the first one.
    ///
    /// The factory runs without any lock held, so it may connect other
    /// resources. If a re-entrant call built the value first, the fresh
    /// value is discarded and the existing one is shared.
    ///
    /// # Errors
    ///
    /// Returns the factory error; the counter is left unchanged.
    pub fn connect(&self) -> Result<Transition, E> {
        self.open(|_| ()).map(|(transition, ())| transition)
    }

    /// Shared body of `connect` and `acquire`: `read` sees the value while
    /// the connection is being registered.
    fn open<T>(&self, read: impl FnOnce(&R) -> T) -> Result<(Transition, T), E> {
        {
            let mut slot = self.slot.lock();
            if let Some(live) = slot.as_mut() {
                live.connections += 1;
                trace!(connections = live.connections, "Resource shared");
                return Ok((Transition::Shared, read(&live.value)));
            }
        }

        let built = (self.factory)(&self.dependencies)?;

        let mut slot = self.slot.lock();
        if let Some(live) = slot.as_mut() {
            live.connections += 1;
            trace!(connections = live.connections, "Resource built concurrently, sharing existing");
            let seen = read(&live.value);
            drop(slot);
            drop(built);
            return Ok((Transition::Shared, seen));
        }
        let seen = read(&built);
        *slot = Some(Live {
            value: built,
            connections: 1,
        });
        trace!("Resource created");
        Ok((Transition::Created, seen))
    }

    /// Close a connection, dropping the value when the last one closes.
    ///
    /// Extra calls with no open connection are ignored.
    pub fn disconnect(&self) -> Transition {
        let released = {
            let mut slot = self.slot.lock();
            let Some(live) = slot.as_mut() else {
                warn!("Disconnect without an open connection ignored");
                return Transition::Ignored;
            };
            if live.connections > 1 {
                live.connections -= 1;
                trace!(connections = live.connections, "Resource released");
                return Transition::Released;
            }
            slot.take()
        };
        // The value is dropped outside the lock.
        drop(released);
        trace!("Resource destroyed");
        Transition::Destroyed
    }

    /// Number of open connections.
    #[must_use]
    pub fn connections(&self) -> usize {
        self.slot.lock().as_ref().map_or(0, |live| live.connections)
    }

    /// Whether the value is currently built.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Dependencies handed to the factory.
    #[must_use]
    pub fn dependencies(&self) -> &D {
        &self.dependencies
    }
}

impl<D, R: Clone, E> ReferenceCountedResource<D, R, E> {
    /// The current value, absent while no connection is open.
    #[must_use]
    pub fn reference(&self) -> Option<R> {
        self.slot.lock().as_ref().map(|live| live.value.clone())
    }

    /// Open a connection and return the value it shares.
    ///
    /// # Errors
    ///
    /// Returns the factory error; the counter is left unchanged.
    pub fn acquire(&self) -> Result<(Transition, R), E> {
        self.open(R::clone)
    }
}

impl<D, R, E> fmt::Debug for ReferenceCountedResource<D, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("ReferenceCountedResource")
            .field("connections", &slot.as_ref().map_or(0, |live| live.connections))
            .field("built", &slot.is_some())
            .finish()
    }
}

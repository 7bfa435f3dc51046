//! # Typed Scope Stack
//!
//! A single dynamically-scoped value: `provider` pushes a frame for the
//! duration of a callback and every read performed while the callback runs
//! observes the innermost frame.

use crate::frame::FrameGuard;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::trace;

/// Create a scope whose reads fall back to `default_value`.
pub fn create_scope<V: Clone>(default_value: V) -> Scope<V> {
    Scope::new(default_value)
}

/// A stack of values of one type.
///
/// Clones share the same stack. Reads are valid for synchronous,
/// single-threaded nesting; concurrent providers on the same scope from
/// different threads would interleave their frames.
#[derive(Clone)]
pub struct Scope<V> {
    default_value: V,
    frames: Arc<Mutex<Vec<V>>>,
}

impl<V: Clone> Scope<V> {
    /// Create an empty scope.
    pub fn new(default_value: V) -> Self {
        Self {
            default_value,
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Run `body` with `value` (or the default when `None`) on top of the stack.
    ///
    /// The frame is popped when `body` returns or unwinds.
    pub fn provider<R>(&self, value: Option<V>, body: impl FnOnce() -> R) -> R {
        let value = value.unwrap_or_else(|| self.default_value.clone());
        let _frame = FrameGuard::push(&self.frames, value);
        trace!(depth = self.depth(), "Scope frame pushed");
        body()
    }

    /// Innermost provided value, or the default when no provider is active.
    #[must_use]
    pub fn current_value(&self) -> V {
        self.frames
            .lock()
            .last()
            .cloned()
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// The value used when no provider is active.
    #[must_use]
    pub fn default_value(&self) -> &V {
        &self.default_value
    }

    /// Number of active frames.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

//! # Interceptors
//!
//! Ordered per-event-name transforms that run before delivery. Each link
//! receives the record produced by the previous one and either passes a
//! (possibly rewritten) record on or vetoes delivery by returning `None`.

use crate::events::EventRecord;
use crate::publisher::{BusInner, InterceptorEntry, ScopedEventBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Handle for one interceptor registration.
pub struct InterceptorHandle {
    event_name: String,
    id: u64,
    bus: Weak<BusInner>,
    removed: AtomicBool,
}

impl InterceptorHandle {
    /// Remove exactly this registration. Idempotent.
    pub fn remove(&self) {
        if self.removed.swap(true, Ordering::AcqRel) {
            return;
        }
        let Some(bus) = self.bus.upgrade() else {
            return;
        };
        let mut state = bus.state.lock();
        if let Some(chain) = state.interceptors.get_mut(&self.event_name) {
            chain.retain(|i| i.id != self.id);
            if chain.is_empty() {
                state.interceptors.remove(&self.event_name);
            }
        }
        debug!(event_name = %self.event_name, "Interceptor removed");
    }

    /// Event name the interceptor is registered for.
    #[must_use]
    pub fn event_name(&self) -> &str {
        &self.event_name
    }
}

impl ScopedEventBus {
    /// Append `transform` to the chain for `event_name`.
    ///
    /// The chain applies to every scope publishing that event name.
    pub fn intercept<F>(&self, event_name: impl Into<String>, transform: F) -> InterceptorHandle
    where
        F: Fn(EventRecord) -> Option<EventRecord> + Send + Sync + 'static,
    {
        let event_name = event_name.into();
        let id = {
            let mut state = self.inner.state.lock();
            let id = state.allocate_id();
            state
                .interceptors
                .entry(event_name.clone())
                .or_default()
                .push(InterceptorEntry {
                    id,
                    transform: Arc::new(transform),
                });
            id
        };
        debug!(event_name = %event_name, "Interceptor registered");

        InterceptorHandle {
            event_name,
            id,
            bus: Arc::downgrade(&self.inner),
            removed: AtomicBool::new(false),
        }
    }
}

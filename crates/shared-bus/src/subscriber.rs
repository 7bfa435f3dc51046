//! # Event Subscriber
//!
//! Defines the subscription side of the scoped bus, including catch-up
//! replay for subscribers that join late.

use crate::error::BusError;
use crate::events::{EventRecord, StreamKey, SubscribeOptions};
use crate::publisher::{run_chain, BusInner, ScopedEventBus, SubscriberEntry};
use shared_types::HandlerError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};

/// A subscription handle.
///
/// Dropping the handle does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    key: StreamKey,
    entry: Option<Arc<SubscriberEntry>>,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// A handle that was never registered (double-subscribe guard).
    fn inert(key: StreamKey) -> Self {
        Self {
            key,
            entry: None,
            bus: Weak::new(),
        }
    }

    /// Deactivate the subscription. Safe to call any number of times.
    pub fn unsubscribe(&self) {
        let Some(entry) = &self.entry else {
            return;
        };
        if !entry.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(bus) = self.bus.upgrade() {
            let mut state = bus.state.lock();
            if let Some(stream) = state.streams.get_mut(&self.key) {
                stream.subscribers.retain(|s| s.id != entry.id);
            }
        }
        debug!(scope = %self.key.scope, event_name = %self.key.event_name, "Subscription removed");
    }

    /// Whether callbacks are still delivered to this subscription.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|e| e.active.load(Ordering::Acquire))
    }

    /// Stream this subscription listens to.
    #[must_use]
    pub fn key(&self) -> &StreamKey {
        &self.key
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("key", &self.key)
            .field("active", &self.is_active())
            .finish()
    }
}

impl ScopedEventBus {
    /// Subscribe `callback` to `(scope, event_name)`.
    ///
    /// With `owner` set, a second live subscription from the same owner to the
    /// same stream is refused with a warning and an inactive handle is
    /// returned. With `from_beginning`, every record of the stream that no
    /// subscriber has acknowledged yet is replayed to `callback`, in sequence
    /// order, before this call returns. Replay runs each record through the
    /// current interceptor chain, so a veto still drops it.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Handler` if `callback` fails during replay. The
    /// subscription is removed in that case.
    pub fn subscribe<F>(&self, options: SubscribeOptions, callback: F) -> Result<Subscription, BusError>
    where
        F: Fn(&EventRecord) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let key = options.key();
        let entry = {
            let mut state = self.inner.state.lock();
            let duplicate = options.owner.as_ref().is_some_and(|owner| {
                state.streams.get(&key).is_some_and(|stream| {
                    stream.subscribers.iter().any(|s| {
                        s.active.load(Ordering::Acquire) && s.owner.as_ref() == Some(owner)
                    })
                })
            });
            if duplicate {
                warn!(
                    owner = ?options.owner,
                    scope = %key.scope,
                    event_name = %key.event_name,
                    "Already subscribed, second subscription ignored"
                );
                return Ok(Subscription::inert(key));
            }

            let entry = Arc::new(SubscriberEntry {
                id: state.allocate_id(),
                owner: options.owner.clone(),
                callback: Arc::new(callback),
                active: AtomicBool::new(true),
            });
            state
                .streams
                .entry(key.clone())
                .or_default()
                .subscribers
                .push(entry.clone());
            entry
        };

        debug!(scope = %key.scope, event_name = %key.event_name, "New subscription created");

        let subscription = Subscription {
            key,
            entry: Some(entry.clone()),
            bus: Arc::downgrade(&self.inner),
        };

        if options.from_beginning {
            if let Err(e) = self.replay(&subscription.key, &entry) {
                subscription.unsubscribe();
                return Err(e);
            }
        }

        Ok(subscription)
    }

    /// Deliver unacknowledged history of `key` to one subscriber.
    fn replay(&self, key: &StreamKey, entry: &SubscriberEntry) -> Result<usize, BusError> {
        let (pending, chain) = {
            let state = self.inner.state.lock();
            let pending: Vec<EventRecord> = state
                .streams
                .get(key)
                .map(|stream| {
                    stream
                        .records
                        .iter()
                        .filter(|r| !r.acknowledged)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            (pending, state.chain_for(&key.event_name))
        };

        let mut replayed = 0;
        for record in pending {
            if !entry.active.load(Ordering::Acquire) {
                break;
            }
            let Some(record) = run_chain(&chain, record) else {
                continue;
            };
            (entry.callback)(&record).map_err(|source| BusError::Handler {
                scope: key.scope.clone(),
                event_name: key.event_name.clone(),
                sequence: record.sequence,
                source,
            })?;
            self.inner.state.lock().mark_acknowledged(key, record.sequence);
            replayed += 1;
        }

        if replayed > 0 {
            debug!(scope = %key.scope, event_name = %key.event_name, replayed, "Replayed history");
        }
        Ok(replayed)
    }
}

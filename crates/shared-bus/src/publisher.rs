//! # Event Publisher
//!
//! Defines the publishing side of the scoped bus and the shared state that
//! subscriptions and interceptors hang off.

use crate::error::BusError;
use crate::events::{EventRecord, PublishOutcome, PublishRequest, StreamKey};
use parking_lot::Mutex;
use shared_types::HandlerError;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace, warn};

pub(crate) type Callback = Arc<dyn Fn(&EventRecord) -> Result<(), HandlerError> + Send + Sync>;
pub(crate) type Transform = Arc<dyn Fn(EventRecord) -> Option<EventRecord> + Send + Sync>;

/// A registered subscriber.
pub(crate) struct SubscriberEntry {
    pub(crate) id: u64,
    pub(crate) owner: Option<String>,
    pub(crate) callback: Callback,
    pub(crate) active: AtomicBool,
}

/// A registered interceptor.
pub(crate) struct InterceptorEntry {
    pub(crate) id: u64,
    pub(crate) transform: Transform,
}

/// History and subscribers of one `(scope, event_name)` stream.
#[derive(Default)]
pub(crate) struct Stream {
    /// Index `i` holds sequence `i + 1`.
    pub(crate) records: Vec<EventRecord>,
    /// In registration order.
    pub(crate) subscribers: Vec<Arc<SubscriberEntry>>,
    /// Set while an outer `publish` is delivering on this stream.
    pub(crate) delivering: bool,
    /// Records published re-entrantly during delivery, in sequence order.
    pub(crate) pending: VecDeque<EventRecord>,
}

#[derive(Default)]
pub(crate) struct BusState {
    pub(crate) streams: HashMap<StreamKey, Stream>,
    /// Interceptor chains keyed by event name, in registration order.
    pub(crate) interceptors: HashMap<String, Vec<InterceptorEntry>>,
    next_id: u64,
}

impl BusState {
    pub(crate) fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    pub(crate) fn chain_for(&self, event_name: &str) -> Vec<Transform> {
        self.interceptors
            .get(event_name)
            .map(|chain| chain.iter().map(|i| i.transform.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn mark_acknowledged(&mut self, key: &StreamKey, sequence: u64) {
        let Some(stream) = self.streams.get_mut(key) else {
            return;
        };
        let Some(index) = usize::try_from(sequence).ok().and_then(|s| s.checked_sub(1)) else {
            return;
        };
        if let Some(record) = stream.records.get_mut(index) {
            record.acknowledged = true;
        }
    }
}

pub(crate) struct BusInner {
    pub(crate) state: Mutex<BusState>,
    events_published: AtomicU64,
}

/// In-memory publish/subscribe bus keyed by `(scope, event_name)`.
///
/// Cloning is cheap and yields a handle to the same bus. All operations are
/// synchronous; no lock is held while user callbacks run, so subscribers,
/// interceptors and replay callbacks may publish or subscribe re-entrantly.
#[derive(Clone)]
pub struct ScopedEventBus {
    pub(crate) inner: Arc<BusInner>,
}

impl ScopedEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                state: Mutex::new(BusState::default()),
                events_published: AtomicU64::new(0),
            }),
        }
    }

    /// Publish an event.
    ///
    /// Creates the next record of the stream, runs the interceptor chain
    /// registered for the event name and, unless vetoed, delivers the
    /// (possibly transformed) record to every active subscriber of the stream
    /// in subscription order.
    ///
    /// A request whose `source` equals its `scope` is a self-targeted
    /// dispatch: it is logged and skipped without creating a record.
    ///
    /// A subscriber that publishes to the stream it is being notified on gets
    /// `PublishOutcome::Queued`; the record is delivered after the current
    /// one reaches every subscriber, so each stream stays in publish order.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Handler` if a subscriber callback fails, either for
    /// this record or for one queued behind it. Subscribers after the failing
    /// one are not notified and records still queued are left undelivered.
    pub fn publish(&self, request: PublishRequest) -> Result<PublishOutcome, BusError> {
        let PublishRequest {
            scope,
            event_name,
            payload,
            source,
        } = request;

        if source.as_deref() == Some(scope.as_str()) {
            warn!(scope = %scope, event_name = %event_name, "Dispatching to self, event skipped");
            return Ok(PublishOutcome::SelfTargeted);
        }

        let key = StreamKey::new(scope, event_name);
        let (record, chain) = {
            let mut state = self.inner.state.lock();
            let chain = state.chain_for(&key.event_name);
            let stream = state.streams.entry(key.clone()).or_default();
            let record = EventRecord {
                sequence: stream.records.len() as u64 + 1,
                scope: key.scope.clone(),
                event_name: key.event_name.clone(),
                payload,
                source,
                acknowledged: false,
            };
            stream.records.push(record.clone());
            (record, chain)
        };
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
        let sequence = record.sequence;

        let Some(record) = run_chain(&chain, record) else {
            debug!(
                scope = %key.scope,
                event_name = %key.event_name,
                sequence,
                "Event vetoed by interceptor"
            );
            return Ok(PublishOutcome::Vetoed { sequence });
        };

        {
            let mut state = self.inner.state.lock();
            let stream = state.streams.entry(key.clone()).or_default();
            if stream.delivering {
                stream.pending.push_back(record);
                trace!(
                    scope = %key.scope,
                    event_name = %key.event_name,
                    sequence,
                    "Stream busy, event queued"
                );
                return Ok(PublishOutcome::Queued { sequence });
            }
            stream.delivering = true;
        }

        let mut guard = DeliveryGuard {
            inner: &self.inner,
            key: &key,
            finished: false,
        };
        let receivers = self.deliver(&key, &record)?;
        while let Some(queued) = self.next_pending(&key) {
            self.deliver(&key, &queued)?;
        }
        guard.finished = true;

        debug!(
            scope = %key.scope,
            event_name = %key.event_name,
            sequence,
            receivers,
            "Event published"
        );
        Ok(PublishOutcome::Delivered {
            sequence,
            receivers,
        })
    }

    /// Total records created by `publish` (vetoed ones included).
    #[must_use]
    pub fn events_published(&self) -> u64 {
        self.inner.events_published.load(Ordering::Relaxed)
    }

    /// Full history of a stream, in sequence order.
    #[must_use]
    pub fn history(&self, scope: &str, event_name: &str) -> Vec<EventRecord> {
        let state = self.inner.state.lock();
        state
            .streams
            .get(&StreamKey::new(scope, event_name))
            .map(|stream| stream.records.clone())
            .unwrap_or_default()
    }

    /// Number of active subscriptions on a stream.
    #[must_use]
    pub fn subscriber_count(&self, scope: &str, event_name: &str) -> usize {
        let state = self.inner.state.lock();
        state
            .streams
            .get(&StreamKey::new(scope, event_name))
            .map(|stream| {
                stream
                    .subscribers
                    .iter()
                    .filter(|s| s.active.load(Ordering::Acquire))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Number of interceptors registered for an event name.
    #[must_use]
    pub fn interceptor_count(&self, event_name: &str) -> usize {
        let state = self.inner.state.lock();
        state.interceptors.get(event_name).map_or(0, Vec::len)
    }

    fn active_subscribers(&self, key: &StreamKey) -> Vec<Arc<SubscriberEntry>> {
        let state = self.inner.state.lock();
        state
            .streams
            .get(key)
            .map(|stream| {
                stream
                    .subscribers
                    .iter()
                    .filter(|s| s.active.load(Ordering::Acquire))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Pop the next queued record, or end the delivery run if none is left.
    fn next_pending(&self, key: &StreamKey) -> Option<EventRecord> {
        let mut state = self.inner.state.lock();
        let stream = state.streams.get_mut(key)?;
        let next = stream.pending.pop_front();
        if next.is_none() {
            stream.delivering = false;
        }
        next
    }

    /// Notify the active subscribers in order, skipping any deactivated meanwhile.
    fn deliver(&self, key: &StreamKey, record: &EventRecord) -> Result<usize, BusError> {
        let subscribers = self.active_subscribers(key);
        let mut receivers = 0;
        for subscriber in &subscribers {
            if !subscriber.active.load(Ordering::Acquire) {
                continue;
            }
            trace!(subscription = subscriber.id, sequence = record.sequence, "Delivering event");
            (subscriber.callback)(record).map_err(|source| BusError::Handler {
                scope: key.scope.clone(),
                event_name: key.event_name.clone(),
                sequence: record.sequence,
                source,
            })?;
            receivers += 1;
            if receivers == 1 {
                self.inner.state.lock().mark_acknowledged(key, record.sequence);
            }
        }
        Ok(receivers)
    }
}

/// Ends a delivery run that was cut short by a failing or panicking
/// subscriber. Records still queued stay unacknowledged in the history.
struct DeliveryGuard<'a> {
    inner: &'a BusInner,
    key: &'a StreamKey,
    finished: bool,
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.inner.state.lock();
        if let Some(stream) = state.streams.get_mut(self.key) {
            stream.delivering = false;
            let dropped = stream.pending.len();
            stream.pending.clear();
            if dropped > 0 {
                warn!(
                    scope = %self.key.scope,
                    event_name = %self.key.event_name,
                    dropped,
                    "Delivery aborted, queued events left undelivered"
                );
            }
        }
    }
}

impl Default for ScopedEventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `record` through an interceptor chain. `None` means vetoed.
///
/// Interceptors may rewrite the payload and source; the routing fields
/// (`scope`, `event_name`, `sequence`) are fixed at publish time.
pub(crate) fn run_chain(chain: &[Transform], record: EventRecord) -> Option<EventRecord> {
    let sequence = record.sequence;
    let scope = record.scope.clone();
    let event_name = record.event_name.clone();

    let mut current = record;
    for transform in chain {
        current = transform(current)?;
    }
    current.sequence = sequence;
    current.scope = scope;
    current.event_name = event_name;
    Some(current)
}

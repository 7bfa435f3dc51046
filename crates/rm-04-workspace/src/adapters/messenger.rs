//! # Messenger
//!
//! A repository's view of the workspace bus. Every messenger is bound to one
//! owner id: it publishes on behalf of that owner and listens on the
//! owner's own scope under the `dispatch` event.

use parking_lot::Mutex;
use shared_bus::{BusError, PublishOutcome, PublishRequest, ScopedEventBus, SubscribeOptions, Subscription};
use shared_types::{HandlerError, Message, MessageRequest, DISPATCH_EVENT};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Bus facade restricted to one owner scope.
///
/// Clones share the owner's single subscription slot. The workspace keeps
/// the descriptor's message hook in a second slot, so a repository can
/// listen through its messenger and still have its hook called.
#[derive(Clone)]
pub struct Messenger {
    owner: String,
    bus: ScopedEventBus,
    subscription: Arc<Mutex<Option<Subscription>>>,
    hook: Arc<Mutex<Option<Subscription>>>,
}

impl Messenger {
    pub(crate) fn new(owner: impl Into<String>, bus: ScopedEventBus) -> Self {
        Self {
            owner: owner.into(),
            bus,
            subscription: Arc::new(Mutex::new(None)),
            hook: Arc::new(Mutex::new(None)),
        }
    }

    /// Id of the repository this messenger speaks for.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Send a message to `request.repository_id`.
    ///
    /// The envelope's `source` is always this messenger's owner. Sending to
    /// the owner itself is logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Handler` if the receiving handler fails.
    pub fn dispatch(&self, request: MessageRequest) -> Result<PublishOutcome, BusError> {
        let MessageRequest {
            kind,
            repository_id,
            message,
        } = request;
        let envelope = Message {
            kind,
            message,
            source: self.owner.clone(),
        };
        debug!(
            source = %self.owner,
            target = %repository_id,
            kind = %envelope.kind,
            "Dispatching message"
        );
        self.bus.publish(
            PublishRequest::new(repository_id, DISPATCH_EVENT, envelope.to_payload())
                .from_source(self.owner.clone()),
        )
    }

    /// Listen for messages addressed to the owner.
    ///
    /// Messages dispatched before this call that nobody has received yet are
    /// delivered first. Only one subscription per owner may be live: a second
    /// call logs a warning and returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Handler` if `handler` fails while catching up.
    pub fn subscribe<F>(&self, handler: F) -> Result<bool, BusError>
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        if self.is_subscribed() {
            warn!(repository = %self.owner, "Messenger already subscribed, second subscription ignored");
            return Ok(false);
        }

        let subscription = self.listen(Some(self.owner.clone()), handler)?;
        // A concurrent subscribe for the same owner won; the bus already warned.
        if !subscription.is_active() {
            return Ok(false);
        }

        *self.subscription.lock() = Some(subscription);
        Ok(true)
    }

    /// Stop listening. Safe to call when not subscribed.
    ///
    /// The workspace's message hook, if attached, keeps running.
    pub fn unsubscribe(&self) {
        if let Some(subscription) = self.subscription.lock().take() {
            subscription.unsubscribe();
        }
    }

    /// Subscribe the workspace's message hook next to the owner's own
    /// subscription. Replaces a hook that is still attached.
    pub(crate) fn attach_hook<F>(&self, handler: F) -> Result<(), BusError>
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.detach_hook();
        let subscription = self.listen(None, handler)?;
        *self.hook.lock() = Some(subscription);
        Ok(())
    }

    pub(crate) fn detach_hook(&self) {
        if let Some(subscription) = self.hook.lock().take() {
            subscription.unsubscribe();
        }
    }

    /// Drop both subscriptions.
    pub(crate) fn close(&self) {
        self.unsubscribe();
        self.detach_hook();
    }

    /// Whether the workspace's message hook is attached.
    #[must_use]
    pub fn has_hook(&self) -> bool {
        self.hook.lock().as_ref().is_some_and(Subscription::is_active)
    }

    fn listen<F>(&self, owner: Option<String>, handler: F) -> Result<Subscription, BusError>
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        let mut options = SubscribeOptions::new(self.owner.clone(), DISPATCH_EVENT).from_beginning();
        if let Some(owner) = owner {
            options = options.owned_by(owner);
        }
        self.bus.subscribe(options, move |record| {
            let message = Message::from_payload(&record.payload)?;
            handler(&message)
        })
    }

    /// Whether a live subscription exists.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .is_some_and(Subscription::is_active)
    }
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("owner", &self.owner)
            .field("subscribed", &self.is_subscribed())
            .field("hook", &self.has_hook())
            .finish()
    }
}

use crate::{
    domain::Entity,
    events::{EntityChange, StoreAction, StoreEvent, Topic},
};
use std::{
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
};

pub type Handler = Arc<dyn Fn(&StoreEvent) -> anyhow::Result<()> + Send + Sync>;

struct Registration {
    id: u64,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    topics: Mutex<HashMap<Topic, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn topics(&self) -> MutexGuard<'_, HashMap<Topic, Vec<Registration>>> {
        // Handlers never run under this lock, so a poisoned guard still holds
        // a consistent map.
        self.topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, topic: &Topic, id: u64) {
        let mut topics = self.topics();
        if let Some(registrations) = topics.get_mut(topic) {
            registrations.retain(|r| r.id != id);
            if registrations.is_empty() {
                topics.remove(topic);
            }
        }
    }
}

/// Synchronous fan-out bus.
///
/// `publish` snapshots the handler list, then calls each handler in
/// subscription order on the caller's thread. A failing or panicking handler
/// is logged and skipped; the publisher never sees the error. Events with no
/// subscribers are dropped.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for one topic
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&StoreEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .topics()
            .entry(topic)
            .or_default()
            .push(Registration {
                id,
                handler: Arc::new(handler),
            });

        tracing::debug!(%topic, id, "subscribed");

        Subscription {
            bus: Arc::downgrade(&self.inner),
            topic,
            id,
            active: AtomicBool::new(true),
        }
    }

    /// Typed subscription to one entity kind and action
    pub fn subscribe_entity<T, F>(&self, action: StoreAction, handler: F) -> Subscription
    where
        T: Entity,
        F: Fn(&EntityChange<T>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(Topic::of::<T>(action), move |event| match T::from_event(event) {
            Some(change) => handler(change),
            None => Ok(()),
        })
    }

    /// Delivers `event` to every handler registered on `topic` when the call
    /// starts. Returns how many handlers completed without error.
    pub fn publish(&self, topic: &Topic, event: &StoreEvent) -> usize {
        let snapshot: Vec<(u64, Handler)> = match self.inner.topics().get(topic) {
            Some(registrations) => registrations
                .iter()
                .map(|r| (r.id, Arc::clone(&r.handler)))
                .collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, handler) in snapshot {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    tracing::warn!(%topic, id, error = %err, "event handler failed");
                }
                Err(_) => {
                    tracing::error!(%topic, id, "event handler panicked");
                }
            }
        }
        delivered
    }

    /// Publishes on the event's own topic, then on `storage:updated`
    pub fn emit(&self, event: StoreEvent) {
        let topic = event.topic();
        tracing::debug!(%topic, entity_id = ?event.entity_id(), "emitting store event");
        self.publish(&topic, &event);
        self.publish(&Topic::StorageUpdated, &event);
    }

    /// Removes the handlers of one topic, or of every topic when `None`
    pub fn clear(&self, topic: Option<&Topic>) {
        let mut topics = self.inner.topics();
        match topic {
            Some(topic) => {
                topics.remove(topic);
            }
            None => topics.clear(),
        }
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.inner.topics().get(topic).map_or(0, Vec::len)
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the handler registered;
/// call [`Subscription::unsubscribe`] to remove it, or convert it with
/// [`Subscription::into_guard`] to tie the registration to a scope.
#[must_use = "dropping a Subscription leaves the handler registered; keep it, unsubscribe, or use into_guard()"]
pub struct Subscription {
    bus: Weak<BusInner>,
    topic: Topic,
    id: u64,
    active: AtomicBool,
}

impl Subscription {
    /// Removes exactly this registration. Further calls do nothing.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            if let Some(inner) = self.bus.upgrade() {
                inner.remove(&self.topic, self.id);
                tracing::debug!(topic = %self.topic, id = self.id, "unsubscribed");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Unsubscribes when the returned guard is dropped
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

/// Scoped [`Subscription`]: the handler is removed on drop.
#[must_use = "the handler is removed as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
    pub fn subscription(&self) -> &Subscription {
        &self.0
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

// Subscriber registry - Fan-out of every parsed payload to interested listeners
use crate::domain::payload::LivePayload;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

pub trait Subscriber: Send + Sync {
    fn on_payload(&self, payload: &LivePayload) -> anyhow::Result<()>;
}

impl<F> Subscriber for F
where
    F: Fn(&LivePayload) -> anyhow::Result<()> + Send + Sync,
{
    fn on_payload(&self, payload: &LivePayload) -> anyhow::Result<()> {
        self(payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    entries: Vec<(SubscriberId, Arc<dyn Subscriber>)>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> Subscription {
        let mut inner = self.lock();
        let id = SubscriberId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push((id, subscriber));
        tracing::debug!(subscriber = id.0, total = inner.entries.len(), "subscriber added");

        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Delivers `payload` to every subscriber in registration order. A
    /// subscriber that errors or panics is logged and skipped.
    pub fn notify(&self, payload: &LivePayload) -> DeliveryReport {
        // Snapshot the list so callbacks may (un)subscribe without deadlocking
        let entries: Vec<(SubscriberId, Arc<dyn Subscriber>)> = self.lock().entries.clone();

        let mut report = DeliveryReport::default();
        for (id, subscriber) in entries {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.on_payload(payload))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    tracing::warn!(subscriber = id.0, error = %e, "subscriber failed to handle payload");
                    report.failed += 1;
                }
                Err(_) => {
                    tracing::error!(subscriber = id.0, "subscriber panicked while handling payload");
                    report.failed += 1;
                }
            }
        }
        report
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(inner: &Mutex<RegistryInner>, id: SubscriberId) -> bool {
        let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
        let before = inner.entries.len();
        inner.entries.retain(|(entry_id, _)| *entry_id != id);
        let removed = inner.entries.len() != before;
        if removed {
            tracing::debug!(subscriber = id.0, total = inner.entries.len(), "subscriber removed");
        }
        removed
    }
}

/// Handle returned by [`SubscriberRegistry::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<Mutex<RegistryInner>>,
}

impl Subscription {
    /// Safe to call any number of times; only ever removes this subscription.
    pub fn unsubscribe(&self) {
        if let Some(inner) = self.registry.upgrade() {
            SubscriberRegistry::remove(&inner, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

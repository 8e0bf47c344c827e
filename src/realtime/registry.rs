//! # Subscription Registry
//!
//! Channel -> ordered subscriber list. Channels appear on first subscribe
//! and are pruned when their last subscriber leaves.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use uuid::Uuid;

use super::channel::validate_channel;
use super::errors::{RealtimeError, RealtimeResult};
use super::event::RealtimeEvent;

/// Subscriber callback
pub type Handler = Arc<dyn Fn(&RealtimeEvent) + Send + Sync>;

/// Unique subscription ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One registered callback
#[derive(Clone)]
pub struct Subscriber {
    pub id: SubscriptionId,
    pub handler: Handler,
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Registry of active subscriptions
#[derive(Default)]
pub struct SubscriptionRegistry {
    /// Subscribers by channel, in subscription order
    channels: RwLock<HashMap<String, Vec<Subscriber>>>,
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("channels", &self.channel_count())
            .field("subscribers", &self.len())
            .finish()
    }
}

impl SubscriptionRegistry {
    /// Create a new registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` on `channel`, creating the channel if needed
    pub fn subscribe(self: &Arc<Self>, channel: &str, handler: Handler) -> RealtimeResult<Subscription> {
        validate_channel(channel)?;

        let id = SubscriptionId::new();
        {
            let mut channels = self.channels.write().map_err(|_| RealtimeError::poisoned())?;
            channels
                .entry(channel.to_string())
                .or_default()
                .push(Subscriber { id, handler });
        }

        Ok(Subscription {
            id,
            channel: channel.to_string(),
            registry: Arc::downgrade(self),
            active: AtomicBool::new(true),
        })
    }

    /// Remove one subscription. Returns false if it was already gone.
    ///
    /// The removed handler is dropped after the lock is released, since
    /// it may own other subscriptions whose drop re-enters the registry.
    pub fn remove(&self, channel: &str, id: SubscriptionId) -> bool {
        let removed = {
            let Ok(mut channels) = self.channels.write() else {
                return false;
            };

            let Some(subscribers) = channels.get_mut(channel) else {
                return false;
            };

            let removed = subscribers
                .iter()
                .position(|s| s.id == id)
                .map(|index| subscribers.remove(index));

            if subscribers.is_empty() {
                channels.remove(channel);
            }

            removed
        };

        removed.is_some()
    }

    /// Copy of the channel's subscribers, for delivery without holding the lock
    pub fn snapshot(&self, channel: &str) -> Vec<Subscriber> {
        self.channels
            .read()
            .ok()
            .and_then(|c| c.get(channel).cloned())
            .unwrap_or_default()
    }

    /// Number of channels with at least one subscriber
    pub fn channel_count(&self) -> usize {
        self.channels.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of subscribers on one channel
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .map(|c| c.get(channel).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Total subscription count
    pub fn len(&self) -> usize {
        self.channels
            .read()
            .map(|c| c.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every subscription. Outstanding handles become no-ops.
    pub fn clear(&self) {
        let drained = match self.channels.write() {
            Ok(mut channels) => std::mem::take(&mut *channels),
            Err(_) => return,
        };
        drop(drained);
    }
}

/// Handle for one registration.
///
/// Unsubscribes when dropped. `unsubscribe()` may be called any number
/// of times; only the first call does anything.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    id: SubscriptionId,
    channel: String,
    registry: Weak<SubscriptionRegistry>,
    active: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// False once unsubscribed, detached, or the bus is gone
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire) && self.registry.strong_count() > 0
    }

    /// Remove the registration. Idempotent.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.channel, self.id);
        }
    }

    /// Give up the handle and keep the registration for the bus's lifetime
    pub fn detach(self) {
        self.active.store(false, Ordering::Release);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("active", &self.is_active())
            .finish()
    }
}

//! # Event Dispatcher
//!
//! Synchronous fan-out to the subscribers of one channel.
//!
//! Delivery iterates a snapshot taken before the first callback runs, so
//! subscribers added or removed mid-delivery do not affect the in-flight
//! emit, and a subscriber may emit again from inside its callback. Each
//! callback runs in its own `catch_unwind`; a panicking subscriber is
//! reported and the remaining subscribers still receive the event.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use super::event::{EventKind, RealtimeEvent};
use super::registry::{SubscriptionId, SubscriptionRegistry};
use crate::observability::{log_event_with_fields, Event};

/// Caller-supplied sink for delivery failures
pub type ErrorHook = Arc<dyn Fn(&DeliveryFailure) + Send + Sync>;

/// A subscriber that panicked while handling an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    pub channel: String,
    pub subscription_id: SubscriptionId,
    pub event_type: EventKind,
    /// Panic message, if it was a string
    pub message: String,
}

/// Event dispatcher that fans out events to subscribed callbacks
pub struct Dispatcher {
    /// Subscription registry
    subscriptions: Arc<SubscriptionRegistry>,

    /// Where delivery failures go besides the log
    error_hook: RwLock<Option<ErrorHook>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(SubscriptionRegistry::new()))
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Create a new dispatcher
    pub fn new(subscriptions: Arc<SubscriptionRegistry>) -> Self {
        Self {
            subscriptions,
            error_hook: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.subscriptions
    }

    /// Install (or replace) the failure hook
    pub fn set_error_hook(&self, hook: ErrorHook) {
        if let Ok(mut slot) = self.error_hook.write() {
            *slot = Some(hook);
        }
    }

    /// Remove the failure hook; failures are then only logged
    pub fn clear_error_hook(&self) {
        if let Ok(mut slot) = self.error_hook.write() {
            *slot = None;
        }
    }

    /// Deliver `event` to every current subscriber of `channel`, in
    /// subscription order. Unknown channels are a no-op.
    pub fn dispatch(&self, channel: &str, event: &RealtimeEvent) -> DispatchResult {
        let subscribers = self.subscriptions.snapshot(channel);
        let mut result = DispatchResult {
            matched: subscribers.len(),
            ..DispatchResult::default()
        };

        for subscriber in subscribers {
            let handler = &subscriber.handler;
            match panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(()) => result.delivered += 1,
                Err(payload) => {
                    result.failed += 1;
                    self.report(DeliveryFailure {
                        channel: channel.to_string(),
                        subscription_id: subscriber.id,
                        event_type: event.kind(),
                        message: panic_message(payload.as_ref()),
                    });
                }
            }
        }

        if result.matched > 0 {
            let delivered = result.delivered.to_string();
            log_event_with_fields(
                Event::EventEmitted,
                &[
                    ("channel", channel),
                    ("type", event.kind().as_str()),
                    ("delivered", delivered.as_str()),
                ],
            );
        }

        result
    }

    fn report(&self, failure: DeliveryFailure) {
        let subscription = failure.subscription_id.to_string();
        log_event_with_fields(
            Event::SubscriberPanicked,
            &[
                ("channel", failure.channel.as_str()),
                ("subscription", subscription.as_str()),
                ("type", failure.event_type.as_str()),
                ("message", failure.message.as_str()),
            ],
        );

        let hook = self.error_hook.read().ok().and_then(|h| h.clone());
        if let Some(hook) = hook {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| hook(&failure))) {
                let message = panic_message(payload.as_ref());
                log_event_with_fields(
                    Event::ErrorHookPanicked,
                    &[
                        ("channel", failure.channel.as_str()),
                        ("message", message.as_str()),
                    ],
                );
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Result of dispatching an event
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    /// Number of subscribers in the snapshot
    pub matched: usize,
    /// Number of callbacks that returned normally
    pub delivered: usize,
    /// Number of callbacks that panicked
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::realtime::event::{CommentPayload, PresencePayload};
    use crate::realtime::registry::Handler;

    fn comment() -> RealtimeEvent {
        RealtimeEvent::CommentAdded(CommentPayload::new("c1", "x", "u1", "ana", "hi"))
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Handler {
        let log = Arc::clone(log);
        Arc::new(move |_: &RealtimeEvent| log.lock().unwrap().push(name))
    }

    #[test]
    fn test_dispatch_in_subscription_order() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let log = Arc::new(Mutex::new(Vec::new()));

        let _a = registry.subscribe("comments", recorder(&log, "a")).unwrap();
        let _b = registry.subscribe("comments", recorder(&log, "b")).unwrap();
        let _c = registry.subscribe("comments", recorder(&log, "c")).unwrap();

        let result = dispatcher.dispatch("comments", &comment());
        assert_eq!(result, DispatchResult { matched: 3, delivered: 3, failed: 0 });
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_dispatch_unknown_channel() {
        let dispatcher = Dispatcher::default();
        let result = dispatcher.dispatch("nonexistent", &comment());
        assert_eq!(result, DispatchResult::default());
    }

    #[test]
    fn test_panicking_subscriber_isolated() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let log = Arc::new(Mutex::new(Vec::new()));
        let failures = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&failures);
        dispatcher.set_error_hook(Arc::new(move |f: &DeliveryFailure| {
            sink.lock().unwrap().push(f.clone());
        }));

        let _a = registry.subscribe("presence", recorder(&log, "a")).unwrap();
        let bad = registry
            .subscribe("presence", Arc::new(|_: &RealtimeEvent| panic!("listener broke")))
            .unwrap();
        let _c = registry.subscribe("presence", recorder(&log, "c")).unwrap();

        let event = RealtimeEvent::PresenceUpdate(PresencePayload::online("u1"));
        let result = dispatcher.dispatch("presence", &event);

        assert_eq!(result, DispatchResult { matched: 3, delivered: 2, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);

        let failures = failures.lock().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subscription_id, bad.id());
        assert_eq!(failures[0].channel, "presence");
        assert_eq!(failures[0].event_type, EventKind::PresenceUpdate);
        assert_eq!(failures[0].message, "listener broke");
    }

    #[test]
    fn test_clear_error_hook() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let hits = Arc::new(Mutex::new(0));

        let counter = Arc::clone(&hits);
        dispatcher.set_error_hook(Arc::new(move |_: &DeliveryFailure| {
            *counter.lock().unwrap() += 1;
        }));
        dispatcher.clear_error_hook();

        let _bad = registry
            .subscribe("comments", Arc::new(|_: &RealtimeEvent| panic!("boom")))
            .unwrap();

        let result = dispatcher.dispatch("comments", &comment());
        assert_eq!(result.failed, 1);
        assert_eq!(*hits.lock().unwrap(), 0);
    }

    #[test]
    fn test_panicking_error_hook_contained() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Dispatcher::new(Arc::clone(&registry));
        let log = Arc::new(Mutex::new(Vec::new()));

        dispatcher.set_error_hook(Arc::new(|_: &DeliveryFailure| panic!("hook broke")));

        let _bad = registry
            .subscribe("comments", Arc::new(|_: &RealtimeEvent| panic!("boom")))
            .unwrap();
        let _after = registry.subscribe("comments", recorder(&log, "after")).unwrap();

        let result = dispatcher.dispatch("comments", &comment());
        assert_eq!(result, DispatchResult { matched: 2, delivered: 1, failed: 1 });
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_panic_message_formats() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(owned.as_ref()), "owned");

        let other: Box<dyn Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}

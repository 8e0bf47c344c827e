//! # Realtime Bus
//!
//! The explicitly owned service UI code talks to: connection lifecycle,
//! channel subscriptions, emit, and the optional activity simulator.
//!
//! Subscriptions belong to the bus, not the connection; `disconnect()`
//! leaves them in place. Dropping the bus disconnects it, which cancels
//! every task it spawned.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::activity::{ActivitySource, RandomActivity};
use super::connection::{ConnectionState, ConnectionStatus};
use super::dispatcher::{DeliveryFailure, DispatchResult, Dispatcher};
use super::errors::{RealtimeError, RealtimeResult};
use super::event::RealtimeEvent;
use super::registry::{Subscription, SubscriptionRegistry};
use super::simulator::ActivitySimulator;
use crate::config::RealtimeConfig;
use crate::observability::{log_event, log_event_with_fields, Event};

/// In-process realtime event broker
pub struct RealtimeBus {
    config: RealtimeConfig,
    registry: Arc<SubscriptionRegistry>,
    dispatcher: Arc<Dispatcher>,
    connection: Arc<ConnectionState>,
    simulator: Arc<ActivitySimulator>,
    connect_task: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for RealtimeBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeBus")
            .field("status", &self.status())
            .field("registry", &self.registry)
            .field("simulator", &self.simulator)
            .finish()
    }
}

impl Default for RealtimeBus {
    fn default() -> Self {
        Self::new(RealtimeConfig::default())
    }
}

impl RealtimeBus {
    /// Bus with the built-in random payload source
    pub fn new(config: RealtimeConfig) -> Self {
        let source = match config.seed {
            Some(seed) => RandomActivity::seeded(seed.wrapping_add(1)),
            None => RandomActivity::new(),
        };
        Self::with_source(config, Box::new(source))
    }

    /// Bus with a caller-supplied payload source
    pub fn with_source(config: RealtimeConfig, source: Box<dyn ActivitySource>) -> Self {
        let registry = Arc::new(SubscriptionRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry)));
        let simulator = Arc::new(ActivitySimulator::new(
            Arc::clone(&dispatcher),
            config.simulator_settings(),
            source,
            config.seed,
        ));

        Self {
            config,
            registry,
            dispatcher,
            connection: Arc::new(ConnectionState::new()),
            simulator,
            connect_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }

    // ==================
    // Connection
    // ==================

    /// `disconnected -> connecting`, then `connected` after the fixed
    /// connect delay. No-op while connecting or connected.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) -> RealtimeResult<()> {
        let handle = Handle::try_current().map_err(|_| RealtimeError::NoRuntime)?;

        let Some(generation) = self.connection.begin_connect() else {
            return Ok(());
        };

        let delay = self.config.connect_delay();
        let delay_ms = delay.as_millis().to_string();
        log_event_with_fields(Event::BusConnecting, &[("delay_ms", delay_ms.as_str())]);

        let connection = Arc::clone(&self.connection);
        let simulator = Arc::clone(&self.simulator);
        let simulate = self.config.simulate_activity;

        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;

            if !connection.complete_connect(generation) {
                return;
            }
            log_event(Event::BusConnected);

            if simulate {
                if let Err(err) = simulator.start() {
                    let reason = err.to_string();
                    log_event_with_fields(Event::SynthesisSkipped, &[("reason", reason.as_str())]);
                }
                // A disconnect may have landed between promotion and start
                if !connection.is_current(generation) {
                    simulator.stop();
                }
            }
        });

        if let Ok(mut slot) = self.connect_task.lock() {
            if let Some(previous) = slot.replace(task) {
                previous.abort();
            }
        }

        Ok(())
    }

    /// Any state -> `disconnected`. Stops the simulator, keeps subscriptions.
    pub fn disconnect(&self) {
        let previous = self.connection.disconnect();

        if let Ok(mut slot) = self.connect_task.lock() {
            if let Some(task) = slot.take() {
                task.abort();
            }
        }
        self.simulator.stop();

        if previous != ConnectionStatus::Disconnected {
            log_event_with_fields(Event::BusDisconnected, &[("from", previous.as_str())]);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.connection.status()
    }

    /// Receiver notified on every status change
    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.watch()
    }

    // ==================
    // Pub/sub
    // ==================

    /// Register `handler` on `channel`. Fails only for an empty channel name.
    pub fn subscribe<F>(&self, channel: &str, handler: F) -> RealtimeResult<Subscription>
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        self.registry.subscribe(channel, Arc::new(handler))
    }

    /// Deliver `event` synchronously to the channel's subscribers.
    ///
    /// Emitting to a channel nobody listens on is a no-op.
    pub fn emit(&self, channel: &str, event: &RealtimeEvent) -> DispatchResult {
        self.dispatcher.dispatch(channel, event)
    }

    /// Emit on the channel the event's type belongs to
    pub fn publish(&self, event: &RealtimeEvent) -> DispatchResult {
        self.emit(event.channel(), event)
    }

    /// Handle for emitting from inside subscriber callbacks without
    /// keeping the bus alive
    pub fn emitter(&self) -> Emitter {
        Emitter {
            dispatcher: Arc::downgrade(&self.dispatcher),
        }
    }

    /// Report subscriber panics to `hook` in addition to the log
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&DeliveryFailure) + Send + Sync + 'static,
    {
        self.dispatcher.set_error_hook(Arc::new(hook));
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn simulator(&self) -> &ActivitySimulator {
        &self.simulator
    }
}

impl Drop for RealtimeBus {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Weak emit handle. Emits become no-ops once the bus is dropped.
#[derive(Debug, Clone)]
pub struct Emitter {
    dispatcher: Weak<Dispatcher>,
}

impl Emitter {
    pub fn emit(&self, channel: &str, event: &RealtimeEvent) -> DispatchResult {
        match self.dispatcher.upgrade() {
            Some(dispatcher) => dispatcher.dispatch(channel, event),
            None => DispatchResult::default(),
        }
    }

    pub fn publish(&self, event: &RealtimeEvent) -> DispatchResult {
        self.emit(event.channel(), event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::realtime::event::{CommentPayload, PresencePayload};

    fn comment(context: &str) -> RealtimeEvent {
        RealtimeEvent::CommentAdded(CommentPayload::new("c1", context, "u1", "ana", "hi"))
    }

    #[test]
    fn test_connect_requires_runtime() {
        let bus = RealtimeBus::new(RealtimeConfig::quiet());
        assert_eq!(bus.connect(), Err(RealtimeError::NoRuntime));
        assert_eq!(bus.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_subscribe_and_emit_without_runtime() {
        let bus = RealtimeBus::new(RealtimeConfig::quiet());
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        let _sub = bus
            .subscribe("comments", move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let result = bus.publish(&comment("x"));
        assert_eq!(result.delivered, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribe_empty_channel() {
        let bus = RealtimeBus::new(RealtimeConfig::quiet());
        let result = bus.subscribe("", |_| {});
        assert!(matches!(result, Err(RealtimeError::InvalidChannel(_))));
    }

    #[test]
    fn test_emitter_after_drop() {
        let bus = RealtimeBus::new(RealtimeConfig::quiet());
        let emitter = bus.emitter();
        drop(bus);

        let event = RealtimeEvent::PresenceUpdate(PresencePayload::online("u1"));
        assert_eq!(emitter.publish(&event), DispatchResult::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_keeps_subscriptions() {
        let bus = RealtimeBus::new(RealtimeConfig::quiet());
        let _sub = bus.subscribe("comments", |_| {}).unwrap();

        bus.connect().unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(bus.is_connected());

        bus.disconnect();
        assert_eq!(bus.registry().subscriber_count("comments"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_while_connecting() {
        let bus = RealtimeBus::new(RealtimeConfig::quiet());

        bus.connect().unwrap();
        bus.disconnect();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(bus.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quiet_bus_never_simulates() {
        let bus = RealtimeBus::new(RealtimeConfig::quiet());
        bus.connect().unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(bus.is_connected());
        assert!(!bus.simulator().is_active());
        assert_eq!(bus.simulator().cycles(), 0);
    }
}

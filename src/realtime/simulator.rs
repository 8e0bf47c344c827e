//! # Activity Simulator
//!
//! Makes the site feel live without a backend: while running, it wakes
//! up after a random interval, picks an archetype, synthesizes an event
//! and emits it on the archetype's channel.
//!
//! The simulator owns every task it spawns. There is at most one
//! recurring task; follow-ups (typing stopped) live in a `JoinSet`.
//! `stop()` aborts all of them, so nothing fires after a stop.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::runtime::Handle;
use tokio::task::{JoinHandle, JoinSet};

use super::activity::{ActivitySource, Archetype};
use super::dispatcher::{panic_message, Dispatcher};
use super::errors::{RealtimeError, RealtimeResult};
use super::event::{RealtimeEvent, TypingPayload};
use crate::observability::{log_event, log_event_with_fields, Event};

/// Timing knobs for the simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorSettings {
    /// Shortest wait between cycles
    pub min_interval: Duration,
    /// Longest wait between cycles (inclusive)
    pub max_interval: Duration,
    /// How long a synthetic user "types" before stopping
    pub typing_stop_delay: Duration,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(15),
            typing_stop_delay: Duration::from_secs(3),
        }
    }
}

struct Core {
    rng: StdRng,
    source: Box<dyn ActivitySource>,
}

struct Shared {
    dispatcher: Arc<Dispatcher>,
    settings: SimulatorSettings,
    core: Mutex<Core>,
    follow_ups: Mutex<JoinSet<()>>,
    active: Arc<AtomicBool>,
    cycles: AtomicU64,
}

/// Timer-driven generator of synthetic events
pub struct ActivitySimulator {
    shared: Arc<Shared>,
    recurring: Mutex<Option<JoinHandle<()>>>,
}

impl fmt::Debug for ActivitySimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivitySimulator")
            .field("settings", &self.shared.settings)
            .field("active", &self.is_active())
            .field("cycles", &self.cycles())
            .finish()
    }
}

impl ActivitySimulator {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        settings: SimulatorSettings,
        source: Box<dyn ActivitySource>,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            shared: Arc::new(Shared {
                dispatcher,
                settings,
                core: Mutex::new(Core { rng, source }),
                follow_ups: Mutex::new(JoinSet::new()),
                active: Arc::new(AtomicBool::new(false)),
                cycles: AtomicU64::new(0),
            }),
            recurring: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> SimulatorSettings {
        self.shared.settings
    }

    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Completed cycles since creation, including skipped ones
    pub fn cycles(&self) -> u64 {
        self.shared.cycles.load(Ordering::Acquire)
    }

    /// Spawn the recurring task, replacing any previous one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> RealtimeResult<()> {
        let handle = Handle::try_current().map_err(|_| RealtimeError::NoRuntime)?;
        let mut recurring = self.recurring.lock().map_err(|_| RealtimeError::poisoned())?;

        if let Some(previous) = recurring.take() {
            previous.abort();
        }

        self.shared.active.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        *recurring = Some(handle.spawn(async move {
            loop {
                let delay = shared.next_delay();
                tokio::time::sleep(delay).await;
                shared.run_cycle();
            }
        }));

        let min_ms = self.shared.settings.min_interval.as_millis().to_string();
        let max_ms = self.shared.settings.max_interval.as_millis().to_string();
        log_event_with_fields(
            Event::SimulatorStarted,
            &[("min_interval_ms", min_ms.as_str()), ("max_interval_ms", max_ms.as_str())],
        );
        Ok(())
    }

    /// Abort the recurring task and pending follow-ups. Idempotent.
    pub fn stop(&self) {
        let was_active = self.shared.active.swap(false, Ordering::AcqRel);

        if let Ok(mut recurring) = self.recurring.lock() {
            if let Some(task) = recurring.take() {
                task.abort();
            }
        }
        if let Ok(mut follow_ups) = self.shared.follow_ups.lock() {
            follow_ups.abort_all();
        }

        if was_active {
            log_event(Event::SimulatorStopped);
        }
    }
}

impl Drop for ActivitySimulator {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    /// A panicking source never leaves the core unusable
    fn core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn next_delay(&self) -> Duration {
        let min = self.settings.min_interval.as_millis() as u64;
        let max = (self.settings.max_interval.as_millis() as u64).max(min);

        Duration::from_millis(self.core().rng.gen_range(min..=max))
    }

    fn run_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::AcqRel);
        if !self.is_active() {
            return;
        }

        let Some((archetype, event)) = self.synthesize() else {
            return;
        };

        // stop() may have landed while synthesizing
        if !self.is_active() {
            return;
        }
        let channel = archetype.channel();
        self.dispatcher.dispatch(channel, &event);

        if let RealtimeEvent::UserTyping(started) = event {
            let stopped = RealtimeEvent::UserTyping(TypingPayload {
                is_typing: false,
                ..started
            });
            self.schedule(channel, stopped, self.settings.typing_stop_delay);
        }
    }

    fn synthesize(&self) -> Option<(Archetype, RealtimeEvent)> {
        let mut core = self.core();
        let archetype = *Archetype::ALL.choose(&mut core.rng)?;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| core.source.synthesize(archetype)));
        drop(core);

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let reason = format!("source panicked: {}", panic_message(payload.as_ref()));
                log_event_with_fields(
                    Event::SynthesisSkipped,
                    &[("archetype", archetype.as_str()), ("reason", reason.as_str())],
                );
                return None;
            }
        };

        match result {
            Ok(event) if archetype.accepts(&event) => Some((archetype, event)),
            Ok(event) => {
                let got = event.kind().as_str();
                log_event_with_fields(
                    Event::SynthesisSkipped,
                    &[("archetype", archetype.as_str()), ("reason", "mismatched event"), ("type", got)],
                );
                None
            }
            Err(err) => {
                let reason = err.to_string();
                log_event_with_fields(
                    Event::SynthesisSkipped,
                    &[("archetype", archetype.as_str()), ("reason", reason.as_str())],
                );
                None
            }
        }
    }

    fn schedule(&self, channel: &'static str, event: RealtimeEvent, delay: Duration) {
        let Ok(mut follow_ups) = self.follow_ups.lock() else {
            return;
        };

        // Checked under the lock stop() takes before abort_all()
        if !self.is_active() {
            return;
        }

        // Reap finished follow-ups so the set does not grow
        while follow_ups.try_join_next().is_some() {}

        let dispatcher = Arc::clone(&self.dispatcher);
        let active = Arc::clone(&self.active);
        follow_ups.spawn(async move {
            tokio::time::sleep(delay).await;
            if active.load(Ordering::Acquire) {
                dispatcher.dispatch(channel, &event);
            }
        });
    }
}

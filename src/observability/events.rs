//! Observable events for the realtime bus
//!
//! Events are explicit and typed. Each one has a stable code and a
//! severity; the code is what shows up in log lines.

use std::fmt;

/// Log severity for an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-emit detail
    Trace,
    /// Normal lifecycle
    Info,
    /// A subscriber or generator misbehaved; the bus kept going
    Warn,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
        }
    }
}

/// Observable events in the realtime subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Connection lifecycle
    /// `connect()` accepted, simulated handshake running
    BusConnecting,
    /// Handshake delay elapsed
    BusConnected,
    /// `disconnect()` took effect
    BusDisconnected,

    // Delivery
    /// Event fanned out to a channel
    EventEmitted,
    /// A subscriber panicked during delivery
    SubscriberPanicked,
    /// The delivery error hook itself panicked
    ErrorHookPanicked,

    // Activity simulator
    /// Recurring generator task spawned
    SimulatorStarted,
    /// Generator tasks aborted
    SimulatorStopped,
    /// Payload synthesis failed, cycle skipped
    SynthesisSkipped,

    // Configuration
    /// Config file loaded and validated
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BusConnecting => "BUS_CONNECTING",
            Event::BusConnected => "BUS_CONNECTED",
            Event::BusDisconnected => "BUS_DISCONNECTED",

            Event::EventEmitted => "EVENT_EMITTED",
            Event::SubscriberPanicked => "SUBSCRIBER_PANICKED",
            Event::ErrorHookPanicked => "ERROR_HOOK_PANICKED",

            Event::SimulatorStarted => "SIMULATOR_STARTED",
            Event::SimulatorStopped => "SIMULATOR_STOPPED",
            Event::SynthesisSkipped => "SYNTHESIS_SKIPPED",

            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::EventEmitted => Severity::Trace,
            Event::SubscriberPanicked | Event::ErrorHookPanicked | Event::SynthesisSkipped => {
                Severity::Warn
            }
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

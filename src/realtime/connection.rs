//! # Connection Lifecycle
//!
//! `disconnected -> connecting -> connected -> disconnected`.
//!
//! There is no error or reconnecting state: the transport is simulated
//! in-process and cannot fail. Every `connect` starts a new generation;
//! a connect timer only promotes the generation it was started for, so
//! a timer that survives a disconnect can never mark a later session
//! connected.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Connection status as shown to the UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable connection state machine
#[derive(Debug)]
pub struct ConnectionState {
    status: watch::Sender<ConnectionStatus>,
    generation: AtomicU64,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionState {
    pub fn new() -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            status,
            generation: AtomicU64::new(0),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Receiver that sees every status change from now on
    pub fn watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// `disconnected -> connecting`.
    ///
    /// Returns the new generation, or `None` if already connecting or
    /// connected.
    pub fn begin_connect(&self) -> Option<u64> {
        let mut started = None;
        self.status.send_if_modified(|status| {
            if *status != ConnectionStatus::Disconnected {
                return false;
            }
            *status = ConnectionStatus::Connecting;
            started = Some(self.generation.fetch_add(1, Ordering::AcqRel) + 1);
            true
        });
        started
    }

    /// `connecting -> connected`, only for the generation that is still current
    pub fn complete_connect(&self, generation: u64) -> bool {
        self.status.send_if_modified(|status| {
            if *status != ConnectionStatus::Connecting || !self.is_current(generation) {
                return false;
            }
            *status = ConnectionStatus::Connected;
            true
        })
    }

    /// Any state -> `disconnected`. Returns the status it left.
    pub fn disconnect(&self) -> ConnectionStatus {
        let mut previous = ConnectionStatus::Disconnected;
        self.status.send_if_modified(|status| {
            previous = *status;
            self.generation.fetch_add(1, Ordering::AcqRel);
            if *status == ConnectionStatus::Disconnected {
                return false;
            }
            *status = ConnectionStatus::Disconnected;
            true
        });
        previous
    }

    /// Whether `generation` is the latest session
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings() {
        assert_eq!(ConnectionStatus::Disconnected.as_str(), "disconnected");
        assert_eq!(ConnectionStatus::Connecting.to_string(), "connecting");
        assert_eq!(
            serde_json::to_string(&ConnectionStatus::Connected).unwrap(),
            "\"connected\""
        );
    }

    #[test]
    fn test_full_cycle() {
        let state = ConnectionState::new();
        assert_eq!(state.status(), ConnectionStatus::Disconnected);

        let generation = state.begin_connect().unwrap();
        assert_eq!(state.status(), ConnectionStatus::Connecting);
        assert!(!state.is_connected());

        assert!(state.complete_connect(generation));
        assert!(state.is_connected());

        assert_eq!(state.disconnect(), ConnectionStatus::Connected);
        assert_eq!(state.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_connect_is_idempotent() {
        let state = ConnectionState::new();
        let generation = state.begin_connect().unwrap();

        assert_eq!(state.begin_connect(), None);
        assert!(state.complete_connect(generation));
        assert_eq!(state.begin_connect(), None);
        assert!(!state.complete_connect(generation));
    }

    #[test]
    fn test_stale_generation_cannot_promote() {
        let state = ConnectionState::new();

        let first = state.begin_connect().unwrap();
        state.disconnect();
        let second = state.begin_connect().unwrap();

        assert_ne!(first, second);
        assert!(!state.complete_connect(first));
        assert_eq!(state.status(), ConnectionStatus::Connecting);
        assert!(state.complete_connect(second));
    }

    #[test]
    fn test_double_disconnect() {
        let state = ConnectionState::new();
        assert_eq!(state.disconnect(), ConnectionStatus::Disconnected);
        assert_eq!(state.disconnect(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_watch_sees_changes() {
        let state = ConnectionState::new();
        let mut rx = state.watch();
        assert!(!rx.has_changed().unwrap());

        state.begin_connect();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), ConnectionStatus::Connecting);

        // No-op transitions do not wake watchers
        state.begin_connect();
        assert!(!rx.has_changed().unwrap());
    }
}

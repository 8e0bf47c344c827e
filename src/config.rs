//! Realtime bus configuration
//!
//! Loaded from a JSON file; every field is optional. Durations are in
//! milliseconds.
//!
//! ```json
//! {
//!   "connect_delay_ms": 1000,
//!   "simulate_activity": true,
//!   "min_interval_ms": 5000,
//!   "max_interval_ms": 15000,
//!   "typing_stop_delay_ms": 3000,
//!   "seed": 42
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event};
use crate::realtime::errors::{RealtimeError, RealtimeResult};
use crate::realtime::simulator::SimulatorSettings;

/// Configuration for a [`RealtimeBus`](crate::realtime::RealtimeBus)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Simulated handshake latency between `connecting` and `connected`
    #[serde(default = "default_connect_delay_ms")]
    pub connect_delay_ms: u64,

    /// Whether to generate synthetic activity while connected
    #[serde(default = "default_simulate_activity")]
    pub simulate_activity: bool,

    /// Shortest wait between synthetic events
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,

    /// Longest wait between synthetic events
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// How long a synthetic typing indicator stays on
    #[serde(default = "default_typing_stop_delay_ms")]
    pub typing_stop_delay_ms: u64,

    /// Seed for reproducible synthetic activity (random if absent)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_connect_delay_ms() -> u64 {
    1000
}
fn default_simulate_activity() -> bool {
    true
}
fn default_min_interval_ms() -> u64 {
    5000
}
fn default_max_interval_ms() -> u64 {
    15000
}
fn default_typing_stop_delay_ms() -> u64 {
    3000
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            connect_delay_ms: default_connect_delay_ms(),
            simulate_activity: default_simulate_activity(),
            min_interval_ms: default_min_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            typing_stop_delay_ms: default_typing_stop_delay_ms(),
            seed: None,
        }
    }
}

impl RealtimeConfig {
    /// Config with synthetic activity turned off
    pub fn quiet() -> Self {
        Self {
            simulate_activity: false,
            ..Self::default()
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> RealtimeResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| RealtimeError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: RealtimeConfig = serde_json::from_str(&content)
            .map_err(|e| RealtimeError::ConfigError(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        let path_str = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", path_str.as_str())]);

        Ok(config)
    }

    /// Validate interval bounds
    pub fn validate(&self) -> RealtimeResult<()> {
        if self.min_interval_ms == 0 {
            return Err(RealtimeError::ConfigError("min_interval_ms must be > 0".into()));
        }

        if self.min_interval_ms > self.max_interval_ms {
            return Err(RealtimeError::ConfigError(format!(
                "min_interval_ms ({}) must not exceed max_interval_ms ({})",
                self.min_interval_ms, self.max_interval_ms
            )));
        }

        Ok(())
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }

    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            min_interval: Duration::from_millis(self.min_interval_ms),
            max_interval: Duration::from_millis(self.max_interval_ms),
            typing_stop_delay: Duration::from_millis(self.typing_stop_delay_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = RealtimeConfig::default();
        assert_eq!(config.connect_delay(), Duration::from_secs(1));
        assert!(config.simulate_activity);
        assert_eq!(config.simulator_settings(), SimulatorSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_quiet() {
        assert!(!RealtimeConfig::quiet().simulate_activity);
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(r#"{"connect_delay_ms": 250, "seed": 9}"#);
        let config = RealtimeConfig::load(file.path()).unwrap();

        assert_eq!(config.connect_delay_ms, 250);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.max_interval_ms, 15000);
    }

    #[test]
    fn test_load_rejects_bad_json() {
        let file = write_config("{not json");
        let err = RealtimeConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, RealtimeError::ConfigError(ref m) if m.starts_with("Invalid config JSON")));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = RealtimeConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, RealtimeError::ConfigError(_)));
    }

    #[test]
    fn test_validate_intervals() {
        let zero = RealtimeConfig {
            min_interval_ms: 0,
            ..RealtimeConfig::default()
        };
        assert!(zero.validate().is_err());

        let inverted = RealtimeConfig {
            min_interval_ms: 2000,
            max_interval_ms: 1000,
            ..RealtimeConfig::default()
        };
        assert!(inverted.validate().is_err());

        let fixed = RealtimeConfig {
            min_interval_ms: 1000,
            max_interval_ms: 1000,
            ..RealtimeConfig::default()
        };
        assert!(fixed.validate().is_ok());
    }
}

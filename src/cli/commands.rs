//! CLI command implementations

use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::config::RealtimeConfig;
use crate::observability::init_logging;
use crate::realtime::channel::{self, validate_channel};
use crate::realtime::RealtimeBus;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{write_json, write_response};

/// What a simulation run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationSummary {
    /// Events printed
    pub events: u64,
    /// Simulator cycles that elapsed
    pub cycles: u64,
}

/// Main entry point for the CLI
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    init_logging(&cli.log_level);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Simulate {
            config,
            duration_secs,
            seed,
            channels,
        } => simulate(config.as_deref(), Duration::from_secs(duration_secs), seed, &channels),
        Command::CheckConfig { config } => check_config(&config),
    }
}

/// Load and validate a config file, echoing the effective values
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = RealtimeConfig::load(config_path)?;
    write_response(serde_json::to_value(&config)?)
}

/// Connect a bus and print its events for `duration`
pub fn simulate(
    config_path: Option<&Path>,
    duration: Duration,
    seed: Option<u64>,
    channels: &[String],
) -> CliResult<()> {
    let mut config = match config_path {
        Some(path) => RealtimeConfig::load(path)?,
        None => RealtimeConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }

    let channels = resolve_channels(channels)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))?;

    let mut stdout = io::stdout();
    let summary = rt.block_on(run_simulation(config, duration, &channels, &mut stdout))?;

    write_response(json!({
        "events": summary.events,
        "cycles": summary.cycles,
        "channels": channels,
    }))
}

fn resolve_channels(requested: &[String]) -> CliResult<Vec<String>> {
    if requested.is_empty() {
        return Ok(channel::ALL.iter().map(|c| c.to_string()).collect());
    }

    for name in requested {
        validate_channel(name)?;
    }
    Ok(requested.to_vec())
}

/// Drive one bus session, writing status changes and events as JSON lines
pub async fn run_simulation<W: Write>(
    config: RealtimeConfig,
    duration: Duration,
    channels: &[String],
    out: &mut W,
) -> CliResult<SimulationSummary> {
    let bus = RealtimeBus::new(config);
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

    let mut subscriptions = Vec::with_capacity(channels.len());
    for name in channels {
        let tx = tx.clone();
        let label = name.clone();
        subscriptions.push(bus.subscribe(name, move |event| {
            let _ = tx.send(json!({
                "channel": label,
                "event": event.to_wire_format(),
            }));
        })?);
    }
    drop(tx);

    let mut status = bus.watch_status();
    bus.connect()?;
    let initial = *status.borrow_and_update();
    write_json(out, &json!({ "status": initial }))?;

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    let mut events = 0;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            Some(line) = rx.recv() => {
                write_json(out, &line)?;
                events += 1;
            }
            Ok(()) = status.changed() => {
                let current = *status.borrow_and_update();
                write_json(out, &json!({ "status": current }))?;
            }
        }
    }

    bus.disconnect();

    // Flush whatever was emitted before the disconnect
    while let Ok(line) = rx.try_recv() {
        write_json(out, &line)?;
        events += 1;
    }
    write_json(out, &json!({ "status": bus.status() }))?;

    let cycles = bus.simulator().cycles();
    drop(subscriptions);

    Ok(SimulationSummary { events, cycles })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> RealtimeConfig {
        RealtimeConfig {
            connect_delay_ms: 100,
            min_interval_ms: 50,
            max_interval_ms: 100,
            typing_stop_delay_ms: 20,
            seed: Some(11),
            ..RealtimeConfig::default()
        }
    }

    fn lines(buf: Vec<u8>) -> Vec<Value> {
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_resolve_channels() {
        assert_eq!(resolve_channels(&[]).unwrap().len(), 5);
        assert_eq!(
            resolve_channels(&["comments".to_string()]).unwrap(),
            vec!["comments".to_string()]
        );
        assert!(resolve_channels(&["".to_string()]).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_simulation_prints_events() {
        let mut buf = Vec::new();
        let channels = resolve_channels(&[]).unwrap();

        let summary = run_simulation(fast_config(), Duration::from_secs(5), &channels, &mut buf)
            .await
            .unwrap();

        let lines = lines(buf);
        assert_eq!(lines.first().unwrap()["status"], "connecting");
        assert_eq!(lines.last().unwrap()["status"], "disconnected");
        assert!(lines.iter().any(|l| l["status"] == "connected"));

        let events: Vec<_> = lines.iter().filter(|l| l.get("event").is_some()).collect();
        assert_eq!(events.len() as u64, summary.events);
        assert!(summary.events > 0);
        assert!(summary.cycles > 0);
        for line in events {
            let kind: crate::realtime::RealtimeEvent =
                serde_json::from_value(line["event"].clone()).unwrap();
            assert_eq!(line["channel"], kind.channel());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_simulation_quiet() {
        let mut buf = Vec::new();
        let config = RealtimeConfig {
            simulate_activity: false,
            ..fast_config()
        };

        let summary = run_simulation(config, Duration::from_secs(5), &["comments".to_string()], &mut buf)
            .await
            .unwrap();

        assert_eq!(summary, SimulationSummary { events: 0, cycles: 0 });
    }
}

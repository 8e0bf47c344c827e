//! CLI argument definitions using clap
//!
//! Commands:
//! - artboard-realtime simulate [--config <path>] [--duration-secs <n>] [--seed <n>] [--channel <name>]...
//! - artboard-realtime check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// artboard-realtime - simulated live activity for the artboard site
#[derive(Parser, Debug)]
#[command(name = "artboard-realtime")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Connect a bus, print synthetic events as JSON lines, then disconnect
    Simulate {
        /// Path to configuration file (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// How long to stay connected
        #[arg(long, default_value_t = 30)]
        duration_secs: u64,

        /// Seed for reproducible activity (overrides the config file)
        #[arg(long)]
        seed: Option<u64>,

        /// Channels to print (repeatable, default: all)
        #[arg(long = "channel")]
        channels: Vec<String>,
    },

    /// Load and validate a configuration file
    CheckConfig {
        /// Path to configuration file
        #[arg(long)]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simulate_defaults() {
        let cli = Cli::try_parse_from(["artboard-realtime", "simulate"]).unwrap();
        assert_eq!(cli.log_level, "info");
        match cli.command {
            Command::Simulate {
                config,
                duration_secs,
                seed,
                channels,
            } => {
                assert!(config.is_none());
                assert_eq!(duration_secs, 30);
                assert!(seed.is_none());
                assert!(channels.is_empty());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_repeated_channels() {
        let cli = Cli::try_parse_from([
            "artboard-realtime",
            "simulate",
            "--channel",
            "comments",
            "--channel",
            "typing",
            "--seed",
            "7",
        ])
        .unwrap();

        match cli.command {
            Command::Simulate { channels, seed, .. } => {
                assert_eq!(channels, vec!["comments", "typing"]);
                assert_eq!(seed, Some(7));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_check_config_requires_path() {
        assert!(Cli::try_parse_from(["artboard-realtime", "check-config"]).is_err());
    }
}

//! CLI module for artboard-realtime
//!
//! Provides command-line interface for:
//! - simulate: run a bus with synthetic activity and print its events
//! - check-config: validate a configuration file

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_config, run, run_command, run_simulation, simulate, SimulationSummary};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_error, write_json, write_response};

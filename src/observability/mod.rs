//! Observability for the realtime bus
//!
//! Lifecycle and delivery events are typed ([`Event`]) and written
//! through `tracing`. Fields are rendered in alphabetical key order so
//! log lines for the same event always look the same.
//!
//! # Usage
//!
//! ```ignore
//! use artboard_realtime::observability::{init_logging, log_event_with_fields, Event};
//!
//! init_logging("info");
//! log_event_with_fields(Event::BusConnected, &[("delay_ms", "1000")]);
//! ```

mod events;

pub use events::{Event, Severity};

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a fmt subscriber on stderr. `RUST_LOG` wins over `default_filter`.
///
/// Only the first call has an effect.
pub fn init_logging(default_filter: &str) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let rendered = render_fields(fields);
    let code = event.as_str();

    match event.severity() {
        Severity::Trace => tracing::trace!(event = code, "{}", rendered),
        Severity::Info => tracing::info!(event = code, "{}", rendered),
        Severity::Warn => tracing::warn!(event = code, "{}", rendered),
    }
}

fn render_fields(fields: &[(&str, &str)]) -> String {
    let mut sorted: Vec<_> = fields.iter().collect();
    sorted.sort_by_key(|(k, _)| *k);

    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}

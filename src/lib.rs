//! artboard-realtime - live activity for the artboard community site
//!
//! An in-process event bus that stands in for a realtime socket:
//! comments, direct messages, reactions, typing indicators and presence
//! are fanned out to subscribed UI components, optionally fed by a
//! simulator that makes the demo site feel busy.

pub mod cli;
pub mod config;
pub mod observability;
pub mod realtime;

pub use config::RealtimeConfig;
pub use realtime::{RealtimeBus, RealtimeEvent, Subscription};

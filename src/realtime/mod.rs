//! # Realtime Module
//!
//! In-process stand-in for the site's live socket connection.
//!
//! ## Architecture
//!
//! - **Registry**: channel -> ordered subscribers
//! - **Dispatcher**: synchronous, panic-isolated fan-out
//! - **Connection**: `disconnected -> connecting -> connected` state machine
//! - **Simulator**: timer-driven synthetic comments, messages, reactions,
//!   typing and presence
//! - **Bus**: the owned facade tying these together
//! - **Filters**: typed, key-filtered subscription helpers
//! - **Presence**: online-user board built on the presence channel

pub mod activity;
pub mod bus;
pub mod channel;
pub mod connection;
pub mod dispatcher;
pub mod errors;
pub mod event;
pub mod filters;
pub mod presence;
pub mod registry;
pub mod simulator;

pub use activity::{ActivitySource, Archetype, Persona, RandomActivity};
pub use bus::{Emitter, RealtimeBus};
pub use connection::{ConnectionState, ConnectionStatus};
pub use dispatcher::{DeliveryFailure, DispatchResult, Dispatcher};
pub use errors::{RealtimeError, RealtimeResult, SynthesisError};
pub use event::{
    CommentPayload, ContextField, EventKind, MessagePayload, MessageType, PresencePayload,
    ReactionPayload, RealtimeEvent, TargetType, TypingPayload,
};
pub use filters::{ContextFilter, ReactionAction};
pub use presence::{PresenceBoard, PresenceEntry};
pub use registry::{Subscription, SubscriptionId, SubscriptionRegistry};
pub use simulator::{ActivitySimulator, SimulatorSettings};

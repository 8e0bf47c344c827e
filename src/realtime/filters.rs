//! # Typed Subscriptions
//!
//! Convenience wrappers over [`RealtimeBus::subscribe`] that pre-filter
//! by a context key and hand the caller a typed payload. A `None` key
//! accepts everything on the channel. Each helper registers exactly one
//! underlying subscription and returns its handle.

use super::bus::RealtimeBus;
use super::channel;
use super::errors::RealtimeResult;
use super::event::{
    CommentPayload, ContextField, MessagePayload, PresencePayload, ReactionPayload, RealtimeEvent,
    TypingPayload,
};
use super::registry::Subscription;

/// Whether a reaction was added or removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    Added,
    Removed,
}

/// Key filter applied before a handler runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextFilter {
    pub field: ContextField,
    /// `None` matches every event
    pub key: Option<String>,
}

impl ContextFilter {
    pub fn new(field: ContextField, key: Option<&str>) -> Self {
        Self {
            field,
            key: key.map(str::to_string),
        }
    }

    /// Check if an event passes this filter.
    ///
    /// Events that lack the field never match a keyed filter.
    pub fn matches(&self, event: &RealtimeEvent) -> bool {
        match &self.key {
            None => true,
            Some(key) => event.field(self.field) == Some(key.as_str()),
        }
    }
}

impl RealtimeBus {
    /// Subscribe to `channel`, invoking `handler` only for events whose
    /// `field` equals `key` (or every event when `key` is `None`)
    pub fn subscribe_filtered<F>(
        &self,
        channel: &str,
        field: ContextField,
        key: Option<&str>,
        handler: F,
    ) -> RealtimeResult<Subscription>
    where
        F: Fn(&RealtimeEvent) + Send + Sync + 'static,
    {
        let filter = ContextFilter::new(field, key);
        self.subscribe(channel, move |event| {
            if filter.matches(event) {
                handler(event);
            }
        })
    }

    /// New comments, optionally for one listing / thread
    pub fn on_comments<F>(&self, context_id: Option<&str>, handler: F) -> RealtimeResult<Subscription>
    where
        F: Fn(&CommentPayload) + Send + Sync + 'static,
    {
        self.subscribe_filtered(channel::COMMENTS, ContextField::ContextId, context_id, move |event| {
            if let RealtimeEvent::CommentAdded(comment) = event {
                handler(comment);
            }
        })
    }

    /// Incoming messages, optionally for one conversation
    pub fn on_messages<F>(
        &self,
        conversation_id: Option<&str>,
        handler: F,
    ) -> RealtimeResult<Subscription>
    where
        F: Fn(&MessagePayload) + Send + Sync + 'static,
    {
        self.subscribe_filtered(
            channel::MESSAGES,
            ContextField::ConversationId,
            conversation_id,
            move |event| {
                if let RealtimeEvent::MessageReceived(message) = event {
                    handler(message);
                }
            },
        )
    }

    /// Typing indicators, optionally for one conversation
    pub fn on_typing<F>(&self, conversation_id: Option<&str>, handler: F) -> RealtimeResult<Subscription>
    where
        F: Fn(&TypingPayload) + Send + Sync + 'static,
    {
        self.subscribe_filtered(
            channel::TYPING,
            ContextField::ConversationId,
            conversation_id,
            move |event| {
                if let RealtimeEvent::UserTyping(typing) = event {
                    handler(typing);
                }
            },
        )
    }

    /// Reactions added or removed, optionally on one target
    pub fn on_reactions<F>(&self, target_id: Option<&str>, handler: F) -> RealtimeResult<Subscription>
    where
        F: Fn(ReactionAction, &ReactionPayload) + Send + Sync + 'static,
    {
        self.subscribe_filtered(channel::REACTIONS, ContextField::TargetId, target_id, move |event| {
            match event {
                RealtimeEvent::ReactionAdded(r) => handler(ReactionAction::Added, r),
                RealtimeEvent::ReactionRemoved(r) => handler(ReactionAction::Removed, r),
                _ => {}
            }
        })
    }

    /// Presence changes, optionally for one user
    pub fn on_presence<F>(&self, user_id: Option<&str>, handler: F) -> RealtimeResult<Subscription>
    where
        F: Fn(&PresencePayload) + Send + Sync + 'static,
    {
        self.subscribe_filtered(channel::PRESENCE, ContextField::UserId, user_id, move |event| {
            if let RealtimeEvent::PresenceUpdate(presence) = event {
                handler(presence);
            }
        })
    }
}

//! # Real-Time Events
//!
//! Envelopes delivered to subscribers. Every envelope serializes as
//! `{"type": ..., "data": {...}}` with camelCase payload fields, which is
//! the shape the page components already consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::channel;

/// Avatar used when a payload is built without one
pub fn default_avatar_url(user_id: &str) -> String {
    format!("https://i.pravatar.cc/150?u={}", user_id)
}

/// A comment posted on a listing, artist profile or thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    pub id: String,
    /// HTML-ish body, sanitized by the renderer
    pub body: String,
    pub author_id: String,
    pub author: String,
    pub author_display_name: String,
    pub avatar_url: String,
    pub likes: u32,
    pub created: DateTime<Utc>,
    /// Listing, artist or thread the comment belongs to
    pub context_id: String,
    #[serde(default)]
    pub replies: Vec<CommentPayload>,
}

impl CommentPayload {
    /// Create a fresh comment with no likes or replies
    pub fn new(
        id: impl Into<String>,
        context_id: impl Into<String>,
        author_id: impl Into<String>,
        author: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let author_id = author_id.into();
        let author = author.into();
        Self {
            id: id.into(),
            body: body.into(),
            avatar_url: default_avatar_url(&author_id),
            author_id,
            author_display_name: author.clone(),
            author,
            likes: 0,
            created: Utc::now(),
            context_id: context_id.into(),
            replies: Vec::new(),
        }
    }
}

/// Kind of direct message body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
}

/// A direct message landing in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: String,
    pub content: String,
    pub sender_id: String,
    pub sender: String,
    pub sender_display_name: String,
    pub avatar_url: String,
    pub timestamp: DateTime<Utc>,
    pub conversation_id: String,
    pub is_read: bool,
    pub message_type: MessageType,
}

impl MessagePayload {
    /// Create an unread text message
    pub fn new(
        id: impl Into<String>,
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let sender_id = sender_id.into();
        let sender = sender.into();
        Self {
            id: id.into(),
            content: content.into(),
            avatar_url: default_avatar_url(&sender_id),
            sender_id,
            sender_display_name: sender.clone(),
            sender,
            timestamp: Utc::now(),
            conversation_id: conversation_id.into(),
            is_read: false,
            message_type: MessageType::Text,
        }
    }
}

/// What a reaction is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Post,
    Comment,
    Message,
}

impl TargetType {
    pub const ALL: [TargetType; 3] = [TargetType::Post, TargetType::Comment, TargetType::Message];
}

/// An emoji reaction on a post, comment or message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionPayload {
    pub target_id: String,
    pub target_type: TargetType,
    pub reaction: String,
    pub user_id: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

impl ReactionPayload {
    pub fn new(
        target_id: impl Into<String>,
        target_type: TargetType,
        reaction: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            target_type,
            reaction: reaction.into(),
            user_id: user_id.into(),
            username: username.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Typing indicator for one user in one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub user_id: String,
    pub username: String,
    pub conversation_id: String,
    pub is_typing: bool,
}

/// Online state change for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub user_id: String,
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

impl PresencePayload {
    pub fn online(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_online: true,
            last_seen: Utc::now(),
        }
    }

    pub fn offline(user_id: impl Into<String>) -> Self {
        Self {
            is_online: false,
            ..Self::online(user_id)
        }
    }
}

/// Event envelope. The variant is the envelope `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RealtimeEvent {
    CommentAdded(CommentPayload),
    MessageReceived(MessagePayload),
    ReactionAdded(ReactionPayload),
    ReactionRemoved(ReactionPayload),
    UserTyping(TypingPayload),
    PresenceUpdate(PresencePayload),
}

/// Payload-free discriminant of [`RealtimeEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CommentAdded,
    MessageReceived,
    ReactionAdded,
    ReactionRemoved,
    UserTyping,
    PresenceUpdate,
}

impl EventKind {
    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::CommentAdded => "comment_added",
            EventKind::MessageReceived => "message_received",
            EventKind::ReactionAdded => "reaction_added",
            EventKind::ReactionRemoved => "reaction_removed",
            EventKind::UserTyping => "user_typing",
            EventKind::PresenceUpdate => "presence_update",
        }
    }

    /// Channel this kind of event is published on
    pub fn channel(&self) -> &'static str {
        match self {
            EventKind::CommentAdded => channel::COMMENTS,
            EventKind::MessageReceived => channel::MESSAGES,
            EventKind::ReactionAdded | EventKind::ReactionRemoved => channel::REACTIONS,
            EventKind::UserTyping => channel::TYPING,
            EventKind::PresenceUpdate => channel::PRESENCE,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload key a typed subscription can filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextField {
    /// Listing / thread a comment belongs to
    ContextId,
    /// Message or typing conversation
    ConversationId,
    /// Reaction target
    TargetId,
    /// Acting user (author, sender, reactor, typist, presence subject)
    UserId,
}

impl RealtimeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            RealtimeEvent::CommentAdded(_) => EventKind::CommentAdded,
            RealtimeEvent::MessageReceived(_) => EventKind::MessageReceived,
            RealtimeEvent::ReactionAdded(_) => EventKind::ReactionAdded,
            RealtimeEvent::ReactionRemoved(_) => EventKind::ReactionRemoved,
            RealtimeEvent::UserTyping(_) => EventKind::UserTyping,
            RealtimeEvent::PresenceUpdate(_) => EventKind::PresenceUpdate,
        }
    }

    /// Channel this event belongs on
    pub fn channel(&self) -> &'static str {
        self.kind().channel()
    }

    /// Look up a filterable key. `None` when the variant has no such field.
    pub fn field(&self, field: ContextField) -> Option<&str> {
        use ContextField::*;
        use RealtimeEvent::*;

        match (self, field) {
            (CommentAdded(c), ContextId) => Some(&c.context_id),
            (CommentAdded(c), UserId) => Some(&c.author_id),
            (MessageReceived(m), ConversationId) => Some(&m.conversation_id),
            (MessageReceived(m), UserId) => Some(&m.sender_id),
            (ReactionAdded(r) | ReactionRemoved(r), TargetId) => Some(&r.target_id),
            (ReactionAdded(r) | ReactionRemoved(r), UserId) => Some(&r.user_id),
            (UserTyping(t), ConversationId) => Some(&t.conversation_id),
            (UserTyping(t), UserId) => Some(&t.user_id),
            (PresenceUpdate(p), UserId) => Some(&p.user_id),
            _ => None,
        }
    }

    /// Serialize to the `{type, data}` envelope
    pub fn to_wire_format(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_and_channel() {
        let comment = RealtimeEvent::CommentAdded(CommentPayload::new("c1", "x", "u1", "ana", "hi"));
        assert_eq!(comment.kind(), EventKind::CommentAdded);
        assert_eq!(comment.channel(), "comments");

        let removed = RealtimeEvent::ReactionRemoved(ReactionPayload::new(
            "p1",
            TargetType::Post,
            "🎨",
            "u2",
            "bo",
        ));
        assert_eq!(removed.kind().as_str(), "reaction_removed");
        assert_eq!(removed.channel(), "reactions");

        let presence = RealtimeEvent::PresenceUpdate(PresencePayload::offline("u3"));
        assert_eq!(presence.channel(), "presence");
    }

    #[test]
    fn test_comment_wire_format() {
        let event = RealtimeEvent::CommentAdded(CommentPayload::new(
            "c1",
            "listing-7",
            "u1",
            "ana",
            "<p>Love the palette</p>",
        ));

        let wire = event.to_wire_format();
        assert_eq!(wire["type"], "comment_added");
        assert_eq!(wire["data"]["contextId"], "listing-7");
        assert_eq!(wire["data"]["authorDisplayName"], "ana");
        assert_eq!(wire["data"]["avatarUrl"], "https://i.pravatar.cc/150?u=u1");
        assert_eq!(wire["data"]["likes"], 0);
        assert_eq!(wire["data"]["replies"], json!([]));
        assert!(wire["data"]["created"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_message_and_reaction_enums() {
        let msg = RealtimeEvent::MessageReceived(MessagePayload::new("m1", "conv-1", "u1", "ana", "hey"));
        let wire = msg.to_wire_format();
        assert_eq!(wire["data"]["messageType"], "text");
        assert_eq!(wire["data"]["isRead"], false);

        let reaction = RealtimeEvent::ReactionAdded(ReactionPayload::new(
            "m1",
            TargetType::Message,
            "❤️",
            "u2",
            "bo",
        ));
        assert_eq!(reaction.to_wire_format()["data"]["targetType"], "message");
    }

    #[test]
    fn test_parse_typing_envelope() {
        let raw = json!({
            "type": "user_typing",
            "data": {
                "userId": "u1",
                "username": "ana",
                "conversationId": "conv-1",
                "isTyping": true
            }
        });

        let event: RealtimeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(
            event,
            RealtimeEvent::UserTyping(TypingPayload {
                user_id: "u1".into(),
                username: "ana".into(),
                conversation_id: "conv-1".into(),
                is_typing: true,
            })
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let raw = json!({"type": "listing_sold", "data": {}});
        assert!(serde_json::from_value::<RealtimeEvent>(raw).is_err());
    }

    #[test]
    fn test_field_lookup() {
        let comment = RealtimeEvent::CommentAdded(CommentPayload::new("c1", "thread-1", "u1", "ana", "hi"));
        assert_eq!(comment.field(ContextField::ContextId), Some("thread-1"));
        assert_eq!(comment.field(ContextField::UserId), Some("u1"));
        assert_eq!(comment.field(ContextField::ConversationId), None);

        let typing = RealtimeEvent::UserTyping(TypingPayload {
            user_id: "u2".into(),
            username: "bo".into(),
            conversation_id: "conv-9".into(),
            is_typing: false,
        });
        assert_eq!(typing.field(ContextField::ConversationId), Some("conv-9"));
        assert_eq!(typing.field(ContextField::TargetId), None);
    }
}

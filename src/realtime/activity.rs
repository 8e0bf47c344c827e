//! # Synthetic Activity
//!
//! Archetypes the simulator can produce and the payload source that
//! fills them in. The source is a trait so tests and demos can swap in
//! something deterministic.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::channel;
use super::errors::SynthesisError;
use super::event::{
    default_avatar_url, CommentPayload, EventKind, MessagePayload, PresencePayload, RealtimeEvent,
    ReactionPayload, TargetType, TypingPayload,
};

/// The closed set of things the simulator can make happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Archetype {
    NewComment,
    NewMessage,
    NewReaction,
    UserTyping,
    UserOnline,
    UserOffline,
}

impl Archetype {
    pub const ALL: [Archetype; 6] = [
        Archetype::NewComment,
        Archetype::NewMessage,
        Archetype::NewReaction,
        Archetype::UserTyping,
        Archetype::UserOnline,
        Archetype::UserOffline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::NewComment => "new_comment",
            Archetype::NewMessage => "new_message",
            Archetype::NewReaction => "new_reaction",
            Archetype::UserTyping => "user_typing",
            Archetype::UserOnline => "user_online",
            Archetype::UserOffline => "user_offline",
        }
    }

    /// Channel events of this archetype are emitted on
    pub fn channel(&self) -> &'static str {
        match self {
            Archetype::NewComment => channel::COMMENTS,
            Archetype::NewMessage => channel::MESSAGES,
            Archetype::NewReaction => channel::REACTIONS,
            Archetype::UserTyping => channel::TYPING,
            Archetype::UserOnline | Archetype::UserOffline => channel::PRESENCE,
        }
    }

    /// Envelope type this archetype produces
    pub fn event_kind(&self) -> EventKind {
        match self {
            Archetype::NewComment => EventKind::CommentAdded,
            Archetype::NewMessage => EventKind::MessageReceived,
            Archetype::NewReaction => EventKind::ReactionAdded,
            Archetype::UserTyping => EventKind::UserTyping,
            Archetype::UserOnline | Archetype::UserOffline => EventKind::PresenceUpdate,
        }
    }

    /// Whether `event` is a well-formed instance of this archetype
    pub fn accepts(&self, event: &RealtimeEvent) -> bool {
        match (self, event) {
            (Archetype::UserOnline, RealtimeEvent::PresenceUpdate(p)) => p.is_online,
            (Archetype::UserOffline, RealtimeEvent::PresenceUpdate(p)) => !p.is_online,
            (Archetype::UserTyping, RealtimeEvent::UserTyping(t)) => t.is_typing,
            _ => event.kind() == self.event_kind(),
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces payloads for the simulator
pub trait ActivitySource: Send {
    /// Build one event of the given archetype.
    ///
    /// For `UserTyping` return the "started typing" event; the simulator
    /// schedules the matching stop itself.
    fn synthesize(&mut self, archetype: Archetype) -> Result<RealtimeEvent, SynthesisError>;
}

/// A community member the generator can act as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

impl Persona {
    pub fn new(id: &str, username: &str, display_name: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

fn default_personas() -> Vec<Persona> {
    vec![
        Persona::new("artist-1", "inkwell", "Mara Inkwell"),
        Persona::new("artist-2", "ochre_and_umber", "Tomas Ochre"),
        Persona::new("artist-3", "glazeworks", "Priya Glaze"),
        Persona::new("artist-4", "linocut_lou", "Lou Carver"),
        Persona::new("artist-5", "fresco.fen", "Fen Alder"),
    ]
}

const COMMENT_BODIES: &[&str] = &[
    "<p>The brushwork on this is incredible.</p>",
    "<p>Is this piece still available?</p>",
    "<p>Love how the light falls across the canvas.</p>",
    "<p>What paper did you use for this print?</p>",
    "<p>This would look perfect in my studio.</p>",
    "<p>The colour palette is so calming.</p>",
];

const MESSAGE_BODIES: &[&str] = &[
    "<p>Hi! Would you consider a commission?</p>",
    "<p>Thanks for the quick shipping, it arrived safely.</p>",
    "<p>Do you offer framing for this one?</p>",
    "<p>Are you showing at the spring fair?</p>",
    "<p>Could you send a photo of the back?</p>",
];

const REACTIONS: &[&str] = &["❤️", "🔥", "🎨", "👏", "😍", "✨"];

/// Random but well-formed payloads drawn from canned pools
#[derive(Debug)]
pub struct RandomActivity {
    rng: StdRng,
    personas: Vec<Persona>,
    contexts: Vec<String>,
    conversations: Vec<String>,
}

impl RandomActivity {
    /// Entropy-seeded source
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Reproducible source
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            personas: default_personas(),
            contexts: vec![
                "listing-1".to_string(),
                "listing-2".to_string(),
                "artist-1".to_string(),
            ],
            conversations: vec!["conv-1".to_string(), "conv-2".to_string()],
        }
    }

    pub fn with_personas(mut self, personas: Vec<Persona>) -> Self {
        self.personas = personas;
        self
    }

    /// Comment threads new comments land in
    pub fn with_contexts(mut self, contexts: Vec<String>) -> Self {
        self.contexts = contexts;
        self
    }

    /// Conversations messages and typing indicators land in
    pub fn with_conversations(mut self, conversations: Vec<String>) -> Self {
        self.conversations = conversations;
        self
    }

    fn persona(&mut self) -> Result<Persona, SynthesisError> {
        self.personas
            .choose(&mut self.rng)
            .cloned()
            .ok_or(SynthesisError::EmptyPool("personas"))
    }

    fn pick(
        rng: &mut StdRng,
        pool: &[String],
        what: &'static str,
    ) -> Result<String, SynthesisError> {
        pool.choose(rng).cloned().ok_or(SynthesisError::EmptyPool(what))
    }

    fn phrase(&mut self, pool: &[&'static str]) -> &'static str {
        pool.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn short_id(&mut self, prefix: &str) -> String {
        format!("{}-{:08x}", prefix, self.rng.gen::<u32>())
    }

    fn comment(&mut self) -> Result<RealtimeEvent, SynthesisError> {
        let author = self.persona()?;
        let context_id = Self::pick(&mut self.rng, &self.contexts, "contexts")?;
        let likes = self.rng.gen_range(0..=12);

        Ok(RealtimeEvent::CommentAdded(CommentPayload {
            id: self.short_id("comment"),
            body: self.phrase(COMMENT_BODIES).to_string(),
            avatar_url: default_avatar_url(&author.id),
            author_id: author.id,
            author: author.username,
            author_display_name: author.display_name,
            likes,
            created: Utc::now(),
            context_id,
            replies: Vec::new(),
        }))
    }

    fn message(&mut self) -> Result<RealtimeEvent, SynthesisError> {
        let sender = self.persona()?;
        let conversation_id = Self::pick(&mut self.rng, &self.conversations, "conversations")?;

        let mut payload = MessagePayload::new(
            self.short_id("msg"),
            conversation_id,
            sender.id,
            sender.username,
            self.phrase(MESSAGE_BODIES),
        );
        payload.sender_display_name = sender.display_name;
        Ok(RealtimeEvent::MessageReceived(payload))
    }

    fn reaction(&mut self) -> Result<RealtimeEvent, SynthesisError> {
        let user = self.persona()?;
        let target_type = *TargetType::ALL
            .choose(&mut self.rng)
            .ok_or(SynthesisError::EmptyPool("target types"))?;
        let target_id = match target_type {
            TargetType::Comment => self.short_id("comment"),
            TargetType::Message => self.short_id("msg"),
            TargetType::Post => Self::pick(&mut self.rng, &self.contexts, "contexts")?,
        };

        Ok(RealtimeEvent::ReactionAdded(ReactionPayload::new(
            target_id,
            target_type,
            self.phrase(REACTIONS),
            user.id,
            user.username,
        )))
    }

    fn typing(&mut self) -> Result<RealtimeEvent, SynthesisError> {
        let user = self.persona()?;
        let conversation_id = Self::pick(&mut self.rng, &self.conversations, "conversations")?;

        Ok(RealtimeEvent::UserTyping(TypingPayload {
            user_id: user.id,
            username: user.username,
            conversation_id,
            is_typing: true,
        }))
    }

    fn presence(&mut self, online: bool) -> Result<RealtimeEvent, SynthesisError> {
        let user = self.persona()?;
        let payload = if online {
            PresencePayload::online(user.id)
        } else {
            PresencePayload::offline(user.id)
        };
        Ok(RealtimeEvent::PresenceUpdate(payload))
    }
}

impl Default for RandomActivity {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivitySource for RandomActivity {
    fn synthesize(&mut self, archetype: Archetype) -> Result<RealtimeEvent, SynthesisError> {
        match archetype {
            Archetype::NewComment => self.comment(),
            Archetype::NewMessage => self.message(),
            Archetype::NewReaction => self.reaction(),
            Archetype::UserTyping => self.typing(),
            Archetype::UserOnline => self.presence(true),
            Archetype::UserOffline => self.presence(false),
        }
    }
}

//! # Channels
//!
//! Channels are plain string keys. They exist only while something is
//! subscribed to them.

use super::errors::{RealtimeError, RealtimeResult};

/// New comments on listings, artists and posts
pub const COMMENTS: &str = "comments";
/// Direct messages
pub const MESSAGES: &str = "messages";
/// Reactions added to or removed from posts, comments and messages
pub const REACTIONS: &str = "reactions";
/// Typing indicators
pub const TYPING: &str = "typing";
/// Online / offline updates
pub const PRESENCE: &str = "presence";

/// Every channel the site knows about, in display order
pub const ALL: [&str; 5] = [COMMENTS, MESSAGES, REACTIONS, TYPING, PRESENCE];

/// Reject empty or whitespace-only channel names
pub fn validate_channel(channel: &str) -> RealtimeResult<()> {
    if channel.trim().is_empty() {
        return Err(RealtimeError::InvalidChannel(channel.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_channel() {
        assert!(validate_channel(COMMENTS).is_ok());
        assert!(validate_channel("listing:42").is_ok());

        assert_eq!(
            validate_channel(""),
            Err(RealtimeError::InvalidChannel(String::new()))
        );
        assert!(validate_channel(" \t").is_err());
    }

    #[test]
    fn test_known_channels_are_valid() {
        for channel in ALL {
            assert!(validate_channel(channel).is_ok());
        }
    }
}

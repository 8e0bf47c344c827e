//! # Presence Board
//!
//! Who is online, folded from `presence_update` events. Feeds the
//! "online now" badges in the sidebar.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use super::bus::RealtimeBus;
use super::errors::RealtimeResult;
use super::event::PresencePayload;
use super::registry::Subscription;

/// Last known presence of one user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEntry {
    pub is_online: bool,
    pub last_seen: DateTime<Utc>,
}

/// Presence state by user ID
#[derive(Debug, Default)]
pub struct PresenceBoard {
    entries: RwLock<HashMap<String, PresenceEntry>>,
}

impl PresenceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep this board up to date from the bus's presence channel
    pub fn attach(self: &Arc<Self>, bus: &RealtimeBus) -> RealtimeResult<Subscription> {
        let board = Arc::clone(self);
        bus.on_presence(None, move |update| board.apply(update))
    }

    /// Fold one update in. Updates older than what we already have are ignored.
    pub fn apply(&self, update: &PresencePayload) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        let incoming = PresenceEntry {
            is_online: update.is_online,
            last_seen: update.last_seen,
        };

        match entries.get_mut(&update.user_id) {
            Some(existing) if existing.last_seen > incoming.last_seen => {}
            Some(existing) => *existing = incoming,
            None => {
                entries.insert(update.user_id.clone(), incoming);
            }
        }
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.get(user_id).is_some_and(|e| e.is_online)
    }

    pub fn last_seen(&self, user_id: &str) -> Option<DateTime<Utc>> {
        self.get(user_id).map(|e| e.last_seen)
    }

    pub fn get(&self, user_id: &str) -> Option<PresenceEntry> {
        self.entries.read().ok().and_then(|e| e.get(user_id).copied())
    }

    /// Online user IDs, sorted
    pub fn online_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .entries
            .read()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, e)| e.is_online)
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default();
        users.sort();
        users
    }

    pub fn count_online(&self) -> usize {
        self.entries
            .read()
            .map(|e| e.values().filter(|p| p.is_online).count())
            .unwrap_or(0)
    }

    /// Drop users who went offline before `cutoff`
    pub fn forget_offline_before(&self, cutoff: DateTime<Utc>) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, e| e.is_online || e.last_seen >= cutoff);
        before - entries.len()
    }
}

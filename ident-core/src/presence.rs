//! Ephemeral typing presence.
//!
//! Tracks who is typing in each conversation. Entries carry their own
//! expiry and are evicted lazily at read time; nothing here is
//! persisted, and correctness never depends on an explicit stop —
//! only UI promptness does.

use dashmap::DashMap;
use ident_types::{ConversationId, UserId};
use std::time::{Duration, Instant};

/// Default typing window: an entry not refreshed for this long is gone.
pub const TYPING_WINDOW: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
struct TypingEntry {
    user: UserId,
    expires_at: Instant,
}

/// Per-conversation typing sets with timeout-based eviction.
///
/// Mutations for one conversation serialize on its map entry, so
/// start/stop from the same user cannot reorder.
pub struct PresenceAggregator {
    typing: DashMap<ConversationId, Vec<TypingEntry>>,
    window: Duration,
}

impl std::fmt::Debug for PresenceAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceAggregator")
            .field("conversations", &self.typing.len())
            .field("window", &self.window)
            .finish()
    }
}

impl Default for PresenceAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceAggregator {
    /// Create an aggregator with the standard 2-second window.
    pub fn new() -> Self {
        Self::with_window(TYPING_WINDOW)
    }

    /// Create an aggregator with a custom window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            typing: DashMap::new(),
            window,
        }
    }

    /// Record that `user` is typing in `conversation`.
    ///
    /// Inserts or refreshes the entry; a refresh keeps the user's
    /// original position (first-to-start ordering is stable). Returns
    /// the conversation's current typing set.
    pub fn start_typing(&self, conversation: ConversationId, user: UserId) -> Vec<UserId> {
        let now = Instant::now();
        let mut entries = self.typing.entry(conversation).or_default();
        entries.retain(|e| e.expires_at > now);

        let expires_at = now + self.window;
        match entries.iter_mut().find(|e| e.user == user) {
            Some(entry) => entry.expires_at = expires_at,
            None => entries.push(TypingEntry { user, expires_at }),
        }

        entries.iter().map(|e| e.user.clone()).collect()
    }

    /// Remove `user` from `conversation`'s typing set immediately.
    ///
    /// Returns the remaining set, which may be empty.
    pub fn stop_typing(&self, conversation: &ConversationId, user: &UserId) -> Vec<UserId> {
        let now = Instant::now();
        match self.typing.get_mut(conversation) {
            Some(mut entries) => {
                entries.retain(|e| e.expires_at > now && &e.user != user);
                entries.iter().map(|e| e.user.clone()).collect()
            }
            None => Vec::new(),
        }
    }

    /// The current typing set of a conversation, expired entries
    /// evicted, first-to-start first.
    pub fn typing_users(&self, conversation: &ConversationId) -> Vec<UserId> {
        let now = Instant::now();
        match self.typing.get_mut(conversation) {
            Some(mut entries) => {
                entries.retain(|e| e.expires_at > now);
                entries.iter().map(|e| e.user.clone()).collect()
            }
            None => Vec::new(),
        }
    }

    /// Evict expired entries everywhere and drop empty conversations.
    ///
    /// Returns how many entries were evicted. Purely a memory bound —
    /// reads are already correct without it.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        self.typing.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.expires_at > now);
            evicted += before - entries.len();
            !entries.is_empty()
        });
        if evicted > 0 {
            tracing::debug!("Typing sweep evicted {} stale entries", evicted);
        }
        evicted
    }
}

/// Render a typing set as a display string.
///
/// 1 user: "A is typing"; 2: "A and B are typing"; 3: "A, B, and C are
/// typing"; 4 or more: "A, B, and N-2 others are typing". The empty set
/// renders as an empty string.
pub fn render_typing(users: &[UserId]) -> String {
    match users {
        [] => String::new(),
        [a] => format!("{} is typing", a),
        [a, b] => format!("{} and {} are typing", a, b),
        [a, b, c] => format!("{}, {}, and {} are typing", a, b, c),
        [a, b, rest @ ..] => {
            format!("{}, {}, and {} others are typing", a, b, rest.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ident_types::GroupId;

    fn user(name: &str) -> UserId {
        UserId::new(name)
    }

    fn conv() -> ConversationId {
        ConversationId::direct(user("alice"), user("bob"))
    }

    #[test]
    fn start_typing_returns_current_set() {
        let presence = PresenceAggregator::new();
        let set = presence.start_typing(conv(), user("alice"));
        assert_eq!(set, vec![user("alice")]);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let presence = PresenceAggregator::new();
        let c = ConversationId::group(GroupId::new());
        presence.start_typing(c.clone(), user("alice"));
        presence.start_typing(c.clone(), user("bob"));
        presence.start_typing(c.clone(), user("charlie"));

        // A refresh keeps alice in first position
        let set = presence.start_typing(c, user("alice"));
        assert_eq!(set, vec![user("alice"), user("bob"), user("charlie")]);
    }

    #[test]
    fn stop_typing_removes_immediately() {
        let presence = PresenceAggregator::new();
        let c = conv();
        presence.start_typing(c.clone(), user("alice"));
        presence.start_typing(c.clone(), user("bob"));

        let set = presence.stop_typing(&c, &user("alice"));
        assert_eq!(set, vec![user("bob")]);
    }

    #[test]
    fn stop_typing_in_unknown_conversation_is_empty() {
        let presence = PresenceAggregator::new();
        assert!(presence.stop_typing(&conv(), &user("alice")).is_empty());
    }

    #[test]
    fn stale_entries_absent_from_next_read() {
        let presence = PresenceAggregator::with_window(Duration::from_millis(10));
        let c = conv();
        presence.start_typing(c.clone(), user("alice"));

        std::thread::sleep(Duration::from_millis(25));
        assert!(presence.typing_users(&c).is_empty());
    }

    #[test]
    fn refresh_extends_the_window() {
        let presence = PresenceAggregator::with_window(Duration::from_millis(60));
        let c = conv();
        presence.start_typing(c.clone(), user("alice"));

        std::thread::sleep(Duration::from_millis(40));
        presence.start_typing(c.clone(), user("alice"));
        std::thread::sleep(Duration::from_millis(40));

        // 80ms after first start but only 40ms after refresh
        assert_eq!(presence.typing_users(&c), vec![user("alice")]);
    }

    #[test]
    fn sweep_reclaims_conversations() {
        let presence = PresenceAggregator::with_window(Duration::from_millis(10));
        presence.start_typing(conv(), user("alice"));
        presence.start_typing(ConversationId::group(GroupId::new()), user("bob"));

        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(presence.sweep(), 2);
        assert_eq!(presence.typing.len(), 0);
    }

    #[test]
    fn render_empty_set() {
        assert_eq!(render_typing(&[]), "");
    }

    #[test]
    fn render_one_user() {
        assert_eq!(render_typing(&[user("Alice")]), "Alice is typing");
    }

    #[test]
    fn render_two_users() {
        assert_eq!(
            render_typing(&[user("Alice"), user("Bob")]),
            "Alice and Bob are typing"
        );
    }

    #[test]
    fn render_three_users() {
        assert_eq!(
            render_typing(&[user("Alice"), user("Bob"), user("Charlie")]),
            "Alice, Bob, and Charlie are typing"
        );
    }

    #[test]
    fn render_four_users() {
        assert_eq!(
            render_typing(&[user("Alice"), user("Bob"), user("Charlie"), user("Dave")]),
            "Alice, Bob, and 2 others are typing"
        );
    }

    #[test]
    fn render_five_users() {
        let users = [
            user("Alice"),
            user("Bob"),
            user("Charlie"),
            user("Dave"),
            user("Eve"),
        ];
        assert_eq!(render_typing(&users), "Alice, Bob, and 3 others are typing");
    }
}

//! Identity and ordering types for the session-sync subsystem.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A user identity, keyed by username.
///
/// Usernames are owned by the external credential store; this subsystem
/// only routes on them.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a UserId from a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    /// Get the username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A unique identifier for one device session.
///
/// UUID v4 format (16 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    /// Create a new random SessionId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

/// A unique identifier for a chat group.
///
/// UUID v4 format, assigned at group creation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(uuid::Uuid);

impl GroupId {
    /// Create a new random GroupId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

/// An unguessable capability-token identifier.
///
/// 32 bytes of random data (2^256 states), displayed as URL-safe base64.
/// Clients hold the text form; the vault keys token records by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId([u8; 32]);

impl TokenId {
    /// Create a new random TokenId.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        getrandom::getrandom(&mut bytes).expect("getrandom failed");
        Self(bytes)
    }

    /// Parse a TokenId from its text (base64) form.
    ///
    /// Returns `None` for malformed text or wrong length.
    pub fn from_text(text: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(text).ok()?;
        if bytes.len() == 32 {
            let mut arr = [0u8; 32];
            arr.copy_from_slice(&bytes);
            Some(Self(arr))
        } else {
            None
        }
    }

    /// Get the raw bytes of this TokenId.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", URL_SAFE_NO_PAD.encode(self.0))
    }
}

// Only a prefix in Debug so full tokens never land in logs.
impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({}…)", &self.to_string()[..8])
    }
}

/// A conversation routing key: either a direct-message pair or a group.
///
/// Direct pairs are canonically ordered so both participants key the same
/// conversation regardless of who opens it.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ConversationId {
    /// A one-to-one conversation between two users.
    Direct {
        /// Lexicographically smaller participant.
        a: UserId,
        /// Lexicographically larger participant.
        b: UserId,
    },
    /// A group conversation.
    Group {
        /// The group identifier.
        group: GroupId,
    },
}

impl ConversationId {
    /// Create a direct conversation id with canonical participant order.
    pub fn direct(x: UserId, y: UserId) -> Self {
        if x <= y {
            Self::Direct { a: x, b: y }
        } else {
            Self::Direct { a: y, b: x }
        }
    }

    /// Create a group conversation id.
    pub fn group(group: GroupId) -> Self {
        Self::Group { group }
    }

    /// The direct-pair participants, if this is a direct conversation.
    pub fn direct_participants(&self) -> Option<(&UserId, &UserId)> {
        match self {
            Self::Direct { a, b } => Some((a, b)),
            Self::Group { .. } => None,
        }
    }
}

impl fmt::Debug for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct { a, b } => write!(f, "Direct({}, {})", a, b),
            Self::Group { group } => write!(f, "Group({})", group),
        }
    }
}

/// A point in time, as unix milliseconds.
///
/// Used for message-sync watermarks and record timestamps. Ordered so a
/// client can hand back the newest value it has seen.
#[derive(
    Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a Timestamp from unix milliseconds.
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// The current wall-clock time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self(millis)
    }

    /// Get the unix-millisecond value.
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// A Timestamp representing "never" / "no data yet".
    pub fn zero() -> Self {
        Self(0)
    }

    /// Add a number of milliseconds, saturating.
    pub fn plus_millis(&self, millis: u64) -> Self {
        Self(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_id_text_roundtrip() {
        let original = TokenId::random();
        let text = original.to_string();
        let restored = TokenId::from_text(&text).unwrap();
        assert_eq!(original, restored);
    }

    #[test]
    fn token_id_base64_display() {
        let id = TokenId::random();
        assert_eq!(id.to_string().len(), 43); // 32 bytes = 43 base64 chars (no padding)
    }

    #[test]
    fn token_id_from_invalid_text_fails() {
        assert!(TokenId::from_text("not base64!!!").is_none());
        assert!(TokenId::from_text("c2hvcnQ").is_none()); // valid base64, wrong length
    }

    #[test]
    fn token_id_debug_is_truncated() {
        let id = TokenId::random();
        let debug = format!("{:?}", id);
        assert!(!debug.contains(&id.to_string()));
    }

    #[test]
    fn session_id_is_uuid_v4() {
        let id = SessionId::new();
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn direct_conversation_is_canonical() {
        let ab = ConversationId::direct(UserId::new("alice"), UserId::new("bob"));
        let ba = ConversationId::direct(UserId::new("bob"), UserId::new("alice"));
        assert_eq!(ab, ba);
    }

    #[test]
    fn direct_participants_are_ordered() {
        let conv = ConversationId::direct(UserId::new("zed"), UserId::new("amy"));
        let (a, b) = conv.direct_participants().unwrap();
        assert_eq!(a.as_str(), "amy");
        assert_eq!(b.as_str(), "zed");
    }

    #[test]
    fn group_conversation_has_no_direct_participants() {
        let conv = ConversationId::group(GroupId::new());
        assert!(conv.direct_participants().is_none());
    }

    #[test]
    fn timestamp_ordering() {
        let t1 = Timestamp::from_millis(100);
        let t2 = Timestamp::from_millis(200);
        assert!(t1 < t2);
    }

    #[test]
    fn timestamp_saturating_add() {
        let t = Timestamp::from_millis(u64::MAX);
        assert_eq!(t.plus_millis(10).as_millis(), u64::MAX);
    }

    #[test]
    fn timestamp_now_is_nonzero() {
        assert!(Timestamp::now() > Timestamp::zero());
    }

    #[test]
    fn user_id_roundtrips_through_str() {
        let id: UserId = "carol".into();
        assert_eq!(id.as_str(), "carol");
        assert_eq!(id.to_string(), "carol");
    }
}

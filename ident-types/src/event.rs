//! Fan-out events.
//!
//! One state change produces one event, delivered to every connected
//! session entitled to observe it. Delivery is at-least-once to
//! reachable sessions; offline catch-up goes through message sync, not
//! through replaying these.

use crate::{CodecError, ConversationId, DeviceSession, GroupId, SessionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// All outbound fan-out events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Sent to the newly linked session after pairing succeeds.
    DevicePaired {
        /// The new session.
        session: DeviceSession,
    },
    /// Sent to the user's other sessions when a new device is linked.
    NewDevicePaired {
        /// The new session.
        session: DeviceSession,
    },
    /// A session was deactivated by its owner.
    DeviceRemoved {
        /// The deactivated session.
        session: SessionId,
    },
    /// A group was created by the acting user.
    GroupCreated {
        /// The new group.
        group: GroupId,
        /// Its display name.
        name: String,
    },
    /// A member was promoted to admin.
    UserPromoted {
        /// The group.
        group: GroupId,
        /// The promoted user.
        user: UserId,
        /// Whether the elevated tier was granted.
        elevated: bool,
    },
    /// An admin was demoted to member.
    UserDemoted {
        /// The group.
        group: GroupId,
        /// The demoted user.
        user: UserId,
    },
    /// A user was added to a group directly.
    MemberAdded {
        /// The group.
        group: GroupId,
        /// The new member.
        user: UserId,
    },
    /// A user was removed from a group.
    MemberRemoved {
        /// The group.
        group: GroupId,
        /// The removed user.
        user: UserId,
    },
    /// Sent to the removed user's own sessions.
    RemovedFromGroup {
        /// The group the user was removed from.
        group: GroupId,
    },
    /// A group was renamed.
    GroupEdited {
        /// The group.
        group: GroupId,
        /// The new name.
        name: String,
    },
    /// Sent to the invitee's sessions when an invitation is issued.
    InvitationCreated {
        /// The inviting group.
        group: GroupId,
        /// The invited user.
        invitee: UserId,
        /// Token text the invitee redeems.
        token: String,
        /// When the invitation lapses.
        expires_at: Timestamp,
    },
    /// Sent to the group when an invitation was declined.
    InvitationDeclined {
        /// The group.
        group: GroupId,
        /// The user who declined.
        user: UserId,
    },
    /// A user joined a group via invitation.
    MemberJoined {
        /// The group.
        group: GroupId,
        /// The new member.
        user: UserId,
    },
    /// The typing set of a conversation changed (someone started).
    UserTyping {
        /// The conversation.
        conversation: ConversationId,
        /// Who is typing, first-to-start first.
        users: Vec<UserId>,
        /// Display string, rendered with the fixed grammar.
        rendered: String,
    },
    /// The typing set of a conversation changed (someone stopped).
    UserStoppedTyping {
        /// The conversation.
        conversation: ConversationId,
        /// Who is still typing, first-to-start first. May be empty.
        users: Vec<UserId>,
        /// Display string; empty when nobody is typing.
        rendered: String,
    },
    /// A message was delivered to a conversation.
    MessageReceived {
        /// The conversation.
        conversation: ConversationId,
        /// The sender.
        sender: UserId,
        /// Message body (opaque to this subsystem).
        body: String,
        /// Store-assigned timestamp.
        timestamp: Timestamp,
    },
}

impl Event {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec(self).map_err(CodecError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::Deserialization)
    }
}

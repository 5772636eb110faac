//! Inbound intents.
//!
//! Every client request is one of these variants. The coordinator
//! dispatches through an explicit match, so adding a variant is a
//! compile-time-checked change rather than a stringly-typed route.
//!
//! The acting user and session are carried by the request context the
//! transport establishes, not by the intent itself.

use crate::{ConversationId, DeviceInfo, GroupId, SessionId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

use crate::CodecError;

/// All inbound intents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    /// Issue a short-lived token for linking a new device.
    GeneratePairingToken,
    /// Redeem a pairing token from a not-yet-linked device.
    VerifyPairingToken {
        /// Token text as displayed on the issuing device.
        token: String,
        /// Description of the device being linked.
        device: DeviceInfo,
    },
    /// List all of the acting user's sessions, active and removed.
    ListDevices,
    /// Deactivate one of the acting user's sessions.
    RemoveDevice {
        /// The session to deactivate.
        device: SessionId,
    },
    /// Create a group; the acting user becomes its creator.
    CreateGroup {
        /// Display name for the group.
        name: String,
    },
    /// Promote a member to admin.
    PromoteToAdmin {
        /// The group.
        group: GroupId,
        /// The member to promote.
        target: UserId,
        /// Grant the elevated ("super admin") tier. Only the creator's
        /// promotions may set this.
        elevated: bool,
    },
    /// Demote an admin back to member.
    DemoteAdmin {
        /// The group.
        group: GroupId,
        /// The admin to demote.
        target: UserId,
    },
    /// Add a user to a group directly.
    AddGroupMember {
        /// The group.
        group: GroupId,
        /// The user to add.
        target: UserId,
    },
    /// Remove a user from a group.
    RemoveGroupMember {
        /// The group.
        group: GroupId,
        /// The user to remove.
        target: UserId,
    },
    /// Rename a group.
    EditGroup {
        /// The group.
        group: GroupId,
        /// New display name.
        name: String,
    },
    /// Invite a user to a group (7-day token).
    CreateGroupInvitation {
        /// The group.
        group: GroupId,
        /// The invited user.
        invitee: UserId,
    },
    /// Accept a group invitation.
    AcceptGroupInvitation {
        /// Invitation token text.
        token: String,
    },
    /// Decline a group invitation.
    DeclineGroupInvitation {
        /// Invitation token text.
        token: String,
    },
    /// The acting user started typing in a conversation.
    StartTyping {
        /// The conversation.
        conversation: ConversationId,
    },
    /// The acting user stopped typing in a conversation.
    StopTyping {
        /// The conversation.
        conversation: ConversationId,
    },
    /// Send a message to a conversation.
    SendMessage {
        /// The conversation.
        conversation: ConversationId,
        /// Message body (opaque to this subsystem).
        body: String,
    },
    /// Fetch messages newer than a watermark for the acting user.
    SyncMessages {
        /// Return records with timestamp strictly greater than this.
        since: Timestamp,
    },
}

impl Intent {
    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec(self).map_err(CodecError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        rmp_serde::from_slice(bytes).map_err(CodecError::Deserialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DeviceClass;

    #[test]
    fn intent_roundtrip() {
        let intent = Intent::VerifyPairingToken {
            token: "abc".into(),
            device: DeviceInfo {
                name: "Dana's laptop".into(),
                class: DeviceClass::Desktop,
                remote_addr: "10.0.0.7:51820".into(),
            },
        };

        let bytes = intent.to_bytes().unwrap();
        let restored = Intent::from_bytes(&bytes).unwrap();
        assert_eq!(restored, intent);
    }

    #[test]
    fn typing_intent_roundtrip() {
        let intent = Intent::StartTyping {
            conversation: ConversationId::direct(UserId::new("alice"), UserId::new("bob")),
        };

        let bytes = intent.to_bytes().unwrap();
        assert_eq!(Intent::from_bytes(&bytes).unwrap(), intent);
    }

    #[test]
    fn garbage_bytes_rejected() {
        assert!(Intent::from_bytes(b"\xc1\xc1\xc1").is_err());
    }
}

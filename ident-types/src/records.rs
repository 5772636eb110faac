//! Record shapes owned by this subsystem.
//!
//! Durable storage of these records is delegated to the external store;
//! the shapes are defined here so every crate (and the repository
//! interface) agrees on them.

use crate::{GroupId, SessionId, Timestamp, TokenId, UserId};
use serde::{Deserialize, Serialize};

/// The class of device a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    /// Browser session.
    Web,
    /// Phone or tablet app.
    Mobile,
    /// Desktop app.
    Desktop,
}

/// Client-supplied description of a device at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable device name ("Dana's laptop").
    pub name: String,
    /// Device class.
    pub class: DeviceClass,
    /// Originating network address, as reported by the transport.
    pub remote_addr: String,
}

/// One authenticated connection context for a user on a specific device.
///
/// Sessions are never hard-deleted; removal flips `active` so the audit
/// trail survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSession {
    /// Unique session identifier.
    pub id: SessionId,
    /// Owning user.
    pub owner: UserId,
    /// Device description supplied at registration.
    pub device: DeviceInfo,
    /// When the session was created.
    pub created_at: Timestamp,
    /// Last inbound action from this session.
    pub last_active_at: Timestamp,
    /// Whether the session is live. False after explicit removal.
    pub active: bool,
}

/// Role of a user within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    /// Ordinary member.
    Member,
    /// Promoted admin. May carry the elevated ("super admin") tier.
    Admin,
    /// The group's creator. Fixed at creation, never reachable by
    /// transition, never demotable or removable.
    Creator,
}

/// Per-membership permission bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// May add members directly.
    pub add_members: bool,
    /// May remove members.
    pub remove_members: bool,
    /// May edit the group name.
    pub edit_group: bool,
    /// May send messages to the group.
    pub send_messages: bool,
}

impl Permissions {
    /// All bits set. Default for the creator and for promoted admins.
    pub fn all() -> Self {
        Self {
            add_members: true,
            remove_members: true,
            edit_group: true,
            send_messages: true,
        }
    }

    /// Default bits for an ordinary member: may send, nothing else.
    pub fn member_default() -> Self {
        Self {
            add_members: false,
            remove_members: false,
            edit_group: false,
            send_messages: true,
        }
    }
}

/// Relates a user to a group with a role and permission bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    /// The member.
    pub user: UserId,
    /// Current role.
    pub role: GroupRole,
    /// Elevated ("super admin") tier. Only meaningful for admins.
    pub elevated: bool,
    /// Permission bits.
    pub permissions: Permissions,
    /// When the user joined.
    pub joined_at: Timestamp,
}

/// What a capability token grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenPurpose {
    /// Linking a new device to an existing account.
    DevicePairing,
    /// Joining a group by invitation.
    GroupInvitation,
}

/// The issuing side of a capability token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TokenSubject {
    /// Issued by a user (device pairing).
    User {
        /// The issuing user.
        user: UserId,
    },
    /// Issued on behalf of a group (invitation).
    Group {
        /// The inviting group.
        group: GroupId,
    },
}

/// Lifecycle state of a capability token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Issued, not yet redeemed.
    Pending,
    /// Successfully redeemed. Terminal.
    Consumed,
    /// TTL elapsed. Terminal.
    Expired,
    /// Explicitly declined (invitations only). Terminal.
    Rejected,
}

/// A freshly issued capability token, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    /// The unguessable identifier. Its text form is what clients hold.
    pub id: TokenId,
    /// What the token grants.
    pub purpose: TokenPurpose,
    /// Invited username, for invitations.
    pub target: Option<UserId>,
    /// Issuance time.
    pub issued_at: Timestamp,
    /// Expiry time.
    pub expires_at: Timestamp,
}

impl IssuedToken {
    /// Remaining time-to-live in whole seconds, relative to `now`.
    pub fn ttl_seconds(&self, now: Timestamp) -> u64 {
        self.expires_at
            .as_millis()
            .saturating_sub(now.as_millis())
            / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_permissions_all_set() {
        let p = Permissions::all();
        assert!(p.add_members && p.remove_members && p.edit_group && p.send_messages);
    }

    #[test]
    fn member_default_can_only_send() {
        let p = Permissions::member_default();
        assert!(p.send_messages);
        assert!(!p.add_members);
        assert!(!p.remove_members);
        assert!(!p.edit_group);
    }

    #[test]
    fn issued_token_ttl_seconds() {
        let token = IssuedToken {
            id: TokenId::random(),
            purpose: TokenPurpose::DevicePairing,
            target: None,
            issued_at: Timestamp::from_millis(1_000),
            expires_at: Timestamp::from_millis(301_000),
        };
        assert_eq!(token.ttl_seconds(Timestamp::from_millis(1_000)), 300);
        // Past expiry the remaining TTL saturates at zero
        assert_eq!(token.ttl_seconds(Timestamp::from_millis(999_999)), 0);
    }

    #[test]
    fn device_class_roundtrip() {
        let bytes = rmp_serde::to_vec(&DeviceClass::Mobile).unwrap();
        let restored: DeviceClass = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, DeviceClass::Mobile);
    }

    #[test]
    fn token_purpose_roundtrip() {
        let bytes = rmp_serde::to_vec(&TokenPurpose::GroupInvitation).unwrap();
        let restored: TokenPurpose = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, TokenPurpose::GroupInvitation);
    }

    #[test]
    fn token_subject_roundtrip() {
        let subject = TokenSubject::User {
            user: UserId::new("alice"),
        };
        let bytes = rmp_serde::to_vec(&subject).unwrap();
        let restored: TokenSubject = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, subject);
    }
}

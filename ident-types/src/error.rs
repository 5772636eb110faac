//! Error taxonomy for the session-sync subsystem.

use thiserror::Error;

/// Errors surfaced to the requesting device.
///
/// Every variant is recoverable by the caller; none crash the
/// coordinator and none are retried internally. A token failure means a
/// new token must be issued, not a retry of the old one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// The referenced token, device, or record does not exist.
    #[error("not found")]
    NotFound,

    /// The token's time-to-live has elapsed.
    #[error("token expired")]
    Expired,

    /// The token was already redeemed (or rejected).
    #[error("token already consumed")]
    AlreadyConsumed,

    /// The token exists but was issued for a different purpose.
    #[error("token purpose mismatch")]
    WrongPurpose,

    /// A pairing token's subject does not match the redeeming identity.
    #[error("token subject mismatch")]
    TokenSubjectMismatch,

    /// The actor lacks authority for this administrative action.
    #[error("forbidden")]
    Forbidden,

    /// The group creator can never be demoted or removed.
    #[error("the group creator is protected")]
    CreatorProtected,

    /// The target user is not a member of the group.
    #[error("not a group member")]
    NotMember,

    /// The target user is not an admin.
    #[error("not an admin")]
    NotAdmin,

    /// The target user is already an admin (or the creator).
    #[error("already an admin")]
    AlreadyAdmin,

    /// The target user is already a member of the group.
    #[error("already a member")]
    AlreadyMember,

    /// A group name was empty after trimming.
    #[error("invalid group name")]
    InvalidName,

    /// The invitation token is unknown, malformed, or not an invitation.
    #[error("invalid invitation")]
    InvalidInvitation,

    /// The invitation's 7-day window has elapsed.
    #[error("invitation expired")]
    InvitationExpired,

    /// The invitation was accepted by someone other than its target.
    #[error("invitation addressed to a different user")]
    WrongInvitee,

    /// An external collaborator (message store) failed.
    #[error("store error: {0}")]
    Store(String),
}

/// Wire-codec failures at the transport boundary.
///
/// Kept apart from [`IdentityError`]: a malformed frame is a transport
/// problem, not a refusal the client can act on.
#[derive(Debug, Error)]
pub enum CodecError {
    /// MessagePack serialization failed.
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),
}

//! # ident-types
//!
//! Shared types for the identity-session and synchronization subsystem:
//!
//! - [`UserId`], [`SessionId`], [`GroupId`], [`TokenId`],
//!   [`ConversationId`], [`Timestamp`] - identity and ordering types
//! - [`Intent`] / [`Event`] - the closed inbound/outbound vocabularies
//! - [`IdentityError`] - the recoverable error taxonomy
//! - Record shapes ([`DeviceSession`], [`GroupMembership`], token types)
//!   whose durable storage is delegated to the external store

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod event;
mod ids;
mod intent;
mod records;

pub use error::{CodecError, IdentityError};
pub use event::Event;
pub use ids::{ConversationId, GroupId, SessionId, Timestamp, TokenId, UserId};
pub use intent::Intent;
pub use records::{
    DeviceClass, DeviceInfo, DeviceSession, GroupMembership, GroupRole, IssuedToken,
    Permissions, TokenPurpose, TokenStatus, TokenSubject,
};

//! # ident-core
//!
//! The four in-memory engines of the session-sync subsystem, free of
//! network and disk I/O:
//!
//! - [`TokenVault`] - single-use, time-boxed capability tokens
//! - [`DeviceSessionRegistry`] - per-user multi-device session state
//! - [`GroupAuthorizationEngine`] - group roles, permissions, invitations
//! - [`PresenceAggregator`] - typing sets with timeout eviction
//!
//! Engine operations complete synchronously in bounded local time; a
//! caller acknowledges an intent only after the in-memory transition
//! has committed. Durable persistence and event delivery belong to the
//! coordinator's external collaborators, not to these engines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod devices;
pub mod groups;
pub mod presence;
pub mod tokens;

pub use devices::DeviceSessionRegistry;
pub use groups::{GroupAuthorizationEngine, PromotionPolicy};
pub use presence::{render_typing, PresenceAggregator, TYPING_WINDOW};
pub use tokens::{
    MemoryTokenStore, RedeemedToken, TokenRecord, TokenStore, TokenVault,
    INVITATION_TOKEN_TTL, PAIRING_TOKEN_TTL,
};

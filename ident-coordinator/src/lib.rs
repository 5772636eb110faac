//! # ident-coordinator
//!
//! Intent dispatch and event fan-out for the identity-session
//! subsystem.
//!
//! This crate ties the `ident-core` engines together behind one entry
//! point:
//! - Routes each client [`Intent`](ident_types::Intent) to the engine
//!   that owns its state
//! - Computes which sessions must hear about the change and pushes
//!   [`Event`](ident_types::Event)s through the transport seam
//! - Delegates message history to the store seam for send and
//!   catch-up sync
//! - Runs the background sweep that reclaims expired tokens and stale
//!   typing entries
//!
//! ## Architecture
//!
//! ```text
//! Client ──intent──► SyncCoordinator ──► TokenVault
//!                        │               DeviceSessionRegistry
//!                        │               GroupAuthorizationEngine
//!                        │               PresenceAggregator
//!                        │
//!                        ├──events──► EventTransport (push layer)
//!                        └──records─► MessageStore   (history)
//! ```
//!
//! State commits in the engines before any fan-out; a failed delivery
//! is logged and never rolls the change back.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cleanup;
pub mod config;
pub mod coordinator;
pub mod store;
pub mod transport;

pub use cleanup::spawn_sweep_task;
pub use config::{CleanupConfig, Config, ConfigError, PolicyConfig, PresenceConfig, TokensConfig};
pub use coordinator::{Outcome, RequestContext, SyncCoordinator};
pub use store::{MessageStore, StoreError, StoredMessage};
pub use transport::{EventTransport, TransportError};

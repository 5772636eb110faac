//! Per-user device-session registry.
//!
//! Tracks every authenticated device session a user holds, live or
//! removed. Sessions are soft-deleted (the active flag flips) so the
//! device list stays auditable.

use crate::tokens::TokenVault;
use dashmap::DashMap;
use ident_types::{
    DeviceInfo, DeviceSession, IdentityError, SessionId, Timestamp, TokenId, TokenPurpose,
    TokenSubject, UserId,
};
use std::sync::Arc;

/// Maps each user to the set of their device sessions.
///
/// One map entry per user; `DashMap`'s shard lock serializes mutations
/// of a single user's sessions, which is the only mutual exclusion the
/// registry needs (users are independent units).
pub struct DeviceSessionRegistry {
    sessions: DashMap<UserId, Vec<DeviceSession>>,
    vault: Arc<TokenVault>,
}

impl std::fmt::Debug for DeviceSessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSessionRegistry")
            .field("users", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

impl DeviceSessionRegistry {
    /// Create a registry that redeems pairing tokens against `vault`.
    pub fn new(vault: Arc<TokenVault>) -> Self {
        Self {
            sessions: DashMap::new(),
            vault,
        }
    }

    /// Create the initial session for a user at primary login.
    ///
    /// Authentication already happened upstream; this never fails.
    pub fn register_primary(&self, user: UserId, device: DeviceInfo) -> DeviceSession {
        let session = new_session(user.clone(), device);
        tracing::info!("Primary session {} for {}", session.id, user);
        self.sessions.entry(user).or_default().push(session.clone());
        session
    }

    /// Link a secondary device by redeeming a pairing token.
    ///
    /// The subject recovered from the token must be the claiming user;
    /// anything else fails with `TokenSubjectMismatch`. Unlike a group
    /// invitation, a mismatched redemption consumes the token: pairing
    /// tokens are secrets shown on the issuing device, so a claim by
    /// the wrong identity means the text leaked and the issuer must
    /// generate a fresh one.
    pub fn link_secondary(
        &self,
        user: UserId,
        device: DeviceInfo,
        token: &TokenId,
    ) -> Result<DeviceSession, IdentityError> {
        let redeemed = self.vault.redeem(token, TokenPurpose::DevicePairing)?;

        match redeemed.subject {
            TokenSubject::User { user: issuer } if issuer == user => {}
            _ => {
                tracing::warn!("Pairing token {:?} redeemed by wrong identity", token);
                return Err(IdentityError::TokenSubjectMismatch);
            }
        }

        let session = new_session(user.clone(), device);
        tracing::info!("Linked secondary session {} for {}", session.id, user);
        self.sessions.entry(user).or_default().push(session.clone());
        Ok(session)
    }

    /// All sessions for a user, most recently active first.
    ///
    /// Includes removed (inactive) sessions for audit visibility.
    pub fn list_devices(&self, user: &UserId) -> Vec<DeviceSession> {
        let mut devices = self
            .sessions
            .get(user)
            .map(|entry| entry.clone())
            .unwrap_or_default();
        devices.sort_by(|a, b| b.last_active_at.cmp(&a.last_active_at));
        devices
    }

    /// Active sessions for a user (fan-out targets).
    pub fn active_sessions(&self, user: &UserId) -> Vec<DeviceSession> {
        self.sessions
            .get(user)
            .map(|entry| entry.iter().filter(|s| s.active).cloned().collect())
            .unwrap_or_default()
    }

    /// Deactivate a session owned by `user`.
    ///
    /// Idempotent: removing an already-inactive session is a no-op
    /// success. A session id that does not belong to `user` is
    /// `NotFound`.
    pub fn remove_device(&self, user: &UserId, device: SessionId) -> Result<(), IdentityError> {
        let mut entry = self.sessions.get_mut(user).ok_or(IdentityError::NotFound)?;
        let session = entry
            .iter_mut()
            .find(|s| s.id == device)
            .ok_or(IdentityError::NotFound)?;

        if session.active {
            session.active = false;
            tracing::info!("Removed session {} for {}", device, user);
        }
        Ok(())
    }

    /// Update last-activity for a session.
    ///
    /// Called on every inbound action; a stale session id is ignored so
    /// the calling operation never fails on account of bookkeeping.
    pub fn touch(&self, user: &UserId, device: SessionId) {
        if let Some(mut entry) = self.sessions.get_mut(user) {
            if let Some(session) = entry.iter_mut().find(|s| s.id == device) {
                session.last_active_at = Timestamp::now();
                return;
            }
        }
        tracing::debug!("Touch for unknown session {} of {}", device, user);
    }
}

fn new_session(owner: UserId, device: DeviceInfo) -> DeviceSession {
    let now = Timestamp::now();
    DeviceSession {
        id: SessionId::new(),
        owner,
        device,
        created_at: now,
        last_active_at: now,
        active: true,
    }
}

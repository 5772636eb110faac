//! Capability-token vault.
//!
//! Issues, stores, and redeems single-use, time-boxed tokens: pairing
//! tokens for linking a new device, invitation tokens for joining a
//! group. Redemption is exactly-once — of any number of concurrent
//! redemption attempts on one identifier, exactly one observes success.
//!
//! Expiry is lazy: a token past its TTL fails at redemption whether or
//! not a sweep has reclaimed it. The sweep only bounds memory.

use dashmap::DashMap;
use ident_types::{
    IdentityError, IssuedToken, Timestamp, TokenId, TokenPurpose, TokenStatus, TokenSubject,
    UserId,
};
use std::sync::Arc;
use std::time::Duration;

/// Default pairing-token TTL (5 minutes).
pub const PAIRING_TOKEN_TTL: Duration = Duration::from_secs(300);

/// Default invitation-token TTL (7 days).
pub const INVITATION_TOKEN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// A stored token record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// The token identifier.
    pub id: TokenId,
    /// Who issued it (user for pairing, group for invitations).
    pub subject: TokenSubject,
    /// What it grants.
    pub purpose: TokenPurpose,
    /// Invited username, for invitations.
    pub target: Option<UserId>,
    /// Issuance time.
    pub issued_at: Timestamp,
    /// Expiry time.
    pub expires_at: Timestamp,
    /// Lifecycle state.
    pub status: TokenStatus,
}

/// What a successful redemption (or rejection) recovers from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedeemedToken {
    /// The issuing subject.
    pub subject: TokenSubject,
    /// The invited username, for invitations.
    pub target: Option<UserId>,
}

/// Backing store for token records.
///
/// The store owns the atomicity contract: `redeem` and `reject` must
/// transition a pending record exactly once under concurrent callers.
/// The in-memory implementation below covers single-instance
/// deployment; a shared-store implementation can be substituted without
/// changing the vault's call contracts.
pub trait TokenStore: Send + Sync {
    /// Insert a freshly issued record.
    fn insert(&self, record: TokenRecord);

    /// Atomically consume a pending token.
    ///
    /// Checks, in order: presence, expiry (lazily marking the record),
    /// purpose, and pending status.
    fn redeem(
        &self,
        id: &TokenId,
        purpose: TokenPurpose,
        now: Timestamp,
    ) -> Result<RedeemedToken, IdentityError>;

    /// Atomically reject a pending token (explicit decline).
    fn reject(&self, id: &TokenId, now: Timestamp) -> Result<RedeemedToken, IdentityError>;

    /// Look up a record without touching its status.
    fn get(&self, id: &TokenId) -> Option<TokenRecord>;

    /// Drop records whose TTL has elapsed. Returns how many were dropped.
    fn sweep(&self, now: Timestamp) -> usize;
}

/// In-memory token store on a concurrent map.
///
/// `DashMap::get_mut` holds the shard write lock for the duration of
/// the status transition, which is what makes redemption exactly-once.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    entries: DashMap<TokenId, TokenRecord>,
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records (any status).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TokenStore for MemoryTokenStore {
    fn insert(&self, record: TokenRecord) {
        self.entries.insert(record.id, record);
    }

    fn redeem(
        &self,
        id: &TokenId,
        purpose: TokenPurpose,
        now: Timestamp,
    ) -> Result<RedeemedToken, IdentityError> {
        let mut record = self.entries.get_mut(id).ok_or(IdentityError::NotFound)?;

        if now >= record.expires_at {
            if record.status == TokenStatus::Pending {
                record.status = TokenStatus::Expired;
            }
            return Err(IdentityError::Expired);
        }
        if record.purpose != purpose {
            return Err(IdentityError::WrongPurpose);
        }
        if record.status != TokenStatus::Pending {
            return Err(IdentityError::AlreadyConsumed);
        }

        record.status = TokenStatus::Consumed;
        Ok(RedeemedToken {
            subject: record.subject.clone(),
            target: record.target.clone(),
        })
    }

    fn reject(&self, id: &TokenId, now: Timestamp) -> Result<RedeemedToken, IdentityError> {
        let mut record = self.entries.get_mut(id).ok_or(IdentityError::NotFound)?;

        if now >= record.expires_at {
            if record.status == TokenStatus::Pending {
                record.status = TokenStatus::Expired;
            }
            return Err(IdentityError::Expired);
        }
        if record.status != TokenStatus::Pending {
            return Err(IdentityError::AlreadyConsumed);
        }

        record.status = TokenStatus::Rejected;
        Ok(RedeemedToken {
            subject: record.subject.clone(),
            target: record.target.clone(),
        })
    }

    fn get(&self, id: &TokenId) -> Option<TokenRecord> {
        self.entries.get(id).map(|r| r.clone())
    }

    fn sweep(&self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, record| now < record.expires_at);
        before - self.entries.len()
    }
}

/// Issues and redeems capability tokens.
#[derive(Clone)]
pub struct TokenVault {
    store: Arc<dyn TokenStore>,
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

impl TokenVault {
    /// Create a vault over the given store.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// Create a vault over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    /// Issue a token with the given TTL and store it.
    pub fn issue(
        &self,
        subject: TokenSubject,
        purpose: TokenPurpose,
        target: Option<UserId>,
        ttl: Duration,
    ) -> IssuedToken {
        let id = TokenId::random();
        let issued_at = Timestamp::now();
        let expires_at = issued_at.plus_millis(ttl.as_millis() as u64);

        self.store.insert(TokenRecord {
            id,
            subject,
            purpose,
            target: target.clone(),
            issued_at,
            expires_at,
            status: TokenStatus::Pending,
        });

        tracing::debug!("Issued {:?} token {:?} (ttl: {:?})", purpose, id, ttl);

        IssuedToken {
            id,
            purpose,
            target,
            issued_at,
            expires_at,
        }
    }

    /// Redeem a token for the given purpose.
    ///
    /// Exactly-once: concurrent redemptions of the same identifier see
    /// one success and `AlreadyConsumed` everywhere else. Failures are
    /// never retried internally — a failed token requires re-issuance.
    pub fn redeem(
        &self,
        id: &TokenId,
        purpose: TokenPurpose,
    ) -> Result<RedeemedToken, IdentityError> {
        let result = self.store.redeem(id, purpose, Timestamp::now());
        if let Err(e) = &result {
            tracing::debug!("Redemption of {:?} refused: {}", id, e);
        }
        result
    }

    /// Reject a pending token (explicit invitation decline).
    pub fn reject(&self, id: &TokenId) -> Result<RedeemedToken, IdentityError> {
        self.store.reject(id, Timestamp::now())
    }

    /// Look up a record without consuming it.
    pub fn get(&self, id: &TokenId) -> Option<TokenRecord> {
        self.store.get(id)
    }

    /// Reclaim expired records. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let dropped = self.store.sweep(Timestamp::now());
        if dropped > 0 {
            tracing::debug!("Token sweep dropped {} expired records", dropped);
        }
        dropped
    }
}

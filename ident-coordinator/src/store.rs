//! Message history seam.
//!
//! The subsystem does not own message persistence; it appends on send
//! and reads back on catch-up sync through this trait. Store failures
//! surface to the caller as [`IdentityError::Store`].
//!
//! [`IdentityError::Store`]: ident_types::IdentityError::Store

use async_trait::async_trait;
use ident_types::{ConversationId, Timestamp, UserId};
use serde::{Deserialize, Serialize};

/// A message record as the store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Conversation the message belongs to.
    pub conversation: ConversationId,
    /// Author of the message.
    pub sender: UserId,
    /// Message body.
    pub body: String,
    /// Store-assigned timestamp, strictly ordered within a conversation.
    pub timestamp: Timestamp,
}

/// Error returned by a message store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("message store unavailable: {0}")]
    Unavailable(String),
    /// The store rejected the record.
    #[error("message store rejected the record: {0}")]
    Rejected(String),
}

/// Append-and-catch-up interface over the product's message history.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message, returning the stored record with its
    /// store-assigned timestamp.
    async fn append(
        &self,
        conversation: &ConversationId,
        sender: &UserId,
        body: &str,
    ) -> Result<StoredMessage, StoreError>;

    /// All records newer than `since` in conversations the requesting
    /// user participates in, oldest first.
    async fn messages_since(
        &self,
        user: &UserId,
        since: Timestamp,
    ) -> Result<Vec<StoredMessage>, StoreError>;
}

//! Delivery seam between the coordinator and the real-time layer.
//!
//! The coordinator computes who should hear about each event; the
//! transport owns how the bytes reach them (websocket, push, queue).
//! Delivery is fire-and-forget: a failed delivery is logged and never
//! rolls back the state change that produced the event.

use async_trait::async_trait;
use ident_types::{Event, SessionId, UserId};

/// Error returned by a transport when a delivery fails.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The session has no live connection.
    #[error("session {0} is not connected")]
    NotConnected(SessionId),
    /// The delivery was attempted and failed.
    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Pushes events to a single device session.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Deliver `event` to the session identified by `(user, session)`.
    async fn deliver(
        &self,
        user: &UserId,
        session: SessionId,
        event: &Event,
    ) -> Result<(), TransportError>;
}

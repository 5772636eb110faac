//! Background sweep for expired tokens and stale typing entries.
//!
//! Every engine checks expiry lazily on read, so the system is correct
//! even if this task never runs; the sweep only reclaims memory held by
//! entries nobody will read again.

use crate::config::CleanupConfig;
use ident_core::{PresenceAggregator, TokenVault};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Spawn the background sweep task.
///
/// Returns a handle that can be used to abort the task.
pub fn spawn_sweep_task(
    vault: Arc<TokenVault>,
    presence: Arc<PresenceAggregator>,
    config: CleanupConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if !config.enabled {
            tracing::info!("Sweep task disabled");
            return;
        }

        let interval_secs = config.interval_secs;
        tracing::info!("Sweep task started (interval: {}s)", interval_secs);

        let mut timer = interval(Duration::from_secs(interval_secs));

        loop {
            timer.tick().await;

            let tokens = vault.sweep();
            let typing = presence.sweep();
            if tokens > 0 || typing > 0 {
                tracing::info!(
                    "Sweep: dropped {} expired tokens, {} stale typing entries",
                    tokens,
                    typing
                );
            } else {
                tracing::debug!("Sweep: nothing to drop");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ident_types::{TokenPurpose, TokenSubject, TokenStatus, UserId};

    fn test_cleanup_config(interval_secs: u64) -> CleanupConfig {
        CleanupConfig {
            interval_secs,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn sweep_task_drops_expired_tokens() {
        let vault = Arc::new(TokenVault::in_memory());
        let presence = Arc::new(PresenceAggregator::new());

        // Zero TTL: expired the moment it is issued.
        let token = vault.issue(
            TokenSubject::User {
                user: UserId::new("alice"),
            },
            TokenPurpose::DevicePairing,
            None,
            Duration::ZERO,
        );

        let handle = spawn_sweep_task(
            Arc::clone(&vault),
            Arc::clone(&presence),
            test_cleanup_config(1),
        );

        // First tick fires immediately.
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(vault.get(&token.id).is_none());
    }

    #[tokio::test]
    async fn disabled_sweep_task_exits_immediately() {
        let vault = Arc::new(TokenVault::in_memory());
        let presence = Arc::new(PresenceAggregator::new());

        let handle = spawn_sweep_task(
            Arc::clone(&vault),
            Arc::clone(&presence),
            CleanupConfig {
                interval_secs: 1,
                enabled: false,
            },
        );

        // The task returns on its own rather than looping.
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("task did not exit")
            .expect("task panicked");
    }

    #[tokio::test]
    async fn sweep_task_leaves_live_tokens_alone() {
        let vault = Arc::new(TokenVault::in_memory());
        let presence = Arc::new(PresenceAggregator::new());

        let token = vault.issue(
            TokenSubject::User {
                user: UserId::new("alice"),
            },
            TokenPurpose::DevicePairing,
            None,
            Duration::from_secs(300),
        );

        let handle = spawn_sweep_task(
            Arc::clone(&vault),
            Arc::clone(&presence),
            test_cleanup_config(1),
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        let record = vault.get(&token.id).expect("token swept");
        assert_eq!(record.status, TokenStatus::Pending);
    }
}

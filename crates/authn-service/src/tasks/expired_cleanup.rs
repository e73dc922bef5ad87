//! Expired authentication cleanup background task.
//!
//! Periodically deletes authentications whose expiry lies further in the past
//! than the configured grace period. Never-expiring authentications are never
//! touched.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token fires; an in-flight iteration
//! completes first.

use crate::models::DeleteFilter;
use crate::observability::metrics;
use crate::repositories::AuthenticationStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

/// Default cleanup check interval in seconds (1 hour).
pub const DEFAULT_CHECK_INTERVAL_SECONDS: u64 = 3600;

/// Default time an authentication stays after expiring (30 minutes).
pub const DEFAULT_GRACE_PERIOD_SECONDS: u64 = 1800;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredCleanupConfig {
    /// Cleanup check interval in seconds.
    pub check_interval_seconds: u64,
    /// Seconds past expiry before an authentication is deleted.
    pub grace_period_seconds: u64,
}

impl Default for ExpiredCleanupConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: DEFAULT_CHECK_INTERVAL_SECONDS,
            grace_period_seconds: DEFAULT_GRACE_PERIOD_SECONDS,
        }
    }
}

/// Start the cleanup loop. Returns when `cancel_token` is cancelled.
#[instrument(skip_all, name = "authn.task.cleanup")]
pub async fn start_expired_cleanup(
    store: Arc<dyn AuthenticationStore>,
    config: ExpiredCleanupConfig,
    cancel_token: CancellationToken,
) {
    info!(
        target: "authn.task.cleanup",
        check_interval_seconds = config.check_interval_seconds,
        grace_period_seconds = config.grace_period_seconds,
        "Starting expired authentication cleanup task"
    );

    // A zero period would panic in `interval`
    let period = Duration::from_secs(config.check_interval_seconds.max(1));
    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                run_cleanup(store.as_ref(), &config).await;
            }
            _ = cancel_token.cancelled() => {
                info!(
                    target: "authn.task.cleanup",
                    "Cleanup task received shutdown signal, exiting"
                );
                break;
            }
        }
    }

    info!(target: "authn.task.cleanup", "Cleanup task stopped");
}

/// Run a single cleanup iteration. Returns the number deleted.
pub async fn run_cleanup(store: &dyn AuthenticationStore, config: &ExpiredCleanupConfig) -> u64 {
    let grace = i64::try_from(config.grace_period_seconds)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(grace)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);

    match store
        .delete_authentications(&DeleteFilter::new().with_expired_before(cutoff))
        .await
    {
        Ok(count) => {
            if count > 0 {
                info!(
                    target: "authn.task.cleanup",
                    deleted_count = count,
                    "Deleted expired authentications"
                );
            }
            metrics::record_cleanup_deleted(count);
            count
        }
        Err(e) => {
            error!(
                target: "authn.task.cleanup",
                error = %e,
                "Failed to delete expired authentications"
            );
            0
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{CreateAuthenticationRequest, Method};
    use crate::repositories::MemoryStore;

    async fn seed_expiring(store: &MemoryStore, offset: chrono::Duration) {
        store
            .create_authentication(
                CreateAuthenticationRequest::new(Method::Token).with_expires_at(Utc::now() + offset),
            )
            .await
            .unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = ExpiredCleanupConfig::default();
        assert_eq!(config.check_interval_seconds, 3600);
        assert_eq!(config.grace_period_seconds, 1800);
    }

    #[tokio::test]
    async fn test_run_cleanup_respects_grace_period() {
        let store = MemoryStore::new();
        // Expired well beyond the grace period
        seed_expiring(&store, chrono::Duration::hours(-2)).await;
        // Expired, still within grace
        seed_expiring(&store, chrono::Duration::minutes(-5)).await;
        // Not expired
        seed_expiring(&store, chrono::Duration::hours(1)).await;
        // Never expires
        store
            .create_authentication(CreateAuthenticationRequest::new(Method::Oidc))
            .await
            .unwrap();

        let deleted = run_cleanup(&store, &ExpiredCleanupConfig::default()).await;
        assert_eq!(deleted, 1);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_runs_and_stops_on_cancel() {
        let store = Arc::new(MemoryStore::new());
        seed_expiring(&store, chrono::Duration::hours(-2)).await;

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(start_expired_cleanup(
            store.clone(),
            ExpiredCleanupConfig {
                check_interval_seconds: 60,
                grace_period_seconds: 0,
            },
            cancel_token.clone(),
        ));

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(store.is_empty().await);

        cancel_token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

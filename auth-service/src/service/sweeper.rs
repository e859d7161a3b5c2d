//! # Background Sweeper
//!
//! Periodically deletes expired `sessions` and `password_resets` rows.
//! Runs hourly, independent of request traffic. Deliberately does **not**
//! touch `email_verifications` (those rows are never deleted - expiry is
//! computed from `created_at` at verification time) nor stale
//! `token_family:*` Redis keys (those expire on their own TTL).

use std::time::Duration;
use tracing::{info, warn};

use crate::repository::{PasswordResetRepository, SessionRepository};

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Spawns the sweeper as a detached background task. The returned handle is
/// not awaited by the caller - the task runs for the lifetime of the process
/// and is torn down when the process exits.
pub fn spawn(session_repository: SessionRepository, password_reset_repository: PasswordResetRepository) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        // The first tick fires immediately; skip it so we don't sweep right
        // at startup before anything could plausibly have expired.
        interval.tick().await;

        loop {
            interval.tick().await;
            sweep_once(&session_repository, &password_reset_repository).await;
        }
    })
}

async fn sweep_once(session_repository: &SessionRepository, password_reset_repository: &PasswordResetRepository) {
    match session_repository.delete_expired().await {
        Ok(count) => info!(deleted = count, "swept expired sessions"),
        Err(error) => warn!(%error, "session sweep failed"),
    }

    match password_reset_repository.delete_expired().await {
        Ok(count) => info!(deleted = count, "swept expired password reset tokens"),
        Err(error) => warn!(%error, "password reset sweep failed"),
    }
}

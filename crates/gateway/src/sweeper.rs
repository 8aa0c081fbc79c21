//! Background session sweep.
//!
//! Periodically validates every stored session against the configured
//! required keys and deletes the ones that fail.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{debug, info, warn};

use ms_sessions::{require_keys, MemoryStore, SessionRepository};

/// Spawn a task that runs [`SessionRepository::validate_sessions`] every
/// `interval_secs` seconds.
///
/// Returns a `JoinHandle` that can be used to abort the task.
pub fn spawn_sweep_task(
    repo: Arc<SessionRepository>,
    interval_secs: u64,
    required: Vec<String>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));

        // Skip the first immediate tick
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match repo.validate_sessions(require_keys(required.clone())).await {
                Ok(report) if report.deleted > 0 => {
                    info!(
                        deleted = report.deleted,
                        kept = report.kept,
                        corrupt = report.corrupt,
                        "session sweep completed"
                    );
                }
                Ok(report) => {
                    debug!(scanned = report.scanned, "session sweep: nothing to delete");
                }
                Err(e) => {
                    warn!(error = %e, "session sweep failed");
                }
            }
        }
    })
}

/// Spawn a task that drops expired entries from an in-process store.
pub fn spawn_purge_task(
    store: Arc<MemoryStore>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(purged, remaining = store.len(), "purged expired sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ms_sessions::{BackingStore, RequestContext, WriteOptions};
    use serde_json::json;

    #[tokio::test]
    async fn sweep_task_removes_sessions_missing_required_keys() {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(SessionRepository::new(store.clone()));
        let ctx = RequestContext::new();
        let keep = json!({"user_id": 7}).as_object().cloned().unwrap();
        let drop = json!({"theme": "dark"}).as_object().cloned().unwrap();
        repo.write_session(&ctx, "keep", Some(&keep), &WriteOptions::default())
            .await
            .unwrap();
        repo.write_session(&ctx, "drop", Some(&drop), &WriteOptions::default())
            .await
            .unwrap();

        let handle = spawn_sweep_task(Arc::clone(&repo), 1, vec!["user_id".into()]);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        handle.abort();

        assert!(store.get("_session_id:keep:no_subsession").await.unwrap().is_some());
        assert!(store.get("_session_id:drop:no_subsession").await.unwrap().is_none());
    }
}

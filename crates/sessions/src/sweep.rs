//! Bulk validation of every stored session.
//!
//! The sweep snapshots the key set under the session namespace, then checks
//! each key on its own.  It is best-effort and non-transactional: a key that
//! expires between the listing and the read is skipped, and a store error on
//! one key is logged and counted without aborting the rest of the scan.
//! Only a failure to list the namespace is fatal.

use std::time::Instant;

use serde::Serialize;

use ms_domain::error::Result;
use ms_domain::trace::TraceEvent;

use crate::repository::SessionRepository;
use crate::session_key::KEY_PATTERN;
use crate::Payload;

/// Outcome counters for one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Keys returned by the namespace listing.
    pub scanned: usize,
    /// Records that satisfied the predicate.
    pub kept: usize,
    /// Records deleted, corrupt ones included.
    pub deleted: usize,
    /// Listed keys that were gone by the time they were read.
    pub vanished: usize,
    /// Records whose bytes failed to decode.
    pub corrupt: usize,
    /// Per-key store failures that were skipped.
    pub errors: usize,
}

impl SessionRepository {
    /// Delete every stored session whose payload fails `predicate`.
    ///
    /// Records that no longer decode can never satisfy a predicate and are
    /// deleted along with the failures.
    pub async fn validate_sessions<F>(&self, predicate: F) -> Result<SweepReport>
    where
        F: Fn(&Payload) -> bool,
    {
        let started = Instant::now();
        let keys = self.store().list_keys(KEY_PATTERN).await?;
        let mut report = SweepReport {
            scanned: keys.len(),
            ..SweepReport::default()
        };

        for key in &keys {
            let bytes = match self.store().get(key).await {
                Ok(Some(bytes)) => bytes,
                Ok(None) => {
                    report.vanished += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "sweep: read failed, skipping key");
                    report.errors += 1;
                    continue;
                }
            };

            let keep = match self.decode(key, &bytes) {
                Ok(payload) => predicate(&payload),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "sweep: undecodable session, deleting");
                    report.corrupt += 1;
                    false
                }
            };

            if keep {
                report.kept += 1;
                continue;
            }

            match self.store().delete(key).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "sweep: delete failed");
                    report.errors += 1;
                }
            }
        }

        TraceEvent::SweepCompleted {
            scanned: report.scanned,
            kept: report.kept,
            deleted: report.deleted,
            vanished: report.vanished,
            corrupt: report.corrupt,
            errors: report.errors,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        Ok(report)
    }
}

/// Predicate accepting payloads that contain every one of `keys`.
pub fn require_keys(keys: Vec<String>) -> impl Fn(&Payload) -> bool {
    move |payload| keys.iter().all(|k| payload.contains_key(k))
}

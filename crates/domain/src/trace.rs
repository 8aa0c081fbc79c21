use serde::Serialize;

/// Structured trace events emitted across all multisession crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    SessionLoaded {
        storage_key: String,
        found: bool,
    },
    SessionGenerated {
        session_id: String,
    },
    SessionWritten {
        storage_key: String,
        bytes: usize,
        ttl_secs: u64,
    },
    SessionDeleted {
        storage_key: String,
    },
    SubsessionAssigned {
        path: String,
        subsession_id: String,
        from_header: bool,
    },
    SweepCompleted {
        scanned: usize,
        kept: usize,
        deleted: usize,
        vanished: usize,
        corrupt: usize,
        errors: usize,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ms_event");
    }
}

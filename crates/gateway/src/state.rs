use std::sync::Arc;

use ms_domain::config::Config;
use ms_sessions::{MemoryStore, SessionRepository};

use crate::subsession::SubsessionPolicy;

/// Shared application state passed to all API handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: Arc<SessionRepository>,
    pub subsession: Arc<SubsessionPolicy>,
    /// Set when sessions live in process memory, so housekeeping can purge
    /// expired entries.
    pub memory_store: Option<Arc<MemoryStore>>,
}

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Default TTL applied to every session write: one day.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;

/// Longest TTL accepted from config: ten years.
pub const MAX_SESSION_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Default request parameter carrying the subsession id.
pub const DEFAULT_PARAM_NAME: &str = "subsession_id";

/// Session repository configuration: which backing store to talk to and how
/// records are keyed, serialized and expired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Connection URL for the `redis` backend.
    #[serde(default = "d_redis_url")]
    pub redis_url: String,
    /// TTL applied on every write.  `0` disables expiry.
    #[serde(default = "d_ttl")]
    pub ttl_secs: u64,
    /// Name of the request parameter holding the subsession id.
    #[serde(default = "d_param_name")]
    pub param_name: String,
    #[serde(default)]
    pub serializer: SerializerKind,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: d_redis_url(),
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            param_name: d_param_name(),
            serializer: SerializerKind::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process store; sessions do not survive a restart.
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerializerKind {
    #[default]
    Json,
    Cbor,
}

fn d_redis_url() -> String {
    "redis://127.0.0.1:6379".into()
}

fn d_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn d_param_name() -> String {
    DEFAULT_PARAM_NAME.into()
}

//! Subsession-aware session storage.
//!
//! One browser-visible session id fans out into independently addressable
//! subsessions, each persisted as its own record in an expiring key-value
//! store under `_session_id:<sessionId>:<subsessionId>`.  The
//! [`SessionRepository`] resolves, loads, writes and deletes those records;
//! [`SessionRepository::validate_sessions`] sweeps the whole namespace
//! against a caller-supplied predicate.

pub mod backend;
pub mod codec;
pub mod context;
pub mod id;
pub mod memory_store;
pub mod redis_store;
pub mod repository;
pub mod session_key;
pub mod sweep;

pub use backend::BackingStore;
pub use codec::{codec_for, CborCodec, JsonCodec, SessionCodec};
pub use context::RequestContext;
pub use id::{FixedId, IdGenerator, RandomHexId};
pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;
pub use repository::{SessionRepository, WriteOptions};
pub use session_key::{derive_key, KEY_PATTERN, KEY_PREFIX, NO_SUBSESSION};
pub use sweep::{require_keys, SweepReport};

/// A session payload: string keys mapped to JSON-compatible values.
pub type Payload = serde_json::Map<String, serde_json::Value>;

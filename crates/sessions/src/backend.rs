//! The `BackingStore` trait defines the interface for every keyed,
//! expiring store sessions can live in (Redis, in-memory, test doubles).

use async_trait::async_trait;
use ms_domain::error::Result;

/// Abstraction over a keyed key-value store with native TTL support.
///
/// `get` is a tri-state read: `Ok(Some(bytes))` when the key exists,
/// `Ok(None)` when it was never written or has expired, and `Err` when the
/// store itself failed.  Implementations must be safe for concurrent use.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Fetch the raw value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Overwrite `key` with `value`, expiring after `ttl_secs` seconds.
    /// A TTL of `0` stores the value without expiry.
    async fn set(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()>;

    /// Remove `key`.  Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List every live key matching a glob-style `pattern` (`*`, `?`, `[...]`).
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>>;
}

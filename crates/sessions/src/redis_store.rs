//! Redis-backed store using a multiplexed, auto-reconnecting
//! `ConnectionManager`.  The manager is cheap to clone, so each call takes
//! its own handle and the store stays `&self` throughout.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use ms_domain::error::{Error, Result};

use crate::backend::BackingStore;

/// Keys fetched per `SCAN` round trip.
const SCAN_BATCH: usize = 200;

pub struct RedisStore {
    conn: ConnectionManager,
}

/// Convert a Redis error into the shared error type.
fn from_redis(e: redis::RedisError) -> Error {
    Error::Store(format!("redis: {e}"))
}

impl RedisStore {
    /// Connect to the Redis server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(from_redis)?;
        let conn = ConnectionManager::new(client).await.map_err(from_redis)?;
        tracing::info!(url = %redact_url(url), "connected to redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl BackingStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(from_redis)
    }

    async fn set(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()> {
        let mut conn = self.conn.clone();
        if ttl_secs == 0 {
            conn.set::<_, _, ()>(key, value).await.map_err(from_redis)
        } else {
            conn.set_ex::<_, _, ()>(key, value, ttl_secs)
                .await
                .map_err(from_redis)
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await.map_err(from_redis)
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(from_redis)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once across iterations.
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }
}

/// Strip credentials from a connection URL before logging it.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_owned(),
    }
}

//! Session repository: find / write / delete of one subsession record.
//!
//! Every operation resolves exactly one storage key from the session id and
//! the request's subsession parameter, and touches only that key.

use std::sync::Arc;

use ms_domain::config::{StoreConfig, DEFAULT_PARAM_NAME, DEFAULT_SESSION_TTL_SECS};
use ms_domain::error::{Error, Result};
use ms_domain::trace::TraceEvent;

use crate::backend::BackingStore;
use crate::codec::{codec_for, JsonCodec, SessionCodec};
use crate::context::RequestContext;
use crate::id::{IdGenerator, RandomHexId};
use crate::session_key::derive_key;
use crate::Payload;

/// Per-call write options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Overrides the repository's default TTL for this write.
    pub ttl_secs: Option<u64>,
}

impl WriteOptions {
    pub fn with_ttl(ttl_secs: u64) -> Self {
        Self {
            ttl_secs: Some(ttl_secs),
        }
    }
}

/// Subsession-aware session repository.
///
/// Holds only immutable handles, so one instance is shared (via `Arc`)
/// across all request tasks.
pub struct SessionRepository {
    store: Arc<dyn BackingStore>,
    codec: Arc<dyn SessionCodec>,
    ids: Arc<dyn IdGenerator>,
    ttl_secs: u64,
    param_name: String,
}

impl SessionRepository {
    /// Repository with the default JSON codec, random ids, a one-day TTL and
    /// the `subsession_id` parameter.
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self {
            store,
            codec: Arc::new(JsonCodec),
            ids: Arc::new(RandomHexId),
            ttl_secs: DEFAULT_SESSION_TTL_SECS,
            param_name: DEFAULT_PARAM_NAME.to_owned(),
        }
    }

    /// Repository configured from the `[store]` config section.
    pub fn from_config(store: Arc<dyn BackingStore>, cfg: &StoreConfig) -> Self {
        Self::new(store)
            .with_codec(codec_for(cfg.serializer))
            .with_ttl_secs(cfg.ttl_secs)
            .with_param_name(cfg.param_name.clone())
    }

    pub fn with_codec(mut self, codec: Arc<dyn SessionCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn with_param_name(mut self, param_name: impl Into<String>) -> Self {
        self.param_name = param_name.into();
        self
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    pub fn param_name(&self) -> &str {
        &self.param_name
    }

    pub(crate) fn store(&self) -> &dyn BackingStore {
        self.store.as_ref()
    }

    pub fn codec(&self) -> &dyn SessionCodec {
        self.codec.as_ref()
    }

    /// Storage key for `session_id` under the request's subsession.
    pub fn storage_key(&self, ctx: &RequestContext, session_id: &str) -> String {
        derive_key(session_id, ctx.param(&self.param_name))
    }

    /// Load the session for this request.
    ///
    /// Without a session id a fresh one is generated and paired with an
    /// empty payload; the store is not consulted.  A missing or expired
    /// record also reads as an empty payload.  Stored bytes that fail to
    /// decode surface as [`Error::Decode`].
    pub async fn find_session(
        &self,
        ctx: &RequestContext,
        session_id: Option<&str>,
    ) -> Result<(String, Payload)> {
        let Some(session_id) = session_id else {
            let generated = self.ids.generate();
            TraceEvent::SessionGenerated {
                session_id: generated.clone(),
            }
            .emit();
            return Ok((generated, Payload::new()));
        };

        let key = self.storage_key(ctx, session_id);
        let raw = self.store.get(&key).await?;

        TraceEvent::SessionLoaded {
            storage_key: key.clone(),
            found: raw.is_some(),
        }
        .emit();

        let payload = match raw {
            Some(bytes) => self.decode(&key, &bytes)?,
            None => Payload::new(),
        };
        Ok((session_id.to_owned(), payload))
    }

    /// Persist the session for this request, fully replacing any previous
    /// payload.  `None` clears the session by deleting its record.
    ///
    /// Returns `session_id` unchanged.
    pub async fn write_session(
        &self,
        ctx: &RequestContext,
        session_id: &str,
        payload: Option<&Payload>,
        options: &WriteOptions,
    ) -> Result<String> {
        let key = self.storage_key(ctx, session_id);
        match payload {
            Some(payload) => {
                let bytes = self.codec.encode(payload)?;
                let ttl_secs = options.ttl_secs.unwrap_or(self.ttl_secs);
                self.store.set(&key, &bytes, ttl_secs).await?;
                TraceEvent::SessionWritten {
                    storage_key: key,
                    bytes: bytes.len(),
                    ttl_secs,
                }
                .emit();
            }
            None => {
                self.store.delete(&key).await?;
                TraceEvent::SessionDeleted { storage_key: key }.emit();
            }
        }
        Ok(session_id.to_owned())
    }

    /// Delete the session record for this request.  Absent records are fine.
    pub async fn delete_session(
        &self,
        ctx: &RequestContext,
        session_id: &str,
        _options: &WriteOptions,
    ) -> Result<String> {
        let key = self.storage_key(ctx, session_id);
        self.store.delete(&key).await?;
        TraceEvent::SessionDeleted { storage_key: key }.emit();
        Ok(session_id.to_owned())
    }

    pub(crate) fn decode(&self, key: &str, bytes: &[u8]) -> Result<Payload> {
        self.codec.decode(bytes).map_err(|e| Error::Decode {
            key: key.to_owned(),
            message: format!("{} codec: {e}", self.codec.name()),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::codec::CborCodec;
    use crate::id::FixedId;
    use crate::memory_store::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps a [`MemoryStore`] and counts every call that reaches it.
    #[derive(Default)]
    pub(crate) struct CountingStore {
        pub inner: MemoryStore,
        pub gets: AtomicUsize,
        pub sets: AtomicUsize,
        pub deletes: AtomicUsize,
        pub lists: AtomicUsize,
    }

    impl CountingStore {
        pub fn calls(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
                + self.sets.load(Ordering::SeqCst)
                + self.deletes.load(Ordering::SeqCst)
                + self.lists.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackingStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &[u8], ttl_secs: u64) -> Result<()> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            self.inner.set(key, value, ttl_secs).await
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            self.inner.delete(key).await
        }

        async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.inner.list_keys(pattern).await
        }
    }

    fn payload(value: serde_json::Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    fn repo_with(store: Arc<dyn BackingStore>) -> SessionRepository {
        SessionRepository::new(store).with_id_generator(Arc::new(FixedId("gen1".into())))
    }

    fn ctx(subsession: &str) -> RequestContext {
        RequestContext::new().with_param("subsession_id", subsession)
    }

    #[tokio::test]
    async fn write_stores_encoded_payload_under_subsession_key() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store.clone());

        let sid = repo
            .write_session(
                &ctx("s1"),
                "abc",
                Some(&payload(json!({"k": "v"}))),
                &WriteOptions::with_ttl(123),
            )
            .await
            .unwrap();

        assert_eq!(sid, "abc");
        assert_eq!(
            store.get("_session_id:abc:s1").await.unwrap().as_deref(),
            Some(&br#"{"k":"v"}"#[..])
        );
        let ttl = store.ttl_remaining("_session_id:abc:s1").unwrap();
        assert!(ttl.as_secs() <= 123 && ttl.as_secs() >= 120);
    }

    #[tokio::test]
    async fn find_without_session_id_generates_and_skips_store() {
        let store = Arc::new(CountingStore::default());
        let repo = repo_with(store.clone());

        let (sid, data) = repo.find_session(&RequestContext::new(), None).await.unwrap();

        assert_eq!(sid, "gen1");
        assert!(data.is_empty());
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn write_then_find_round_trips() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store);
        let data = payload(json!({"k": "v", "n": [1, 2.5, null], "o": {"b": true}}));

        repo.write_session(&ctx("s1"), "abc", Some(&data), &WriteOptions::with_ttl(123))
            .await
            .unwrap();
        let (sid, found) = repo.find_session(&ctx("s1"), Some("abc")).await.unwrap();

        assert_eq!(sid, "abc");
        assert_eq!(found, data);
    }

    #[tokio::test]
    async fn missing_record_reads_as_empty() {
        let store = Arc::new(CountingStore::default());
        let repo = repo_with(store.clone());

        let (sid, data) = repo.find_session(&ctx("s1"), Some("abc")).await.unwrap();

        assert_eq!(sid, "abc");
        assert!(data.is_empty());
        assert_eq!(store.gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writing_none_deletes_the_record() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store.clone());
        repo.write_session(&ctx("s1"), "abc", Some(&payload(json!({"k": "v"}))), &WriteOptions::default())
            .await
            .unwrap();

        let sid = repo
            .write_session(&ctx("s1"), "abc", None, &WriteOptions::default())
            .await
            .unwrap();

        assert_eq!(sid, "abc");
        assert!(store.get("_session_id:abc:s1").await.unwrap().is_none());
        let (_, data) = repo.find_session(&ctx("s1"), Some("abc")).await.unwrap();
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn empty_payload_is_written_not_deleted() {
        let store = Arc::new(CountingStore::default());
        let repo = repo_with(store.clone());

        repo.write_session(&ctx("s1"), "abc", Some(&Payload::new()), &WriteOptions::default())
            .await
            .unwrap();

        assert_eq!(store.sets.load(Ordering::SeqCst), 1);
        assert_eq!(store.deletes.load(Ordering::SeqCst), 0);
        assert_eq!(
            store.inner.get("_session_id:abc:s1").await.unwrap().as_deref(),
            Some(&b"{}"[..])
        );
    }

    #[tokio::test]
    async fn write_replaces_rather_than_merges() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store);
        repo.write_session(&ctx("s1"), "abc", Some(&payload(json!({"a": 1, "b": 2}))), &WriteOptions::default())
            .await
            .unwrap();
        repo.write_session(&ctx("s1"), "abc", Some(&payload(json!({"c": 3}))), &WriteOptions::default())
            .await
            .unwrap();

        let (_, data) = repo.find_session(&ctx("s1"), Some("abc")).await.unwrap();
        assert_eq!(data, payload(json!({"c": 3})));
    }

    #[tokio::test]
    async fn default_ttl_applies_without_override() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store.clone()).with_ttl_secs(500);

        repo.write_session(&ctx("s1"), "abc", Some(&Payload::new()), &WriteOptions::default())
            .await
            .unwrap();

        let ttl = store.ttl_remaining("_session_id:abc:s1").unwrap();
        assert!(ttl.as_secs() > 400 && ttl.as_secs() <= 500);
    }

    #[tokio::test]
    async fn delete_removes_only_the_resolved_key() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store.clone());
        let data = payload(json!({"k": "v"}));
        for (sub, sid) in [("s1", "abc"), ("s2", "abc"), ("s1", "xyz")] {
            repo.write_session(&ctx(sub), sid, Some(&data), &WriteOptions::default())
                .await
                .unwrap();
        }
        repo.write_session(&RequestContext::new(), "abc", Some(&data), &WriteOptions::default())
            .await
            .unwrap();

        let sid = repo
            .delete_session(&ctx("s1"), "abc", &WriteOptions::default())
            .await
            .unwrap();

        assert_eq!(sid, "abc");
        let mut keys = store.list_keys("*").await.unwrap();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "_session_id:abc:no_subsession",
                "_session_id:abc:s2",
                "_session_id:xyz:s1",
            ]
        );
    }

    #[tokio::test]
    async fn deleting_absent_record_is_not_an_error() {
        let repo = repo_with(Arc::new(MemoryStore::new()));
        let sid = repo
            .delete_session(&ctx("s1"), "nope", &WriteOptions::default())
            .await
            .unwrap();
        assert_eq!(sid, "nope");
    }

    #[tokio::test]
    async fn no_subsession_param_uses_sentinel_key() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store.clone());

        repo.write_session(&RequestContext::new(), "abc", Some(&Payload::new()), &WriteOptions::default())
            .await
            .unwrap();

        assert!(store
            .get("_session_id:abc:no_subsession")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn subsessions_are_isolated() {
        let repo = repo_with(Arc::new(MemoryStore::new()));
        repo.write_session(&ctx("tab1"), "abc", Some(&payload(json!({"cart": 1}))), &WriteOptions::default())
            .await
            .unwrap();
        repo.write_session(&ctx("tab2"), "abc", Some(&payload(json!({"cart": 2}))), &WriteOptions::default())
            .await
            .unwrap();

        let (_, one) = repo.find_session(&ctx("tab1"), Some("abc")).await.unwrap();
        let (_, two) = repo.find_session(&ctx("tab2"), Some("abc")).await.unwrap();
        let (_, none) = repo.find_session(&RequestContext::new(), Some("abc")).await.unwrap();
        assert_eq!(one["cart"], 1);
        assert_eq!(two["cart"], 2);
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn custom_param_name_is_honoured() {
        let store = Arc::new(MemoryStore::new());
        let repo = repo_with(store.clone()).with_param_name("tab");
        let ctx = RequestContext::new()
            .with_param("tab", "t9")
            .with_param("subsession_id", "ignored");

        repo.write_session(&ctx, "abc", Some(&Payload::new()), &WriteOptions::default())
            .await
            .unwrap();

        assert!(store.get("_session_id:abc:t9").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn cbor_codec_round_trips_through_store() {
        let repo = repo_with(Arc::new(MemoryStore::new())).with_codec(Arc::new(CborCodec));
        let data = payload(json!({"k": "v", "nested": {"n": [1, 2]}}));

        repo.write_session(&ctx("s1"), "abc", Some(&data), &WriteOptions::default())
            .await
            .unwrap();
        let (_, found) = repo.find_session(&ctx("s1"), Some("abc")).await.unwrap();
        assert_eq!(found, data);
    }

    #[tokio::test]
    async fn corrupt_record_is_a_decode_error() {
        let store = Arc::new(MemoryStore::new());
        store.set("_session_id:abc:s1", b"not json", 60).await.unwrap();
        let repo = repo_with(store);

        let err = repo.find_session(&ctx("s1"), Some("abc")).await.unwrap_err();
        match err {
            Error::Decode { key, .. } => assert_eq!(key, "_session_id:abc:s1"),
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn from_config_applies_store_section() {
        let store = Arc::new(MemoryStore::new());
        let cfg = StoreConfig {
            ttl_secs: 77,
            param_name: "tab".into(),
            ..StoreConfig::default()
        };
        let repo = SessionRepository::from_config(store, &cfg);
        assert_eq!(repo.ttl_secs(), 77);
        assert_eq!(repo.param_name(), "tab");
        assert_eq!(repo.codec().name(), "json");
    }

    #[tokio::test]
    async fn oversized_ttl_writes_without_expiry() {
        let store = Arc::new(MemoryStore::new());
        let repo = SessionRepository::new(store.clone()).with_ttl_secs(u64::MAX);

        repo.write_session(&ctx("s1"), "abc", Some(&Payload::new()), &WriteOptions::default())
            .await
            .unwrap();

        assert!(store.get("_session_id:abc:s1").await.unwrap().is_some());
        assert!(store.ttl_remaining("_session_id:abc:s1").is_none());
    }
}

//! AppState construction and background-task spawning extracted from `main.rs`.
//!
//! `serve` and `sweep` share [`build_app_state`] so both talk to the same
//! backing store with the same repository settings.

use std::sync::Arc;

use anyhow::Context;

use ms_domain::config::{Config, ConfigSeverity, StoreBackend};
use ms_sessions::{BackingStore, MemoryStore, RedisStore, SessionRepository};

use crate::state::AppState;
use crate::subsession::SubsessionPolicy;
use crate::sweeper;

/// How often expired entries are purged from the in-memory backend.
const MEMORY_PURGE_INTERVAL_SECS: u64 = 60;

/// Validate config, connect the backing store and return a fully-wired
/// [`AppState`].
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Backing store ────────────────────────────────────────────────
    let (store, memory_store): (Arc<dyn BackingStore>, Option<Arc<MemoryStore>>) =
        match config.store.backend {
            StoreBackend::Memory => {
                let memory = Arc::new(MemoryStore::new());
                let store: Arc<dyn BackingStore> = memory.clone();
                (store, Some(memory))
            }
            StoreBackend::Redis => {
                let redis = RedisStore::connect(&config.store.redis_url)
                    .await
                    .context("connecting to redis")?;
                let store: Arc<dyn BackingStore> = Arc::new(redis);
                (store, None)
            }
        };

    // ── Session repository ───────────────────────────────────────────
    let repo = Arc::new(SessionRepository::from_config(store, &config.store));
    tracing::info!(
        backend = ?config.store.backend,
        codec = repo.codec().name(),
        ttl_secs = repo.ttl_secs(),
        param_name = repo.param_name(),
        "session repository ready"
    );

    // ── Subsession middleware policy ─────────────────────────────────
    let subsession = Arc::new(
        SubsessionPolicy::from_config(&config.subsession, &config.store.param_name)
            .context("building subsession policy")?,
    );

    Ok(AppState {
        config,
        repo,
        subsession,
        memory_store,
    })
}

/// Spawn the periodic sweep and in-memory purge loops configured for
/// `state`.
pub fn spawn_background_tasks(state: &AppState) {
    let sweep = &state.config.sweep;
    if sweep.interval_secs > 0 {
        sweeper::spawn_sweep_task(
            state.repo.clone(),
            sweep.interval_secs,
            sweep.require_keys.clone(),
        );
        tracing::info!(
            interval_secs = sweep.interval_secs,
            require_keys = ?sweep.require_keys,
            "background session sweep enabled"
        );
    }

    if let Some(memory) = &state.memory_store {
        sweeper::spawn_purge_task(memory.clone(), MEMORY_PURGE_INTERVAL_SECS);
    }
}

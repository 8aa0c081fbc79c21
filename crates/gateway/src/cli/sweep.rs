use std::sync::Arc;

use anyhow::Context;

use ms_domain::config::{Config, StoreBackend};
use ms_sessions::require_keys;

use crate::bootstrap;

/// Run a single sweep against the configured store and print the report
/// as JSON.
///
/// `require` overrides `sweep.require_keys` when non-empty.  The memory
/// backend is rejected: a one-shot process cannot reach the sessions held
/// in another process's memory.
pub async fn run(config: Arc<Config>, require: Vec<String>) -> anyhow::Result<()> {
    if config.store.backend == StoreBackend::Memory {
        anyhow::bail!(
            "`sweep` needs a shared store: with backend = \"memory\" the sessions live \
             inside the server process; set [store] backend = \"redis\" or enable \
             [sweep] interval_secs on the server instead"
        );
    }

    let required = if require.is_empty() {
        config.sweep.require_keys.clone()
    } else {
        require
    };
    if required.is_empty() {
        tracing::warn!("no required keys given; every decodable session will be kept");
    }

    let state = bootstrap::build_app_state(config).await?;
    let report = state
        .repo
        .validate_sessions(require_keys(required))
        .await
        .context("sweeping sessions")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

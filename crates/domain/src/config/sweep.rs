use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Background sweep
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Seconds between background sweeps.  `0` disables the sweeper.
    #[serde(default)]
    pub interval_secs: u64,
    /// Records whose payload lacks any of these keys are deleted.
    #[serde(default)]
    pub require_keys: Vec<String>,
}

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Subsession assignment
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls the middleware that assigns a subsession id to requests which
/// arrive without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsessionConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    /// Inbound header that may pre-supply the subsession id.  Takes
    /// precedence over random generation.  `None` disables the lookup.
    #[serde(default = "d_header")]
    pub header: Option<String>,
    /// Paths that never receive a generated subsession id.
    #[serde(default)]
    pub exclude_paths: Vec<ExcludePath>,
}

impl Default for SubsessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            header: d_header(),
            exclude_paths: Vec::new(),
        }
    }
}

/// A path exclusion: either a literal path (exact match) or a regular
/// expression matched anywhere in the path.
///
/// ```toml
/// exclude_paths = ["/health", { pattern = "^/assets/" }]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExcludePath {
    Literal(String),
    Pattern { pattern: String },
}

fn d_true() -> bool {
    true
}

fn d_header() -> Option<String> {
    Some("x-subsession-id".into())
}

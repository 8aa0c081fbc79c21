mod server;
mod store;
mod subsession;
mod sweep;

pub use server::*;
pub use store::*;
pub use subsession::*;
pub use sweep::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub subsession: SubsessionConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

/// Whether `s` is usable as a bare query-string name or value without
/// percent-encoding.
pub fn is_url_safe_token(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }

        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }

        if self.server.cookie_name.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.cookie_name".into(),
                message: "cookie_name must not be empty".into(),
            });
        }

        // The param name is spliced into query strings verbatim.
        if !is_url_safe_token(&self.store.param_name) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.param_name".into(),
                message: "param_name must be non-empty and contain only [A-Za-z0-9-_.~]"
                    .into(),
            });
        }

        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.redis_url".into(),
                message: "redis_url must not be empty when backend = \"redis\"".into(),
            });
        }

        if self.store.ttl_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "store.ttl_secs".into(),
                message: "ttl_secs = 0 stores sessions without expiry".into(),
            });
        }

        if self.store.ttl_secs > MAX_SESSION_TTL_SECS {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.ttl_secs".into(),
                message: format!("ttl_secs must be at most {MAX_SESSION_TTL_SECS}"),
            });
        }

        if self.store.backend == StoreBackend::Memory {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "store.backend".into(),
                message: "memory backend loses all sessions on restart".into(),
            });
        }

        for (i, exclude) in self.subsession.exclude_paths.iter().enumerate() {
            match exclude {
                ExcludePath::Literal(path) if path.is_empty() => {
                    errors.push(ConfigError {
                        severity: ConfigSeverity::Error,
                        field: format!("subsession.exclude_paths[{i}]"),
                        message: "literal path must not be empty".into(),
                    });
                }
                ExcludePath::Pattern { pattern } => {
                    if let Err(e) = regex::Regex::new(pattern) {
                        errors.push(ConfigError {
                            severity: ConfigSeverity::Error,
                            field: format!("subsession.exclude_paths[{i}].pattern"),
                            message: format!("invalid regex: {e}"),
                        });
                    }
                }
                ExcludePath::Literal(_) => {}
            }
        }

        if self.sweep.interval_secs > 0 && self.sweep.require_keys.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "sweep.require_keys".into(),
                message: "background sweep enabled with no required keys; it will only remove corrupt records".into(),
            });
        }

        errors
    }
}

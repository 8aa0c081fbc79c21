//! `multisession config validate|show`.

use ms_domain::config::{Config, ConfigError, ConfigSeverity};

/// Print every config issue, errors before warnings.
///
/// Returns `true` when the config can be served (warnings only).
pub fn validate(config: &Config, config_path: &str) -> bool {
    let (errors, warnings): (Vec<ConfigError>, Vec<ConfigError>) = config
        .validate()
        .into_iter()
        .partition(|issue| issue.severity == ConfigSeverity::Error);

    for issue in errors.iter().chain(&warnings) {
        println!("{issue}");
    }
    println!("{}", summary(config_path, errors.len(), warnings.len()));

    errors.is_empty()
}

fn summary(config_path: &str, errors: usize, warnings: usize) -> String {
    match (errors, warnings) {
        (0, 0) => format!("{config_path}: ok"),
        (0, w) => format!("{config_path}: ok with {w} warning(s)"),
        (e, w) => format!("{config_path}: {e} error(s), {w} warning(s); refusing to serve"),
    }
}

/// The resolved config, defaults included, as TOML.
pub fn render(config: &Config) -> anyhow::Result<String> {
    toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serializing config: {e}"))
}

pub fn show(config: &Config) -> anyhow::Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

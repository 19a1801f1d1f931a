//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Origin URL override.
pub const ENV_ORIGIN_URL: &str = "ORIGIN_URL";
/// Listener bind address override.
pub const ENV_BIND_ADDRESS: &str = "PROXY_BIND_ADDRESS";
/// Cache TTL override, in seconds.
pub const ENV_CACHE_TTL_SECS: &str = "PROXY_CACHE_TTL_SECS";
/// Multi-tenant key scoping override ("true"/"false").
pub const ENV_MULTI_TENANT: &str = "PROXY_MULTI_TENANT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: '{value}'")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file into a configuration without validating it.
pub fn read_config_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load configuration: optional TOML file, then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a configuration.
///
/// `lookup` abstracts the environment so tests stay hermetic.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(origin) = lookup(ENV_ORIGIN_URL).filter(|v| !v.is_empty()) {
        config.upstream.origin_url = origin;
    }

    if let Some(addr) = lookup(ENV_BIND_ADDRESS).filter(|v| !v.is_empty()) {
        config.listener.bind_address = addr;
    }

    if let Some(ttl) = lookup(ENV_CACHE_TTL_SECS) {
        config.cache.ttl_secs = ttl.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_CACHE_TTL_SECS,
            value: ttl.clone(),
        })?;
    }

    if let Some(flag) = lookup(ENV_MULTI_TENANT) {
        config.cache.multi_tenant = match flag.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(ConfigError::Env {
                    var: ENV_MULTI_TENANT,
                    value: flag,
                })
            }
        };
    }

    Ok(())
}

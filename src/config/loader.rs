//! Configuration loading from disk and key resolution.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{CloakConfig, Environment, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::obfuscation::{KeyError, KeySource, SecretKey};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Key error: {0}")]
    Key(#[from] KeyError),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Resolve the obfuscation key from the process environment and config.
pub fn resolve_key(config: &CloakConfig) -> Result<SecretKey, ConfigError> {
    resolve_key_with(config, |name| std::env::var(name).ok())
}

/// Resolve the obfuscation key using `lookup` for environment variables.
///
/// Precedence: environment variable, then `cloak.secret_key`, then the
/// built-in fallback. The fallback is refused in production.
pub fn resolve_key_with<F>(config: &CloakConfig, lookup: F) -> Result<SecretKey, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(&config.key_env_var).filter(|v| !v.is_empty()) {
        return Ok(SecretKey::new(value, KeySource::Environment)?);
    }

    if let Some(value) = config.secret_key.as_deref() {
        return Ok(SecretKey::new(value, KeySource::Configured)?);
    }

    if config.environment == Environment::Production {
        return Err(KeyError::FallbackInProduction(config.key_env_var.clone()).into());
    }

    tracing::warn!(
        env_var = %config.key_env_var,
        "No obfuscation key configured; using the PUBLIC built-in fallback key. \
         Obfuscated URLs are readable by anyone. Set the key before deploying."
    );
    Ok(SecretKey::fallback())
}

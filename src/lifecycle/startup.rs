//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Resolve the obfuscation key (after logging is up)
//! - Build the immutable decision engine
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Without a config path, defaults are used (development only)

use std::path::Path;

use crate::config::{self, ConfigError, GatewayConfig};
use crate::routing::RouteCloak;

/// Everything the gateway needs before binding a listener.
#[derive(Debug)]
pub struct Bootstrap {
    pub config: GatewayConfig,
    pub cloak: RouteCloak,
}

/// Load and validate config from `path`, or validate the defaults.
///
/// Runs before logging is set up, since the subscriber depends on it.
pub fn load_startup_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    match path {
        Some(path) => config::load_config(path),
        None => {
            let config = GatewayConfig::default();
            config::validation::validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Resolve the key for `config` and build the decision engine.
///
/// Call after logging is initialized so the key warnings are recorded.
pub fn bootstrap(config: GatewayConfig) -> Result<Bootstrap, ConfigError> {
    let key = config::resolve_key(&config.cloak)?;

    tracing::info!(
        key_source = %key.source(),
        key_len = key.as_bytes().len(),
        environment = ?config.cloak.environment,
        obfuscated_routes = config.cloak.obfuscated_routes.len(),
        "Obfuscation key resolved"
    );

    let cloak = RouteCloak::from_config(&config.cloak, key);
    Ok(Bootstrap { config, cloak })
}

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → loader.rs resolves the obfuscation key (env → file → fallback)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The key never hot-reloads: a new key invalidates every issued URL

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, resolve_key, ConfigError};
pub use schema::{
    CloakConfig, Environment, GatewayConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    TlsConfig, UpstreamConfig,
};
pub use validation::ValidationError;

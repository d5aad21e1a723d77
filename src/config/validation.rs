//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect conflicting route sets (obfuscated vs reserved)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, StatusCode};
use thiserror::Error;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("cloak.obfuscated_routes must not be empty")]
    NoObfuscatedRoutes,

    #[error("cloak.obfuscated_routes: '{0}' is not a valid path segment")]
    InvalidRouteName(String),

    #[error("'{0}' is both an obfuscated route and a reserved segment")]
    RouteConflict(String),

    #[error("cloak.excluded_prefixes: '{0}' must start with '/'")]
    InvalidPrefix(String),

    #[error("cloak.marker_header: '{0}' is not a valid header name")]
    InvalidHeader(String),

    #[error("cloak.redirect_status: {0} is not a redirect status")]
    InvalidRedirectStatus(u16),

    #[error("cloak.secret_key must not be empty when set")]
    EmptySecretKey,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "upstream.address", &config.upstream.address);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.upstream.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero("upstream.connect_timeout_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::Zero("security.max_body_size"));
    }

    let cloak = &config.cloak;
    if cloak.obfuscated_routes.is_empty() {
        errors.push(ValidationError::NoObfuscatedRoutes);
    }
    for route in &cloak.obfuscated_routes {
        let valid = !route.is_empty()
            && route
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b'.');
        if !valid {
            errors.push(ValidationError::InvalidRouteName(route.clone()));
        }
        if cloak.reserved_segments.contains(route) {
            errors.push(ValidationError::RouteConflict(route.clone()));
        }
    }
    for prefix in &cloak.excluded_prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix(prefix.clone()));
        }
    }
    if HeaderName::from_bytes(cloak.marker_header.as_bytes()).is_err() {
        errors.push(ValidationError::InvalidHeader(cloak.marker_header.clone()));
    }
    let redirect_ok = StatusCode::from_u16(cloak.redirect_status)
        .map(|s| matches!(s.as_u16(), 301 | 302 | 303 | 307 | 308))
        .unwrap_or(false);
    if !redirect_ok {
        errors.push(ValidationError::InvalidRedirectStatus(cloak.redirect_status));
    }
    if cloak.secret_key.as_deref() == Some("") {
        errors.push(ValidationError::EmptySecretKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.upstream.address = "not-an-address".into();
        config.timeouts.request_secs = 0;
        config.cloak.obfuscated_routes.push("api".into());
        config.cloak.excluded_prefixes.push("static".into());
        config.cloak.marker_header = "bad header".into();
        config.cloak.redirect_status = 200;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 6);
        assert!(errors.contains(&ValidationError::RouteConflict("api".into())));
        assert!(errors.contains(&ValidationError::InvalidRedirectStatus(200)));
    }

    #[test]
    fn test_route_names_must_be_segments() {
        let mut config = GatewayConfig::default();
        config.cloak.obfuscated_routes = vec!["publisher/dashboard".into()];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors, vec![ValidationError::InvalidRouteName("publisher/dashboard".into())]);
    }

    #[test]
    fn test_empty_route_set_rejected() {
        let mut config = GatewayConfig::default();
        config.cloak.obfuscated_routes.clear();
        assert_eq!(validate_config(&config), Err(vec![ValidationError::NoObfuscatedRoutes]));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut config = GatewayConfig::default();
        config.cloak.secret_key = Some(String::new());
        assert_eq!(validate_config(&config), Err(vec![ValidationError::EmptySecretKey]));
    }
}

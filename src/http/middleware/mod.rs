//! Request middleware applied by the gateway.

pub mod cloak;

pub use cloak::{cloak_router, route_cloak_middleware, CloakState, CloakStateError, CloakedPath};

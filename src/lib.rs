//! Route path obfuscation gateway library.
//!
//! Plaintext routes such as `/publisher/dashboard` are shown to clients as
//! an opaque token (`/CRoXHkQADQYAShBMGA0bQgkXFg`) while everything behind
//! the gateway keeps working with plaintext paths.
//!
//! The scheme is a keyed XOR + URL-safe Base64 obfuscation. It hides route
//! names from casual inspection and nothing more: it is not encryption and
//! must never be used as an access-control boundary.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod obfuscation;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
pub use obfuscation::{Classifier, PathCodec, SecretKey};
pub use routing::{RouteCloak, RouteDecision};

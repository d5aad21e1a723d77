//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, tracing, timeouts, body limit)
//!     → request.rs (assign and propagate request ID)
//!     → middleware/cloak.rs (rewrite token → plain, or redirect plain → token)
//!     → server.rs forward handler (plaintext path to upstream)
//!     → Send upstream response to client
//! ```

pub mod middleware;
pub mod request;
pub mod server;

pub use middleware::{cloak_router, CloakState, CloakedPath};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{GatewayServer, ServerError};

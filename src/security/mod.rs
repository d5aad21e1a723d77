//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-*)
//! Response from upstream:
//!     → headers.rs (strip hop-by-hop)
//! ```
//!
//! # Design Decisions
//! - Path obfuscation is NOT a security boundary; access control belongs
//!   to the upstream application
//! - Never trust existing X-Forwarded-* from untrusted sources

pub mod headers;

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, query, marker header)
//!     → matcher.rs (excluded prefix? → untouched)
//!     → decision.rs (classify first segment)
//!     → Rewrite | Redirect | PassThrough
//! ```
//!
//! # Design Decisions
//! - Exclusions and route sets built at startup, immutable at runtime
//! - No regex in hot path (prefix and set lookups only)
//! - Deterministic: same input always yields the same decision
//! - First matching rule wins

pub mod decision;
pub mod matcher;

pub use decision::{PassReason, RouteCloak, RouteDecision};
pub use matcher::{ExclusionMatcher, Matcher, PathPrefixMatcher};

//! Request matching for paths that bypass obfuscation.
//!
//! # Responsibilities
//! - Match path prefixes on segment boundaries (case-sensitive)
//! - Combine conditions with OR semantics into an exclusion list
//!
//! # Design Decisions
//! - `/api` matches `/api` and `/api/tasks`, never `/apiary`
//! - No regex to guarantee O(n) matching
//! - Evaluated before the decision state machine so excluded requests never
//!   touch the codec

use axum::body::Body;
use axum::http::Request;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

/// Matches the request path prefix on a segment boundary.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher. A trailing `/` is ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.len() > 1 && prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    pub fn matches_path(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/') || self.prefix == "/",
            None => false,
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.matches_path(req.uri().path())
    }
}

/// Paths that never enter the obfuscation state machine.
///
/// Matches if any configured prefix matches.
#[derive(Debug, Clone, Default)]
pub struct ExclusionMatcher {
    prefixes: Vec<PathPrefixMatcher>,
}

impl ExclusionMatcher {
    pub fn new<I>(prefixes: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(PathPrefixMatcher::new).collect(),
        }
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.prefixes.iter().any(|m| m.matches_path(path))
    }
}

impl Matcher for ExclusionMatcher {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.is_excluded(req.uri().path())
    }
}

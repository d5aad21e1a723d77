//! Per-request obfuscation decision.
//!
//! # Responsibilities
//! - Split the path into non-empty segments
//! - Decode-and-rewrite when the first segment is a token
//! - Encode-and-redirect when the first two segments are a plain
//!   obfuscated route
//! - Pass everything else through untouched
//!
//! # Design Decisions
//! - Pure function of (path, query, marker): no I/O, no shared mutable state
//! - Every failure resolves to `PassThrough` (fail open)
//! - Decoded text is untrusted: a rewrite only happens when every component
//!   is a plain path segment, so a token can never inject a query, a
//!   fragment or a dot segment into the internal URI
//! - Only routes in the obfuscated set are ever redirected, so every token
//!   we hand out classifies as a token when it comes back

use crate::config::CloakConfig;
use crate::obfuscation::{Classification, Classifier, PathCodec, SecretKey};

/// Why a request was left as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// Fewer than two segments and not a token.
    TooShort,
    /// First segment is a reserved plain name.
    ReservedSegment,
    /// First segment is not an obfuscated route.
    NotObfuscated,
    /// The request carries the redirect marker.
    MarkerPresent,
    /// Encoding or decoding produced nothing usable.
    FailOpen,
}

impl PassReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassReason::TooShort => "too_short",
            PassReason::ReservedSegment => "reserved_segment",
            PassReason::NotObfuscated => "not_obfuscated",
            PassReason::MarkerPresent => "marker_present",
            PassReason::FailOpen => "fail_open",
        }
    }
}

/// What the middleware should do with a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Serve internally from this plaintext path (query included).
    Rewrite { path_and_query: String },
    /// Redirect the client to this obfuscated location (query included).
    Redirect { location: String },
    /// Serve the request exactly as received.
    PassThrough { reason: PassReason },
}

impl RouteDecision {
    /// Metric/log label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            RouteDecision::Rewrite { .. } => "rewrite",
            RouteDecision::Redirect { .. } => "redirect",
            RouteDecision::PassThrough { .. } => "pass_through",
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            RouteDecision::PassThrough { reason } => reason.as_str(),
            _ => "",
        }
    }
}

/// Decision engine shared by all requests.
#[derive(Debug, Clone)]
pub struct RouteCloak {
    classifier: Classifier,
}

impl RouteCloak {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Build from validated configuration and a resolved key.
    pub fn from_config(config: &CloakConfig, key: SecretKey) -> Self {
        let codec = PathCodec::new(key);
        Self::new(Classifier::new(
            codec,
            config.reserved_segments.iter().cloned(),
            config.obfuscated_routes.iter().cloned(),
        ))
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Decide how to treat a request for `path` (and optional raw `query`).
    pub fn decide(&self, path: &str, query: Option<&str>, marker_present: bool) -> RouteDecision {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let Some(first) = segments.first() else {
            return RouteDecision::PassThrough { reason: PassReason::TooShort };
        };

        // Transition A: decode and rewrite.
        if let Classification::Token { decoded } = self.classifier.classify(first) {
            let plain: Vec<&str> = decoded
                .split('/')
                .filter(|s| !s.is_empty())
                .chain(segments[1..].iter().copied())
                .collect();
            if !plain.iter().all(|s| is_plain_segment(s)) {
                tracing::debug!(segment = %first, "Token decodes to a structured path, serving as requested");
                return RouteDecision::PassThrough { reason: PassReason::FailOpen };
            }
            return RouteDecision::Rewrite {
                path_and_query: build_path(plain.into_iter(), query),
            };
        }

        // Transition C guards.
        if marker_present {
            return RouteDecision::PassThrough { reason: PassReason::MarkerPresent };
        }
        if segments.len() < 2 {
            return RouteDecision::PassThrough { reason: PassReason::TooShort };
        }
        if self.classifier.is_reserved(first) {
            return RouteDecision::PassThrough { reason: PassReason::ReservedSegment };
        }
        if !self.classifier.is_obfuscated_route(first) {
            return RouteDecision::PassThrough { reason: PassReason::NotObfuscated };
        }

        // Transition B: encode and redirect.
        let prefix = format!("{}/{}", segments[0], segments[1]);
        let token = self.classifier.codec().encode(&prefix);
        if token.is_empty() {
            return RouteDecision::PassThrough { reason: PassReason::FailOpen };
        }

        let obfuscated = std::iter::once(token.as_str()).chain(segments[2..].iter().copied());
        RouteDecision::Redirect {
            location: build_path(obfuscated, query),
        }
    }
}

/// RFC 3986 `pchar` only, and not a (possibly percent-encoded) dot segment.
fn is_plain_segment(segment: &str) -> bool {
    let valid = segment
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b"-._~!$&'()*+,;=:@%".contains(&b));
    if !valid {
        return false;
    }
    let unescaped = segment.replace("%2e", ".").replace("%2E", ".");
    unescaped != "." && unescaped != ".."
}

fn build_path<'a>(segments: impl Iterator<Item = &'a str>, query: Option<&str>) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        out.push('?');
        out.push_str(q);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscation::{KeySource, PathCodec, SecretKey, FALLBACK_KEY};

    fn cloak() -> RouteCloak {
        let codec = PathCodec::new(SecretKey::new(FALLBACK_KEY, KeySource::Configured).unwrap());
        RouteCloak::new(Classifier::new(
            codec,
            ["_next", "api", "images", "auth"],
            ["publisher", "commenter", "wallet"],
        ))
    }

    fn token(cloak: &RouteCloak, prefix: &str) -> String {
        cloak.classifier().codec().encode(prefix)
    }

    #[test]
    fn test_plain_path_redirects() {
        let cloak = cloak();
        let t = token(&cloak, "publisher/dashboard");
        assert_eq!(
            cloak.decide("/publisher/dashboard", None, false),
            RouteDecision::Redirect { location: format!("/{t}") }
        );
    }

    #[test]
    fn test_redirect_keeps_rest_and_query() {
        let cloak = cloak();
        let t = token(&cloak, "publisher/tasks");
        assert_eq!(
            cloak.decide("/publisher/tasks/42/edit", Some("tab=OverView"), false),
            RouteDecision::Redirect { location: format!("/{t}/42/edit?tab=OverView") }
        );
    }

    #[test]
    fn test_token_rewrites() {
        let cloak = cloak();
        let t = token(&cloak, "publisher/dashboard");
        assert_eq!(
            cloak.decide(&format!("/{t}"), Some("tab=OverView"), false),
            RouteDecision::Rewrite { path_and_query: "/publisher/dashboard?tab=OverView".into() }
        );
    }

    #[test]
    fn test_token_with_rest_rewrites() {
        let cloak = cloak();
        let t = token(&cloak, "wallet/history");
        assert_eq!(
            cloak.decide(&format!("/{t}/2024/"), None, false),
            RouteDecision::Rewrite { path_and_query: "/wallet/history/2024".into() }
        );
    }

    #[test]
    fn test_token_rewrites_even_with_marker() {
        let cloak = cloak();
        let t = token(&cloak, "publisher/dashboard");
        assert!(matches!(
            cloak.decide(&format!("/{t}"), None, true),
            RouteDecision::Rewrite { .. }
        ));
    }

    #[test]
    fn test_marker_prevents_redirect() {
        let cloak = cloak();
        assert_eq!(
            cloak.decide("/publisher/dashboard", None, true),
            RouteDecision::PassThrough { reason: PassReason::MarkerPresent }
        );
    }

    #[test]
    fn test_short_paths_pass() {
        let cloak = cloak();
        assert_eq!(cloak.decide("/", None, false), RouteDecision::PassThrough { reason: PassReason::TooShort });
        assert_eq!(cloak.decide("", None, false), RouteDecision::PassThrough { reason: PassReason::TooShort });
        assert_eq!(
            cloak.decide("/publisher", None, false),
            RouteDecision::PassThrough { reason: PassReason::TooShort }
        );
    }

    #[test]
    fn test_reserved_and_unknown_pass() {
        let cloak = cloak();
        assert_eq!(
            cloak.decide("/auth/login", None, false),
            RouteDecision::PassThrough { reason: PassReason::ReservedSegment }
        );
        assert_eq!(
            cloak.decide("/about/team", None, false),
            RouteDecision::PassThrough { reason: PassReason::NotObfuscated }
        );
    }

    #[test]
    fn test_redirect_then_follow_up_does_not_redirect() {
        let cloak = cloak();
        let RouteDecision::Redirect { location } = cloak.decide("/commenter/tasks", None, false) else {
            panic!("expected redirect");
        };
        let follow_up = cloak.decide(&location, None, true);
        assert!(!matches!(follow_up, RouteDecision::Redirect { .. }));
        assert_eq!(
            follow_up,
            RouteDecision::Rewrite { path_and_query: "/commenter/tasks".into() }
        );
    }

    #[test]
    fn test_empty_query_dropped() {
        let cloak = cloak();
        let t = token(&cloak, "wallet/deposit");
        assert_eq!(
            cloak.decide("/wallet/deposit", Some(""), false),
            RouteDecision::Redirect { location: format!("/{t}") }
        );
    }

    #[test]
    fn test_from_default_config() {
        let key = SecretKey::new(FALLBACK_KEY, KeySource::Configured).unwrap();
        let cloak = RouteCloak::from_config(&CloakConfig::default(), key);
        assert!(cloak.classifier().is_obfuscated_route("accountrental"));
        assert!(cloak.classifier().is_reserved("_next"));
        assert!(matches!(
            cloak.decide("/accountrental/market", None, false),
            RouteDecision::Redirect { .. }
        ));
    }

    #[test]
    fn test_structured_token_fails_open() {
        let cloak = cloak();
        for crafted in [
            "publisher/x?admin=1",
            "publisher/x#frag",
            "publisher/../api/secret",
            "publisher/./dashboard",
            "publisher/%2e%2E/api",
            "publisher/a b",
            "publisher/caf\u{e9}",
            "publisher/x\\y",
        ] {
            let t = token(&cloak, crafted);
            assert!(cloak.classifier().is_encoded(&t), "{crafted}");
            assert_eq!(
                cloak.decide(&format!("/{t}/rest"), Some("tab=OverView"), false),
                RouteDecision::PassThrough { reason: PassReason::FailOpen },
                "{crafted}"
            );
        }
    }

    #[test]
    fn test_dot_segment_after_token_fails_open() {
        let cloak = cloak();
        let t = token(&cloak, "publisher/dashboard");
        assert_eq!(
            cloak.decide(&format!("/{t}/../../api"), None, false),
            RouteDecision::PassThrough { reason: PassReason::FailOpen }
        );
    }

    #[test]
    fn test_percent_encoded_segment_rewrites() {
        let cloak = cloak();
        let RouteDecision::Redirect { location } = cloak.decide("/publisher/caf%C3%A9", None, false) else {
            panic!("expected redirect");
        };
        assert_eq!(
            cloak.decide(&location, None, true),
            RouteDecision::Rewrite { path_and_query: "/publisher/caf%C3%A9".into() }
        );
    }

    #[test]
    fn test_plain_segment_rules() {
        assert!(is_plain_segment("dashboard"));
        assert!(is_plain_segment("a-b_c.d~e"));
        assert!(is_plain_segment("%2e%2e%2e"));
        assert!(is_plain_segment("..."));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("%2E"));
        assert!(!is_plain_segment("x?y"));
        assert!(!is_plain_segment("x#y"));
        assert!(!is_plain_segment("x y"));
    }

    #[test]
    fn test_labels() {
        let decision = RouteDecision::PassThrough { reason: PassReason::MarkerPresent };
        assert_eq!(decision.outcome(), "pass_through");
        assert_eq!(decision.reason(), "marker_present");
    }
}

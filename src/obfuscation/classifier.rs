//! Token detection heuristic.
//!
//! # Responsibilities
//! - Decide whether a single path segment is one of our tokens
//! - Reject reserved names and anything outside the URL-safe alphabet early
//! - Validate decoded content against the set of obfuscated routes
//!
//! # Design Decisions
//! - `decode` never reports a wrong key, so success alone proves nothing;
//!   the decoded first component must name a known obfuscated route
//! - Three outcomes internally, boolean externally: `Ambiguous` is
//!   treated as plain by every caller

use std::collections::HashSet;

use super::codec::PathCodec;

/// Outcome of classifying one path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Reserved name or impossible token alphabet. Never a token.
    Plain,
    /// Decodes to a path whose first component is an obfuscated route.
    Token { decoded: String },
    /// Token-shaped but undecodable, or decodes to an unknown route.
    Ambiguous,
}

impl Classification {
    pub fn is_token(&self) -> bool {
        matches!(self, Classification::Token { .. })
    }
}

/// Classifies path segments as plain names or obfuscated tokens.
#[derive(Debug, Clone)]
pub struct Classifier {
    codec: PathCodec,
    reserved: HashSet<String>,
    obfuscated: HashSet<String>,
}

impl Classifier {
    pub fn new<R, O>(codec: PathCodec, reserved: R, obfuscated: O) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            codec,
            reserved: reserved.into_iter().map(Into::into).collect(),
            obfuscated: obfuscated.into_iter().map(Into::into).collect(),
        }
    }

    pub fn codec(&self) -> &PathCodec {
        &self.codec
    }

    /// True if `segment` is a reserved name that is never obfuscated.
    pub fn is_reserved(&self, segment: &str) -> bool {
        self.reserved.contains(segment)
    }

    /// True if paths starting with `segment` get obfuscated.
    pub fn is_obfuscated_route(&self, segment: &str) -> bool {
        self.obfuscated.contains(segment)
    }

    /// Classify a single path segment. First matching rule wins.
    pub fn classify(&self, segment: &str) -> Classification {
        if self.is_reserved(segment) {
            return Classification::Plain;
        }

        if !is_token_alphabet(segment) {
            return Classification::Plain;
        }

        let decoded = match self.codec.decode(segment) {
            Ok(decoded) => decoded,
            Err(e) => {
                tracing::trace!(segment = %segment, error = %e, "Segment is not decodable");
                return Classification::Ambiguous;
            }
        };

        let head = decoded.split('/').find(|part| !part.is_empty());
        match head {
            Some(head) if self.is_obfuscated_route(head) => Classification::Token { decoded },
            _ => Classification::Ambiguous,
        }
    }

    /// Boolean view of [`Classifier::classify`].
    pub fn is_encoded(&self, segment: &str) -> bool {
        self.classify(segment).is_token()
    }
}

/// `^[A-Za-z0-9_-]+$`
fn is_token_alphabet(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obfuscation::key::{KeySource, SecretKey, FALLBACK_KEY};

    fn classifier() -> Classifier {
        let codec = PathCodec::new(SecretKey::new(FALLBACK_KEY, KeySource::Configured).unwrap());
        Classifier::new(
            codec,
            ["_next", "api", "images", "favicon.ico", "auth"],
            ["publisher", "commenter", "wallet"],
        )
    }

    #[test]
    fn test_generated_tokens_are_encoded() {
        let classifier = classifier();
        for prefix in ["publisher/dashboard", "commenter/tasks", "wallet/history"] {
            let token = classifier.codec().encode(prefix);
            assert_eq!(
                classifier.classify(&token),
                Classification::Token { decoded: prefix.to_string() }
            );
        }
    }

    #[test]
    fn test_reserved_names_are_plain() {
        let classifier = classifier();
        for name in ["_next", "api", "images", "favicon.ico", "auth"] {
            assert_eq!(classifier.classify(name), Classification::Plain);
            assert!(!classifier.is_encoded(name));
        }
    }

    #[test]
    fn test_bad_alphabet_is_plain() {
        let classifier = classifier();
        assert_eq!(classifier.classify(""), Classification::Plain);
        assert_eq!(classifier.classify("a+b"), Classification::Plain);
        assert_eq!(classifier.classify("abc="), Classification::Plain);
        assert_eq!(classifier.classify("page.html"), Classification::Plain);
    }

    #[test]
    fn test_plain_route_names_are_not_tokens() {
        let classifier = classifier();
        // Token-shaped but decode to garbage.
        for name in ["publisher", "dashboard", "wallet", "settings"] {
            assert!(!classifier.is_encoded(name), "{name} misclassified");
        }
    }

    #[test]
    fn test_unknown_route_is_ambiguous() {
        let classifier = classifier();
        let token = classifier.codec().encode("unknown/page");
        assert_eq!(classifier.classify(&token), Classification::Ambiguous);
    }

    #[test]
    fn test_undecodable_is_ambiguous() {
        let classifier = classifier();
        assert_eq!(classifier.classify("A"), Classification::Ambiguous);
    }

    #[test]
    fn test_foreign_key_token_rejected() {
        let classifier = classifier();
        let other = PathCodec::new(SecretKey::new("another-key", KeySource::Configured).unwrap());
        let token = other.encode("publisher/dashboard");
        assert!(!classifier.is_encoded(&token));
    }
}

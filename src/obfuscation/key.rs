//! Obfuscation key handling.

use std::fmt;
use thiserror::Error;

/// Literal used when no key is configured anywhere.
///
/// WARNING: anyone can read this value from the source. Startup warns when it
/// is used and refuses it outright in production.
pub const FALLBACK_KEY: &str = "your-secret-key-here-change-me-in-production";

/// Where the active key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Read from the key environment variable.
    Environment,
    /// Read from the configuration file.
    Configured,
    /// Passed explicitly on the command line.
    CommandLine,
    /// Hardcoded fallback literal.
    Fallback,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::Environment => write!(f, "environment"),
            KeySource::Configured => write!(f, "config"),
            KeySource::CommandLine => write!(f, "command-line"),
            KeySource::Fallback => write!(f, "fallback"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("obfuscation key must not be empty")]
    Empty,

    #[error("refusing to use the built-in fallback key in production; set {0}")]
    FallbackInProduction(String),
}

/// Shared secret used by both directions of the codec.
///
/// Immutable once built. `Debug` never prints the key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKey {
    bytes: Box<[u8]>,
    source: KeySource,
}

impl SecretKey {
    pub fn new(key: impl AsRef<[u8]>, source: KeySource) -> Result<Self, KeyError> {
        let bytes = key.as_ref();
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        Ok(Self {
            bytes: bytes.into(),
            source,
        })
    }

    /// The built-in fallback key.
    pub fn fallback() -> Self {
        Self {
            bytes: FALLBACK_KEY.as_bytes().into(),
            source: KeySource::Fallback,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn is_fallback(&self) -> bool {
        self.source == KeySource::Fallback
    }

    /// Key byte applied at `index`, repeating the key cyclically.
    #[inline]
    pub(crate) fn byte_at(&self, index: usize) -> u8 {
        self.bytes[index % self.bytes.len()]
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("len", &self.bytes.len())
            .field("source", &self.source)
            .finish()
    }
}

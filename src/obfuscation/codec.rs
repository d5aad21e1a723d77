//! Reversible path transform.
//!
//! # Wire Format
//! ```text
//! encode: utf8(path) XOR key[i % len] → base64 → '+'→'-', '/'→'_', strip '='
//! decode: '-'→'+', '_'→'/' → pad to 4 → base64 → XOR key[i % len] → utf8
//! ```
//!
//! A token decoded with the wrong key does not fail; it produces garbage.
//! Treat decoded text as untrusted input (see `classifier.rs`).

use std::sync::Arc;

use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use thiserror::Error;

use super::key::SecretKey;

/// Standard alphabet, canonical padding, tolerant of non-zero trailing bits.
const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical),
);

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Keyed encoder/decoder for path prefixes.
///
/// Cheap to clone; all clones share one key.
#[derive(Debug, Clone)]
pub struct PathCodec {
    key: Arc<SecretKey>,
}

impl PathCodec {
    pub fn new(key: SecretKey) -> Self {
        Self { key: Arc::new(key) }
    }

    pub fn key(&self) -> &SecretKey {
        &self.key
    }

    /// Encode a plaintext path into a URL-safe token.
    ///
    /// One leading `/` is ignored; callers re-add it when building a URL.
    /// The empty path encodes to the empty token.
    pub fn encode(&self, path: &str) -> String {
        let path = path.strip_prefix('/').unwrap_or(path);
        let mixed = self.xor(path.as_bytes());
        // URL_SAFE_NO_PAD is exactly the standard alphabet with '+'→'-',
        // '/'→'_' and the '=' padding dropped.
        URL_SAFE_NO_PAD.encode(mixed)
    }

    /// Decode a token back into its plaintext path.
    ///
    /// Fails only when the token is not Base64 at all. A well-formed token
    /// produced under a different key decodes to garbage without error.
    pub fn decode(&self, token: &str) -> Result<String, CodecError> {
        let mut standard: String = token
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                other => other,
            })
            .collect();
        while standard.len() % 4 != 0 {
            standard.push('=');
        }

        let mixed = LENIENT_STANDARD.decode(standard.as_bytes())?;
        let plain = self.xor(&mixed);
        Ok(String::from_utf8_lossy(&plain).into_owned())
    }

    fn xor(&self, input: &[u8]) -> Vec<u8> {
        input
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ self.key.byte_at(i))
            .collect()
    }
}

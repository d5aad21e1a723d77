//! Path obfuscation subsystem.
//!
//! # Data Flow
//! ```text
//! Plain prefix "publisher/dashboard"
//!     → codec.rs (XOR with cyclic key → Base64 → URL-safe, unpadded)
//!     → token "Bw4TCRkB..."
//!
//! Incoming segment
//!     → classifier.rs (reserved? charset? decodes to a known route?)
//!     → Plain | Token | Ambiguous
//! ```
//!
//! # Design Decisions
//! - This is obfuscation, not encryption. A repeating-key XOR is trivially
//!   reversible by anyone who knows the scheme; it only hides route names
//!   from casual inspection. Never use it to restrict access.
//! - The wire format (XOR + URL-safe Base64, no padding) is fixed so that
//!   already-distributed URLs keep working. Replacing it with real
//!   encryption is a breaking change.
//! - The key is loaded once at startup and never mutated; rotating it
//!   invalidates every outstanding token and requires a restart.

pub mod classifier;
pub mod codec;
pub mod key;

pub use classifier::{Classification, Classifier};
pub use codec::{CodecError, PathCodec};
pub use key::{KeyError, KeySource, SecretKey, FALLBACK_KEY};

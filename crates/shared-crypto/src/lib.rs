//! # Shared Crypto - Primitives for the Computation Module
//!
//! Everything the sealed channel needs from cryptography lives here, and only
//! the computation module links against it. The UI-facing side reaches these
//! primitives through the call bridge.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `symmetric` | XChaCha20-Poly1305 | Payload and vault encryption |
//! | `exchange` | X25519 | Per-query ephemeral key agreement |
//! | `signatures` | Ed25519 | Discovery trust anchor, signed queries |
//! | `kdf` | BLAKE3, Argon2id | Symmetric key derivation, password hashing |
//! | `encoding` | Base64 | Key import/export |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod errors;
pub mod exchange;
pub mod kdf;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use exchange::{ExchangePublicKey, ExchangeSecret, SharedSecret};
pub use signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{open, seal, Nonce, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

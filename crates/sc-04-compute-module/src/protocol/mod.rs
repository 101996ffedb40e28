//! # Channel Protocol
//!
//! Wire format, all modes:
//!
//! ```text
//! query:        MAGIC(4) | 'Q' | client ephemeral key(32) | nonce(24) | ciphertext | tag(16)
//! signed query: MAGIC(4) | 'S' | client ephemeral key(32) | nonce(24) | ciphertext | tag(16) | signature(64)
//! response:     MAGIC(4) | 'R' | nonce(24) | ciphertext | tag(16)
//! ```
//!
//! The ciphertext is XChaCha20-Poly1305 over a plaintext frame
//! `expires_at (u64 BE) | length (u32 BE) | payload | zero padding`, padded to
//! a multiple of 32 bytes. The key is derived from the X25519 shared secret
//! with the mode byte as domain, so a query reflected back to the client
//! cannot pass as a response. A signature covers a keyed hash of every byte
//! that precedes it.
//!
//! Every algorithm is fixed; changing one requires new magic bytes.

pub mod frame;
pub mod message;

pub use message::{
    open, open_at, pack_response, pack_response_at, pack_signed_query, pack_signed_query_at,
    pack_unsigned_query, pack_unsigned_query_at, unpack_query, unpack_query_at, unpack_response,
    unpack_response_at, Opened, PackedQuery, UnpackedQuery,
};

use crate::error::ModuleError;
use std::time::{SystemTime, UNIX_EPOCH};

/// Protocol version prefix.
pub const MAGIC: [u8; 4] = *b"SC\x00\x01";

/// Seconds a message stays acceptable after its embedded expiry.
pub const EXPIRY_TOLERANCE_SECS: u64 = 60;

/// Length of an Ed25519 signature trailer.
pub const SIGNATURE_LENGTH: usize = 64;

/// BLAKE3 context for message keys.
pub(crate) const KEY_CONTEXT: &str = "sealed-channel v1 message key";

/// BLAKE3 context for the digest a signed query signs.
pub(crate) const SIGNATURE_CONTEXT: &str = "sealed-channel v1 query signature";

/// Message mode byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Query = b'Q',
    Response = b'R',
    SignedQuery = b'S',
}

impl Mode {
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Whether messages of this mode carry the client's ephemeral key.
    pub fn carries_client_key(self) -> bool {
        matches!(self, Mode::Query | Mode::SignedQuery)
    }
}

impl TryFrom<u8> for Mode {
    type Error = ModuleError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            b'Q' => Ok(Mode::Query),
            b'R' => Ok(Mode::Response),
            b'S' => Ok(Mode::SignedQuery),
            other => Err(ModuleError::Malformed(format!(
                "unknown mode byte {other:#04x}"
            ))),
        }
    }
}

/// Current Unix time rounded up to whole seconds.
pub fn expiry_now() -> u64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    if elapsed.subsec_nanos() > 0 {
        elapsed.as_secs() + 1
    } else {
        elapsed.as_secs()
    }
}

/// Reject `expires_at` if `now` is past it by more than the tolerance.
pub(crate) fn check_expiry(expires_at: u64, now: u64) -> Result<(), ModuleError> {
    if now > expires_at.saturating_add(EXPIRY_TOLERANCE_SECS) {
        return Err(ModuleError::Expired { expires_at, now });
    }
    Ok(())
}

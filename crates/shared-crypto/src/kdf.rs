//! # Key Derivation
//!
//! - BLAKE3 in derive-key mode turns agreement secrets into symmetric keys
//! - BLAKE3 keyed/XOF hashing gives fixed-salt fingerprints of any length
//! - Argon2id stretches identifiers and passwords

use crate::symmetric::SecretKey;
use crate::CryptoError;
use argon2::{Algorithm, Argon2, Params, Version};

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Argon2Cost {
    /// Memory in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub lanes: u32,
}

impl Argon2Cost {
    /// Reference-implementation defaults, used for identifier hashing.
    pub const LIGHT: Self = Self {
        memory_kib: 4096,
        iterations: 3,
        lanes: 1,
    };

    /// Heavier memory cost for password-derived keys.
    pub const PASSWORD: Self = Self {
        memory_kib: 8192,
        iterations: 3,
        lanes: 1,
    };
}

/// Derive a 256-bit symmetric key from key material.
///
/// `context` must be a hardcoded, globally unique string; `domain` further
/// separates keys derived from the same material (e.g. a protocol mode byte).
pub fn derive_symmetric_key(context: &str, domain: &[u8], key_material: &[u8]) -> SecretKey {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(domain);
    hasher.update(key_material);
    SecretKey::from_bytes(*hasher.finalize().as_bytes())
}

/// Keyed hash of `data` stretched to `size` bytes.
///
/// The key is derived from `context`, so the output is only reproducible by
/// someone who knows the context string.
pub fn keyed_hash(context: &str, data: &[u8], size: usize) -> Vec<u8> {
    let key = blake3::derive_key(context, b"keyed-hash");
    let mut hasher = blake3::Hasher::new_keyed(&key);
    hasher.update(data);
    let mut output = vec![0u8; size];
    hasher.finalize_xof().fill(&mut output);
    output
}

/// Plain BLAKE3 over several inputs.
pub fn hash_many(inputs: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}

/// Argon2id over `secret` with `salt`, producing `output_len` bytes.
///
/// # Errors
///
/// Returns `CryptoError::KeyDerivationFailed` for invalid parameters
/// (salt shorter than 8 bytes, output shorter than 4 bytes, ...).
pub fn argon2id(
    secret: &[u8],
    salt: &[u8],
    cost: Argon2Cost,
    output_len: usize,
) -> Result<Vec<u8>, CryptoError> {
    let params = Params::new(
        cost.memory_kib,
        cost.iterations,
        cost.lanes,
        Some(output_len),
    )
    .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;

    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut output = vec![0u8; output_len];
    argon
        .hash_password_into(secret, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivationFailed(e.to_string()))?;
    Ok(output)
}

//! Deterministic derivations from identifiers and passwords.
//!
//! All of these are slow on purpose and are memoized on the UI side.

use crate::error::ModuleError;
use shared_crypto::encoding::encode_base64;
use shared_crypto::kdf::{argon2id, keyed_hash, Argon2Cost};
use sha1::{Digest, Sha1};
use shared_crypto::{Ed25519KeyPair, SecretKey};
use tracing::debug;
use zeroize::Zeroizing;

/// Application salt shared by every Argon2id derivation.
pub const SALT: &[u8] = b"sealed-channel-2.7182818284590452353602874713527";

/// Length of the identifier hash before encoding.
pub const IDENTIFIER_LENGTH: usize = 48;

/// Largest password check hash, in bytes.
pub const MAX_CHECK_HASH_LENGTH: usize = 64;

const RECORD_SEPARATOR: u8 = 0x1E;
const PASSWORD_KEY_LENGTH: usize = 32;
const CHECK_HASH_CONTEXT: &str = "sealed-channel v1 password check";

/// Which key a password derivation produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPurpose {
    Vault,
    Access,
}

impl KeyPurpose {
    fn label(self) -> &'static str {
        match self {
            KeyPurpose::Vault => "vault_key",
            KeyPurpose::Access => "access_key",
        }
    }
}

/// Stable, non-reversible form of a user identifier (base64).
pub fn identifier(input: &str) -> Result<String, ModuleError> {
    let hash = argon2id(input.as_bytes(), SALT, Argon2Cost::LIGHT, IDENTIFIER_LENGTH)
        .map_err(|e| ModuleError::Derivation(e.to_string()))?;
    Ok(encode_base64(&hash))
}

fn password_key(
    identifier: &str,
    password: &str,
    purpose: KeyPurpose,
) -> Result<Zeroizing<Vec<u8>>, ModuleError> {
    if identifier.is_empty() {
        return Err(ModuleError::InvalidArgument("empty identifier".into()));
    }

    let mut salt = Vec::with_capacity(identifier.len() + SALT.len() + 16);
    salt.extend_from_slice(identifier.as_bytes());
    salt.push(RECORD_SEPARATOR);
    salt.extend_from_slice(SALT);
    salt.push(RECORD_SEPARATOR);
    salt.extend_from_slice(purpose.label().as_bytes());

    debug!(purpose = purpose.label(), "deriving password key");
    argon2id(password.as_bytes(), &salt, Argon2Cost::PASSWORD, PASSWORD_KEY_LENGTH)
        .map(Zeroizing::new)
        .map_err(|e| ModuleError::Derivation(e.to_string()))
}

/// Symmetric key for the user's vault.
pub fn vault_key(identifier: &str, password: &str) -> Result<SecretKey, ModuleError> {
    let key = password_key(identifier, password, KeyPurpose::Vault)?;
    Ok(SecretKey::from_slice(&key)?)
}

/// Signing key that authenticates the user's queries.
pub fn access_key(identifier: &str, password: &str) -> Result<Ed25519KeyPair, ModuleError> {
    let seed = password_key(identifier, password, KeyPurpose::Access)?;
    Ok(Ed25519KeyPair::from_seed_slice(&seed)?)
}

/// Hex hash of a password of `size` bytes, safe to send to the server.
///
/// The keyed hash runs over the SHA-1 digest of the password, the form
/// breached-password datasets are published in, so the server can compare
/// against those datasets hashed the same way.
pub fn password_check_hash(password: &str, size: usize) -> Result<String, ModuleError> {
    if size == 0 || size > MAX_CHECK_HASH_LENGTH {
        return Err(ModuleError::InvalidArgument(format!(
            "check hash size {size} outside 1..={MAX_CHECK_HASH_LENGTH}"
        )));
    }
    let mut digest = Zeroizing::new([0u8; 20]);
    digest.copy_from_slice(&Sha1::digest(password.as_bytes()));
    Ok(hex::encode(keyed_hash(CHECK_HASH_CONTEXT, digest.as_slice(), size)))
}

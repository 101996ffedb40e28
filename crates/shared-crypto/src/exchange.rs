//! # X25519 Key Agreement
//!
//! Static secrets back long-lived server keys and client exchange keys; every
//! query uses a fresh secret generated for that query alone.

use crate::encoding::{decode_base64, encode_base64};
use crate::CryptoError;
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// Length of public keys, secrets and shared secrets in bytes.
pub const KEY_LENGTH: usize = 32;

/// X25519 public key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExchangePublicKey(x25519_dalek::PublicKey);

impl ExchangePublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(x25519_dalek::PublicKey::from(bytes))
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self::from_bytes(array))
    }

    /// Parse a base64 encoded key.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        Self::from_slice(&decode_base64(encoded)?)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        self.0.as_bytes()
    }

    /// Base64 encoding of the key.
    pub fn to_base64(&self) -> String {
        encode_base64(self.as_bytes())
    }
}

/// X25519 secret.
pub struct ExchangeSecret(x25519_dalek::StaticSecret);

impl ExchangeSecret {
    /// Generate a secret from the given RNG.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(x25519_dalek::StaticSecret::random_from_rng(rng))
    }

    /// Generate a secret from the thread-local CSPRNG.
    pub fn random() -> Self {
        Self::generate(&mut rand::thread_rng())
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(x25519_dalek::StaticSecret::from(bytes))
    }

    /// Parse a base64 encoded secret.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = decode_base64(encoded)?;
        let array: Result<[u8; KEY_LENGTH], _> = bytes.as_slice().try_into();
        let length = bytes.len();
        bytes.zeroize();
        array
            .map(Self::from_bytes)
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: KEY_LENGTH,
                actual: length,
            })
    }

    /// Base64 encoding of the secret.
    pub fn to_base64(&self) -> String {
        let mut bytes = self.0.to_bytes();
        let encoded = encode_base64(&bytes);
        bytes.zeroize();
        encoded
    }

    /// Public key matching this secret.
    pub fn public_key(&self) -> ExchangePublicKey {
        ExchangePublicKey(x25519_dalek::PublicKey::from(&self.0))
    }

    /// Perform the key agreement with a peer public key.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::NonContributory` when the peer key is of low
    /// order and the result would be predictable.
    pub fn agree(&self, peer: &ExchangePublicKey) -> Result<SharedSecret, CryptoError> {
        let shared = self.0.diffie_hellman(&peer.0);
        if !shared.was_contributory() {
            return Err(CryptoError::NonContributory);
        }
        Ok(SharedSecret(*shared.as_bytes()))
    }
}

/// Result of a key agreement.
#[derive(Clone, Zeroize, PartialEq, Eq)]
#[zeroize(drop)]
pub struct SharedSecret([u8; KEY_LENGTH]);

impl SharedSecret {
    /// Rebuild a shared secret handed back by a caller.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; KEY_LENGTH] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LENGTH,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

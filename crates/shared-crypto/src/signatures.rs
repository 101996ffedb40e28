//! # Ed25519 Signatures
//!
//! Used twice in the channel: the trust anchor signs the server's exchange key,
//! and clients holding an access key sign their queries.

use crate::encoding::{decode_base64, encode_base64};
use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        // Validate it's a valid point
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Parse a base64 encoded key.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = decode_base64(encoded)?;
        let array: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey)?;
        Self::from_bytes(array)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Base64 encoding of the key.
    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }

    /// Verify a signature (strict: rejects small-order keys and malleable
    /// encodings).
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking the length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(array))
    }

    /// Parse a base64 encoded signature.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = decode_base64(encoded).map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Self::from_slice(&bytes)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Base64 encoding of the signature.
    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        Self::generate_from(&mut rand::thread_rng())
    }

    /// Generate a keypair from the given RNG.
    pub fn generate_from<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let signing_key = SigningKey::generate(rng);
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Create from a seed slice, checking the length.
    pub fn from_seed_slice(seed: &[u8]) -> Result<Self, CryptoError> {
        let mut array: [u8; 32] = seed.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: seed.len(),
        })?;
        let keypair = Self::from_seed(array);
        array.zeroize();
        Ok(keypair)
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        let verifying_key = self.signing_key.verifying_key();
        Ed25519PublicKey(verifying_key.to_bytes())
    }

    /// Sign a message (deterministic - no RNG needed).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        let sig = self.signing_key.sign(message);
        Ed25519Signature(sig.to_bytes())
    }

    /// Get secret seed (for serialization).
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Base64 encoding of the secret seed.
    pub fn to_base64(&self) -> String {
        let mut seed = self.to_seed();
        let encoded = encode_base64(&seed);
        seed.zeroize();
        encoded
    }

    /// Parse a base64 encoded secret seed.
    pub fn from_base64(encoded: &str) -> Result<Self, CryptoError> {
        let mut bytes = decode_base64(encoded)?;
        let keypair = Self::from_seed_slice(&bytes);
        bytes.zeroize();
        keypair
    }
}

impl Clone for Ed25519KeyPair {
    fn clone(&self) -> Self {
        Self {
            signing_key: self.signing_key.clone(),
        }
    }
}

//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Authentication tag did not verify (tampering or wrong key)
    #[error("Decryption failed: authentication tag mismatch")]
    DecryptionFailed,

    /// Ciphertext shorter than nonce + tag
    #[error("Ciphertext too short: {actual} bytes, need at least {minimum}")]
    CiphertextTooShort {
        /// Minimum length in bytes
        minimum: usize,
        /// Actual length in bytes
        actual: usize,
    },

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Key agreement produced an all-zero secret (low-order peer key)
    #[error("Key agreement is not contributory")]
    NonContributory,

    /// Key derivation failed
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    /// Base64 decoding failed
    #[error("Invalid base64 encoding: {0}")]
    InvalidEncoding(String),
}

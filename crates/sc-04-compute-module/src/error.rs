//! Computation module errors.

use sc_02_call_bridge::{BridgeFault, FaultKind};
use shared_crypto::CryptoError;
use thiserror::Error;

/// Errors raised inside the computation module.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModuleError {
    /// The server key signature does not verify against the trust anchor.
    #[error("server key is not signed by the trust anchor")]
    UntrustedServerKey,

    /// Authenticated decryption failed.
    #[error("message failed authentication")]
    Unauthenticated,

    /// The embedded expiry is too far in the past.
    #[error("message expired at {expires_at}, now {now}")]
    Expired { expires_at: u64, now: u64 },

    /// The message is not in the wire format.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// The message has another mode than the operation expects.
    #[error("unexpected message mode {found:#04x}, expected {expected:#04x}")]
    WrongMode { expected: u8, found: u8 },

    /// The entropy pool handed in is too small.
    #[error("not enough entropy: {actual} bytes, need {required}")]
    NotEnoughEntropy { required: usize, actual: usize },

    /// Key derivation failed.
    #[error("derivation failed: {0}")]
    Derivation(String),

    /// Sealed vault could not be opened.
    #[error("invalid vault")]
    InvalidVault,

    /// Argument rejected by the module.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Lower-level cryptographic failure.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<ModuleError> for BridgeFault {
    fn from(err: ModuleError) -> Self {
        let kind = match &err {
            ModuleError::UntrustedServerKey => FaultKind::Trust,
            ModuleError::Unauthenticated
            | ModuleError::Malformed(_)
            | ModuleError::WrongMode { .. }
            | ModuleError::Crypto(CryptoError::DecryptionFailed)
            | ModuleError::Crypto(CryptoError::CiphertextTooShort { .. }) => FaultKind::Decryption,
            ModuleError::Expired { .. } => FaultKind::Expired,
            ModuleError::Derivation(_) | ModuleError::Crypto(CryptoError::KeyDerivationFailed(_)) => {
                FaultKind::Derivation
            }
            ModuleError::NotEnoughEntropy { .. }
            | ModuleError::InvalidArgument(_)
            | ModuleError::Crypto(CryptoError::InvalidEncoding(_))
            | ModuleError::Crypto(CryptoError::InvalidKeyLength { .. })
            | ModuleError::Crypto(CryptoError::InvalidPublicKey)
            | ModuleError::Crypto(CryptoError::InvalidSignatureFormat) => {
                FaultKind::InvalidArgument
            }
            ModuleError::InvalidVault | ModuleError::Crypto(_) => FaultKind::Internal,
        };
        BridgeFault::new(kind, err.to_string())
    }
}

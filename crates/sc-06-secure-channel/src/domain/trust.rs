//! The trust anchor that signs server keys.

use crate::domain::errors::ChannelError;
use shared_crypto::Ed25519PublicKey;

/// Anchor baked in at build time through `SC_TRUST_ANCHOR`.
const COMPILED_ANCHOR: Option<&str> = option_env!("SC_TRUST_ANCHOR");

/// Ed25519 public key every server key must be signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrustAnchor(Ed25519PublicKey);

impl TrustAnchor {
    pub fn new(key: Ed25519PublicKey) -> Self {
        Self(key)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, ChannelError> {
        Ed25519PublicKey::from_base64(encoded)
            .map(Self)
            .map_err(|e| ChannelError::Trust(format!("invalid trust anchor: {e}")))
    }

    /// The anchor compiled into this build, if any.
    pub fn compiled() -> Option<Result<Self, ChannelError>> {
        COMPILED_ANCHOR.map(Self::from_base64)
    }

    pub fn key(&self) -> &Ed25519PublicKey {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        self.0.to_base64()
    }
}

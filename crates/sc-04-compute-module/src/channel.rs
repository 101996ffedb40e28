//! A verified server key, the only state a channel needs.

use crate::error::ModuleError;
use crate::protocol::{self, PackedQuery};
use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, ExchangePublicKey};
use tracing::{info, warn};

/// Channel to one server, created only from a key signed by the trust anchor.
#[derive(Debug, Clone)]
pub struct Channel {
    server_key: ExchangePublicKey,
}

impl Channel {
    /// Verify `signature` over the server key with `anchor`.
    ///
    /// Both key and signature arrive base64-encoded from discovery. A
    /// signature that cannot be decoded is as untrusted as one that does not
    /// verify.
    pub fn from_signed_key(
        public_key: &str,
        signature: &str,
        anchor: &Ed25519PublicKey,
    ) -> Result<Self, ModuleError> {
        let server_key = ExchangePublicKey::from_base64(public_key)?;
        let signature =
            Ed25519Signature::from_base64(signature).map_err(|_| ModuleError::UntrustedServerKey)?;

        if anchor.verify(server_key.as_bytes(), &signature).is_err() {
            warn!(server_key = %public_key, "server key signature rejected");
            return Err(ModuleError::UntrustedServerKey);
        }

        info!(server_key = %public_key, "server key verified");
        Ok(Self { server_key })
    }

    pub fn server_key(&self) -> &ExchangePublicKey {
        &self.server_key
    }

    pub fn pack_unsigned_query(&self, payload: &[u8]) -> Result<PackedQuery, ModuleError> {
        protocol::pack_unsigned_query(payload, &self.server_key)
    }

    pub fn pack_signed_query(
        &self,
        payload: &[u8],
        signer: &Ed25519KeyPair,
    ) -> Result<PackedQuery, ModuleError> {
        protocol::pack_signed_query(payload, &self.server_key, signer)
    }
}

//! Uncached derivation calls.

use crate::error::DerivationError;
use crate::ModuleHandle;
use sc_02_call_bridge::{Bridge, CallRequest};
use sc_04_compute_module::ClassTag;

/// Each method is exactly one bridge call.
#[derive(Debug, Clone)]
pub struct Derivations {
    bridge: Bridge<ClassTag>,
}

impl Derivations {
    pub fn new(bridge: Bridge<ClassTag>) -> Self {
        Self { bridge }
    }

    pub fn bridge(&self) -> &Bridge<ClassTag> {
        &self.bridge
    }

    /// Hashed user identifier, base64.
    pub async fn identifier(&self, input: &str) -> Result<String, DerivationError> {
        let result = self
            .bridge
            .call(CallRequest::function("identifier").arg(input))
            .await?;
        Ok(result.into_string()?)
    }

    /// Hex password hash of `size` bytes.
    pub async fn password_check_hash(
        &self,
        password: &str,
        size: u32,
    ) -> Result<String, DerivationError> {
        let result = self
            .bridge
            .call(
                CallRequest::function("password_check_hash")
                    .arg(password)
                    .arg(size),
            )
            .await?;
        Ok(result.into_string()?)
    }

    /// Public half of the password-derived access key, base64.
    pub async fn access_public_key(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<String, DerivationError> {
        let result = self
            .bridge
            .call(
                CallRequest::function("access_public_key")
                    .arg(identifier)
                    .arg(password),
            )
            .await?;
        Ok(result.into_string()?)
    }

    /// Password-derived vault key, kept in the computation module.
    pub async fn vault_key(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<ModuleHandle, DerivationError> {
        let result = self
            .bridge
            .call(
                CallRequest::function("derive")
                    .static_on(ClassTag::VaultKey)
                    .arg(identifier)
                    .arg(password)
                    .returns(ClassTag::VaultKey),
            )
            .await?;
        Ok(result.into_handle()?)
    }
}

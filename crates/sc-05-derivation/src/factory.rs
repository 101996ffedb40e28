//! Key generation seeded from the process entropy pool.

use crate::error::DerivationError;
use crate::ModuleHandle;
use sc_02_call_bridge::{Bridge, CallRequest, SharedBuffer};
use sc_03_entropy::EntropyCollector;
use sc_04_compute_module::ClassTag;
use std::sync::Arc;
use tracing::{debug, warn};

/// Creates keys inside the computation module.
#[derive(Clone)]
pub struct KeyFactory {
    bridge: Bridge<ClassTag>,
    entropy: Arc<EntropyCollector>,
}

impl KeyFactory {
    pub fn new(bridge: Bridge<ClassTag>, entropy: Arc<EntropyCollector>) -> Self {
        Self { bridge, entropy }
    }

    pub fn bridge(&self) -> &Bridge<ClassTag> {
        &self.bridge
    }

    /// A generator seeded from a snapshot of the entropy pool.
    ///
    /// The snapshot is moved to the module, not copied.
    pub async fn make_rng(&self) -> Result<ModuleHandle, DerivationError> {
        self.entropy.ping();
        let pool = SharedBuffer::new(self.entropy.export());
        let result = self
            .bridge
            .call(
                CallRequest::function("from_entropy")
                    .static_on(ClassTag::Rng)
                    .transfer(pool)
                    .returns(ClassTag::Rng),
            )
            .await;
        self.entropy.ping();
        Ok(result?.into_handle()?)
    }

    /// A fresh X25519 key pair.
    pub async fn generate_exchange_key(&self) -> Result<ModuleHandle, DerivationError> {
        self.generate(ClassTag::ExchangeKey).await
    }

    /// A fresh Ed25519 signing key.
    pub async fn generate_access_key(&self) -> Result<ModuleHandle, DerivationError> {
        self.generate(ClassTag::AccessKey).await
    }

    /// The signing key derived from an identifier and password.
    pub async fn derive_access_key(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<ModuleHandle, DerivationError> {
        let result = self
            .bridge
            .call(
                CallRequest::function("derive")
                    .static_on(ClassTag::AccessKey)
                    .arg(identifier)
                    .arg(password)
                    .returns(ClassTag::AccessKey),
            )
            .await?;
        Ok(result.into_handle()?)
    }

    async fn generate(&self, class: ClassTag) -> Result<ModuleHandle, DerivationError> {
        let rng = self.make_rng().await?;
        let result = self
            .bridge
            .call(
                CallRequest::function("generate")
                    .static_on(class)
                    .handle(&rng)
                    .returns(class),
            )
            .await;

        if let Err(e) = rng.release().await {
            warn!(error = %e, "Failed to release generator");
        }
        self.entropy.ping();

        let key = result?.into_handle()?;
        debug!(class = %class, "Key generated");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use sc_02_call_bridge::FaultKind;
    use sc_03_entropy::EntropyCollector;
    use std::collections::HashSet;

    fn factory() -> KeyFactory {
        KeyFactory::new(
            sc_04_compute_module::spawn(8).unwrap(),
            Arc::new(EntropyCollector::default()),
        )
    }

    async fn public_key(key: &ModuleHandle) -> String {
        key.call(key.method("public_key"))
            .await
            .unwrap()
            .into_string()
            .unwrap()
    }

    #[tokio::test]
    async fn test_make_rng_feeds_pool() {
        let factory = factory();
        let before = factory.entropy.samples();
        let rng = factory.make_rng().await.unwrap();
        assert_eq!(rng.class(), ClassTag::Rng);
        assert!(factory.entropy.samples() > before);
        rng.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_generated_keys_differ() {
        let factory = factory();
        let keys = join_all((0..4).map(|_| factory.generate_exchange_key())).await;
        let mut seen = HashSet::new();
        for key in keys {
            let key = key.unwrap();
            assert_eq!(key.class(), ClassTag::ExchangeKey);
            assert!(seen.insert(public_key(&key).await));
        }
    }

    #[tokio::test]
    async fn test_generator_released_after_use() {
        let factory = factory();
        let key = factory.generate_access_key().await.unwrap();
        assert_eq!(key.class(), ClassTag::AccessKey);
        // make_rng, generate, free
        let registered = factory
            .bridge
            .stats()
            .total_registered
            .load(std::sync::atomic::Ordering::Relaxed);
        assert_eq!(registered, 3);
    }

    #[tokio::test]
    async fn test_small_pool_rejected() {
        let factory = KeyFactory::new(
            sc_04_compute_module::spawn(8).unwrap(),
            Arc::new(EntropyCollector::new(16).unwrap()),
        );
        let err = factory.make_rng().await.unwrap_err();
        match err {
            DerivationError::Bridge(e) => {
                assert_eq!(e.fault_kind(), Some(FaultKind::InvalidArgument))
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_derive_access_key_is_deterministic() {
        let factory = factory();
        let a = factory.derive_access_key("aWQ=", "pw").await.unwrap();
        let b = factory.derive_access_key("aWQ=", "pw").await.unwrap();
        assert_eq!(public_key(&a).await, public_key(&b).await);
    }
}

//! Derivation cache.

use crate::derivations::Derivations;
use crate::error::DerivationError;
use crate::memo::{CacheKey, Memo};
use crate::ModuleHandle;
use sc_02_call_bridge::Bridge;
use sc_04_compute_module::ClassTag;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Memoized [`Derivations`].
///
/// Vault keys are cached as shared handles and are never released while the
/// cache lives.
pub struct DerivationCache {
    derivations: Derivations,
    strings: Memo<String>,
    keys: Memo<Arc<ModuleHandle>>,
}

impl DerivationCache {
    pub fn new(bridge: Bridge<ClassTag>) -> Self {
        Self {
            derivations: Derivations::new(bridge),
            strings: Memo::new(),
            keys: Memo::new(),
        }
    }

    /// Memoize any string-valued computation under `function` and `args`.
    pub async fn memoized<F, Fut>(
        &self,
        function: &str,
        args: &[Value],
        compute: F,
    ) -> Result<String, DerivationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, DerivationError>>,
    {
        self.strings
            .get_or_compute(CacheKey::new(function, args)?, compute)
            .await
    }

    /// The uncached calls, for callers that must not hit the cache.
    pub fn bypass(&self) -> &Derivations {
        &self.derivations
    }

    pub async fn identifier(&self, input: &str) -> Result<String, DerivationError> {
        self.memoized("identifier", &[json!(input)], || {
            self.derivations.identifier(input)
        })
        .await
    }

    pub async fn password_check_hash(
        &self,
        password: &str,
        size: u32,
    ) -> Result<String, DerivationError> {
        self.memoized("password_check_hash", &[json!(password), json!(size)], || {
            self.derivations.password_check_hash(password, size)
        })
        .await
    }

    pub async fn access_public_key(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<String, DerivationError> {
        self.memoized(
            "access_public_key",
            &[json!(identifier), json!(password)],
            || self.derivations.access_public_key(identifier, password),
        )
        .await
    }

    pub async fn vault_key(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<Arc<ModuleHandle>, DerivationError> {
        let key = CacheKey::new("vault_key", &[json!(identifier), json!(password)])?;
        self.keys
            .get_or_compute(key, || async {
                self.derivations
                    .vault_key(identifier, password)
                    .await
                    .map(Arc::new)
            })
            .await
    }

    /// Values stored across every derivation.
    pub fn len(&self) -> usize {
        self.strings.len() + self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bridge calls started through the cache.
    pub fn dispatches(&self) -> u64 {
        self.strings.stats().dispatches.load(Ordering::Relaxed)
            + self.keys.stats().dispatches.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sc_02_call_bridge::FaultKind;
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    /// Formatted log output collected in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn cache() -> DerivationCache {
        DerivationCache::new(sc_04_compute_module::spawn(8).unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_identical_calls_dispatch_once() {
        let cache = cache();
        let (a, b) = tokio::join!(
            cache.identifier("alice@example.com"),
            cache.identifier("alice@example.com"),
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(cache.dispatches(), 1);
        let registered = cache.bypass().bridge().stats().total_registered.load(Ordering::Relaxed);
        assert_eq!(registered, 1);
    }

    #[tokio::test]
    async fn test_cached_matches_bypass() {
        let cache = cache();
        let cached = cache.password_check_hash("hunter2", 16).await.unwrap();
        let fresh = cache.bypass().password_check_hash("hunter2", 16).await.unwrap();
        assert_eq!(cached, fresh);
        assert_eq!(cached.len(), 32);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_call_not_cached() {
        let cache = cache();
        let err = cache.password_check_hash("pw", 0).await.unwrap_err();
        match err {
            DerivationError::Bridge(e) => assert_eq!(e.fault_kind(), Some(FaultKind::InvalidArgument)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_vault_key_shared() {
        let cache = cache();
        let id = cache.identifier("alice").await.unwrap();
        let first = cache.vault_key(&id, "pw").await.unwrap();
        let second = cache.vault_key(&id, "pw").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.is_live());
    }

    #[tokio::test]
    async fn test_access_public_key() {
        let cache = cache();
        let id = cache.identifier("bob").await.unwrap();
        let a = cache.access_public_key(&id, "pw").await.unwrap();
        let b = cache.access_public_key(&id, "other").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.dispatches(), 3);
    }

    #[tokio::test]
    async fn test_passwords_never_logged() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let cache = cache();
        cache.password_check_hash("S3cretHunter2", 16).await.unwrap();
        cache.password_check_hash("S3cretHunter2", 16).await.unwrap();
        cache.password_check_hash("S3cretHunter2", 0).await.unwrap_err();
        let id = cache.identifier("alice").await.unwrap();
        cache.access_public_key(&id, "S3cretHunter2").await.unwrap();
        cache.vault_key(&id, "S3cretHunter2").await.unwrap();

        let text = logs.text();
        assert!(text.contains("Derivation cache miss"));
        assert!(text.contains("Derivation cache hit"));
        assert!(text.contains("Derivation failed"));
        assert!(text.contains("password_check_hash"));
        assert!(!text.contains("S3cretHunter2"));
    }
}

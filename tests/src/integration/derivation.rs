//! # Derivation Flows
//!
//! The derivation cache and key factory against the live computation module.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sc_02_call_bridge::CallRequest;
    use sc_03_entropy::EntropyCollector;
    use sc_04_compute_module::ClassTag;
    use sc_05_derivation::{DerivationCache, KeyFactory};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn cache() -> DerivationCache {
        DerivationCache::new(sc_04_compute_module::spawn(16).unwrap())
    }

    // =============================================================================
    // INTEGRATION TESTS: CACHE
    // =============================================================================

    /// Two identical calls in flight → one bridge dispatch, one value.
    #[tokio::test]
    async fn test_concurrent_identical_calls_dispatch_once() {
        let cache = cache();
        let bridge = cache.bypass().bridge().clone();

        let (a, b) = tokio::join!(cache.identifier("alice"), cache.identifier("alice"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(cache.dispatches(), 1);
        assert_eq!(
            bridge
                .stats()
                .total_registered
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );
    }

    /// Many waiters on many keys: one dispatch per distinct key.
    #[tokio::test]
    async fn test_fan_in_over_distinct_keys() {
        let cache = cache();
        let names = ["alice", "bob", "alice", "carol", "bob", "alice"];

        let results =
            futures::future::join_all(names.iter().map(|name| cache.identifier(name))).await;
        let results: Vec<String> = results.into_iter().map(Result::unwrap).collect();

        assert_eq!(results[0], results[2]);
        assert_eq!(results[0], results[5]);
        assert_eq!(results[1], results[4]);
        assert_ne!(results[0], results[1]);
        assert_eq!(cache.dispatches(), 3);
        assert_eq!(cache.len(), 3);
    }

    /// Cached and uncached paths agree.
    #[tokio::test]
    async fn test_cache_matches_direct_derivation() {
        let cache = cache();
        let id = cache.identifier("alice").await.unwrap();

        assert_eq!(
            cache.access_public_key(&id, "pw").await.unwrap(),
            cache.bypass().access_public_key(&id, "pw").await.unwrap()
        );
        assert_eq!(
            cache.password_check_hash("pw", 32).await.unwrap(),
            cache.bypass().password_check_hash("pw", 32).await.unwrap()
        );
    }

    /// The cached vault key seals what a fresh derivation opens.
    #[tokio::test]
    async fn test_cached_vault_key_round_trip() {
        let cache = cache();
        let bridge = cache.bypass().bridge().clone();
        let id = cache.identifier("alice").await.unwrap();

        let cached = cache.vault_key(&id, "pw").await.unwrap();
        assert!(Arc::ptr_eq(&cached, &cache.vault_key(&id, "pw").await.unwrap()));

        let sealed = bridge
            .call(
                CallRequest::function("vault_seal")
                    .handle(&cached)
                    .arg("{\"notes\":[]}"),
            )
            .await
            .unwrap()
            .into_string()
            .unwrap();

        let fresh = cache.bypass().vault_key(&id, "pw").await.unwrap();
        let opened = bridge
            .call(CallRequest::function("vault_open").handle(&fresh).arg(sealed))
            .await
            .unwrap()
            .into_string()
            .unwrap();
        assert_eq!(opened, "{\"notes\":[]}");
        fresh.release().await.unwrap();
    }

    // =============================================================================
    // INTEGRATION TESTS: KEY FACTORY
    // =============================================================================

    /// Generated keys differ and export through the bridge.
    #[tokio::test]
    async fn test_generated_keys_are_distinct() {
        let bridge = sc_04_compute_module::spawn(16).unwrap();
        let factory = KeyFactory::new(bridge, Arc::new(EntropyCollector::default()));

        let a = factory.generate_exchange_key().await.unwrap();
        let b = factory.generate_exchange_key().await.unwrap();
        assert_eq!(a.class(), ClassTag::ExchangeKey);

        let mut exported = Vec::new();
        for key in [&a, &b] {
            let encoded = key
                .call(key.method("to_base64"))
                .await
                .unwrap()
                .into_string()
                .unwrap();
            exported.push(encoded);
        }
        let (a_key, b_key) = (&exported[0], &exported[1]);
        assert_ne!(a_key, b_key);
    }
}

//! # Handle Lifecycle Flows
//!
//! Ownership of module objects across the bridge: creation, use, release,
//! and what happens to stale references on both sides.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sc_02_call_bridge::{BridgeError, CallMessage, CallRequest, FaultKind, NativeClass, Reply};
    use sc_03_entropy::EntropyCollector;
    use sc_04_compute_module::ClassTag;
    use sc_05_derivation::KeyFactory;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn factory() -> KeyFactory {
        let bridge = sc_04_compute_module::spawn(16).unwrap();
        KeyFactory::new(bridge, Arc::new(EntropyCollector::default()))
    }

    /// Instance call built by hand, bypassing the local liveness check.
    fn raw_instance_call(class: ClassTag, ref_id: sc_02_call_bridge::RefId, function: &str) -> CallMessage {
        let mut message = CallMessage::new(function);
        message.class_tag = Some(class.name().to_string());
        message.ref_id = Some(ref_id);
        message
    }

    // =============================================================================
    // INTEGRATION TESTS: RELEASE
    // =============================================================================

    /// The second release of a handle is an error.
    #[tokio::test]
    async fn test_double_release() {
        let factory = factory();
        let key = factory.generate_access_key().await.unwrap();

        key.release().await.unwrap();
        assert!(matches!(
            key.release().await,
            Err(BridgeError::DeadHandle { .. })
        ));
    }

    /// A released handle cannot be called or passed as an argument.
    #[tokio::test]
    async fn test_use_after_release_is_local_error() {
        let factory = factory();
        let key = factory.generate_access_key().await.unwrap();
        key.release().await.unwrap();

        assert!(matches!(
            key.call(key.method("public_key")).await,
            Err(BridgeError::DeadHandle { .. })
        ));

        let stats = factory_bridge_registered(&factory);
        let err = factory
            .bridge()
            .call(CallRequest::function("vault_seal").handle(&key).arg("{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::DeadHandle { .. }));
        // Nothing was sent.
        assert_eq!(factory_bridge_registered(&factory), stats);
    }

    /// The module side rejects a stale reference id.
    #[tokio::test]
    async fn test_stale_ref_id_is_invalid_handle() {
        let factory = factory();
        let key = factory.generate_exchange_key().await.unwrap();
        let ref_id = key.ref_id();
        key.release().await.unwrap();

        let err = factory
            .bridge()
            .dispatch(raw_instance_call(ClassTag::ExchangeKey, ref_id, "to_base64"))
            .await
            .unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::InvalidHandle));
    }

    /// A live id presented under the wrong class is refused.
    #[tokio::test]
    async fn test_wrong_class_is_invalid_handle() {
        let factory = factory();
        let key = factory.generate_exchange_key().await.unwrap();

        let err = factory
            .bridge()
            .dispatch(raw_instance_call(ClassTag::AccessKey, key.ref_id(), "to_base64"))
            .await
            .unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::InvalidHandle));

        // The key itself is untouched.
        let reply = factory
            .bridge()
            .dispatch(raw_instance_call(ClassTag::ExchangeKey, key.ref_id(), "to_base64"))
            .await
            .unwrap();
        assert!(matches!(reply, Reply::Value(_)));
        key.release().await.unwrap();
    }

    // =============================================================================
    // INTEGRATION TESTS: BRIDGE FAULTS
    // =============================================================================

    /// Unknown names come back as rejections, and the bridge keeps working.
    #[tokio::test]
    async fn test_unknown_names_are_rejected() {
        let factory = factory();
        let bridge = factory.bridge();

        let err = bridge.dispatch(CallMessage::new("mine_bitcoin")).await.unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::UnknownFunction));

        let mut message = CallMessage::new("generate");
        message.class_tag = Some("Wallet".into());
        message.is_static_call = true;
        let err = bridge.dispatch(message).await.unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::UnknownClass));

        assert!(factory.generate_access_key().await.is_ok());
        assert_eq!(bridge.pending_count(), 0);
    }

    /// Every settled call leaves the pending table.
    #[tokio::test]
    async fn test_pending_table_drains() {
        let factory = factory();
        let keys = futures::future::join_all((0..8).map(|_| factory.generate_access_key())).await;
        assert!(keys.iter().all(Result::is_ok));
        assert_eq!(factory.bridge().pending_count(), 0);

        for key in keys.into_iter().flatten() {
            key.release().await.unwrap();
        }
        assert_eq!(factory.bridge().pending_count(), 0);
    }

    fn factory_bridge_registered(factory: &KeyFactory) -> u64 {
        factory
            .bridge()
            .stats()
            .total_registered
            .load(std::sync::atomic::Ordering::Relaxed)
    }
}

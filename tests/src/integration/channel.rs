//! # Channel Flows
//!
//! Bootstrap, pack, post and unpack through a fully wired client.
//!
//! ## Flow Tested:
//!
//! 1. **Discovery → Bootstrap**: signed server key verified against the anchor
//! 2. **Packer → Transport → Unpacker**: encrypted GraphQL round trip
//! 3. **Trust failure**: a bad signature stops every later operation before
//!    the channel endpoint is contacted

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use client_runtime::{ClientConfig, ClientContext};
    use sc_04_compute_module::protocol;
    use sc_06_secure_channel::{
        decode_response, BootstrapState, ChannelError, ChannelTransport, LoopbackServer,
        ServerKeyRecord, StaticDiscovery, TrustAnchor,
    };
    use serde_json::json;
    use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature, SharedSecret};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    const PING: &[u8] = b"{\"graphql\":\"{ping}\"}";

    struct Harness {
        client: ClientContext,
        server: Arc<LoopbackServer>,
    }

    async fn harness(server: LoopbackServer) -> Harness {
        let anchor = Ed25519KeyPair::generate();
        let server = Arc::new(server);
        let client = ClientContext::start_with(
            ClientConfig::default(),
            TrustAnchor::new(anchor.public_key()),
            Arc::new(server.discovery(&anchor)),
            server.clone(),
        )
        .await
        .unwrap();
        Harness { client, server }
    }

    /// Discovery answer whose signature has one flipped bit.
    fn corrupted_discovery(server: &LoopbackServer, anchor: &Ed25519KeyPair) -> StaticDiscovery {
        let key = server.public_key();
        let mut signature = *anchor.sign(key.as_bytes()).as_bytes();
        signature[0] ^= 0x01;
        StaticDiscovery::new(ServerKeyRecord {
            public_key: key.to_base64(),
            public_key_signature: Ed25519Signature::from_bytes(signature).to_base64(),
        })
    }

    // =============================================================================
    // INTEGRATION TESTS: HAPPY PATH
    // =============================================================================

    /// Ready channel, packed ping, encrypted pong, decoded `"pong"`.
    #[tokio::test]
    async fn test_ping_pong_scenario() {
        let h = harness(LoopbackServer::ping_pong()).await;
        let channel = h.client.channel();

        let query = channel.pack(PING).await.unwrap();
        assert_eq!(channel.bootstrap().state(), BootstrapState::Ready);
        assert!(!query.bytes.is_empty());
        assert!(query.shared_secret().len() >= 32);

        let response = h.server.post(query.bytes.clone()).await.unwrap();
        let payload = channel.unpack(response, query).await.unwrap();
        assert_eq!(payload, b"{\"data\":{\"ping\":\"pong\"}}");
        assert_eq!(decode_response(&payload).unwrap(), json!("pong"));
    }

    /// The one-call path gives the same answer.
    #[tokio::test]
    async fn test_graphql_over_wired_client() {
        let h = harness(LoopbackServer::ping_pong()).await;
        let value = h.client.channel().graphql("{ping}", None).await.unwrap();
        assert_eq!(value, json!("pong"));
        assert_eq!(h.server.requests(), 1);
    }

    /// Queries packed by the bridge open with the server's protocol code.
    #[tokio::test]
    async fn test_server_sees_the_packed_payload() {
        let h = harness(LoopbackServer::ping_pong()).await;
        let query = h.client.channel().pack(b"{}").await.unwrap();

        // Round-trip law on the response side.
        let secret = SharedSecret::from_slice(query.shared_secret()).unwrap();
        let sealed = protocol::pack_response(b"world", &secret).unwrap();
        let opened = protocol::unpack_response(&sealed, &secret).unwrap();
        assert_eq!(opened, b"world");

        let reply = h.server.post(query.bytes.clone()).await.unwrap();
        assert_eq!(
            h.client.channel().unpack(reply, query).await.unwrap(),
            b"{\"errors\":[{\"message\":\"unknown query None\"}]}"
        );
    }

    /// Concurrent exchanges each get their own answer.
    #[tokio::test]
    async fn test_concurrent_exchanges() {
        let h = harness(LoopbackServer::new(|request| {
            json!({"data": {"echo": request["graphql"]}})
        }))
        .await;
        let channel = h.client.channel();

        let queries = ["{a}", "{b}", "{c}", "{d}"];
        let answers =
            futures::future::join_all(queries.iter().map(|q| channel.graphql(q, None))).await;
        for (query, answer) in queries.iter().zip(answers) {
            assert_eq!(answer.unwrap(), json!(query));
        }
        assert_eq!(h.server.requests(), queries.len());
    }

    // =============================================================================
    // INTEGRATION TESTS: FAILURES
    // =============================================================================

    /// Bad signature → FAILED → pack rejected without touching the transport.
    #[tokio::test]
    async fn test_corrupted_signature_scenario() {
        let anchor = Ed25519KeyPair::generate();
        let server = Arc::new(LoopbackServer::ping_pong());
        let client = ClientContext::start_with(
            ClientConfig::default(),
            TrustAnchor::new(anchor.public_key()),
            Arc::new(corrupted_discovery(&server, &anchor)),
            server.clone(),
        )
        .await
        .unwrap();
        let channel = client.channel();

        assert!(matches!(channel.bootstrap().start().await, Err(ChannelError::Trust(_))));
        assert_eq!(channel.bootstrap().state(), BootstrapState::Failed);

        assert!(matches!(channel.pack(PING).await, Err(ChannelError::Trust(_))));
        assert!(matches!(
            channel.graphql("{ping}", None).await,
            Err(ChannelError::Trust(_))
        ));
        assert_eq!(server.requests(), 0);
    }

    /// A server key signed by someone else is not trusted either.
    #[tokio::test]
    async fn test_foreign_anchor_is_rejected() {
        let anchor = Ed25519KeyPair::generate();
        let impostor = Ed25519KeyPair::generate();
        let server = Arc::new(LoopbackServer::ping_pong());
        let client = ClientContext::start_with(
            ClientConfig::default(),
            TrustAnchor::new(anchor.public_key()),
            Arc::new(server.discovery(&impostor)),
            server.clone(),
        )
        .await
        .unwrap();

        let err = client.channel().graphql("{ping}", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Trust(_)));
        assert_eq!(server.requests(), 0);
    }

    /// An unreachable discovery endpoint is a transport failure, and final.
    #[tokio::test]
    async fn test_discovery_outage_scenario() {
        let anchor = Ed25519KeyPair::generate();
        let server = Arc::new(LoopbackServer::ping_pong());
        let discovery = Arc::new(StaticDiscovery::failing(ChannelError::Transport(
            "connection refused".into(),
        )));
        let client = ClientContext::start_with(
            ClientConfig::default(),
            TrustAnchor::new(anchor.public_key()),
            discovery.clone(),
            server.clone(),
        )
        .await
        .unwrap();

        let err = client.channel().graphql("{ping}", None).await.unwrap_err();
        assert_eq!(err, ChannelError::Transport("connection refused".into()));
        assert!(!err.is_protocol());
        assert_eq!(client.channel().bootstrap().state(), BootstrapState::Failed);
        assert_eq!(discovery.calls(), 1);
        assert_eq!(server.requests(), 0);
    }

    /// Wrong secret fails authentication instead of yielding other data.
    #[tokio::test]
    async fn test_wrong_secret_never_yields_data() {
        let h = harness(LoopbackServer::ping_pong()).await;
        let channel = h.client.channel();

        let ours = channel.pack(PING).await.unwrap();
        let theirs = channel.pack(PING).await.unwrap();
        let response = h.server.post(theirs.bytes.clone()).await.unwrap();

        let err = channel.unpack(response, ours).await.unwrap_err();
        assert!(matches!(err, ChannelError::Decryption(_)));
        assert!(err.is_protocol());
    }

    /// Stale responses are refused even with the right secret.
    #[tokio::test]
    async fn test_expired_response_rejected() {
        let h = harness(LoopbackServer::ping_pong()).await;
        h.server.set_response_expiry(Some(protocol::expiry_now() - 3_600));

        let err = h.client.channel().graphql("{ping}", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Expired(_)));
    }

    /// Server-side errors stay application errors.
    #[tokio::test]
    async fn test_application_errors_are_not_protocol_errors() {
        let h = harness(LoopbackServer::ping_pong()).await;
        let err = h.client.channel().graphql("{pong}", None).await.unwrap_err();
        assert!(matches!(err, ChannelError::Application(_)));
        assert!(!err.is_protocol());
    }

    // =============================================================================
    // INTEGRATION TESTS: SIGNED QUERIES
    // =============================================================================

    /// Access key derived through the bridge signs queries the server accepts.
    #[tokio::test]
    async fn test_signed_exchange_with_derived_access_key() {
        let anchor = Ed25519KeyPair::generate();
        let first = harness(LoopbackServer::ping_pong()).await;

        let identifier = first.client.derivations().identifier("alice").await.unwrap();
        let public_key = first
            .client
            .derivations()
            .access_public_key(&identifier, "hunter2")
            .await
            .unwrap();
        let signer = Ed25519PublicKey::from_base64(&public_key).unwrap();

        let server = Arc::new(LoopbackServer::ping_pong().require_signer(signer));
        let client = ClientContext::start_with(
            ClientConfig::default(),
            TrustAnchor::new(anchor.public_key()),
            Arc::new(server.discovery(&anchor)),
            server.clone(),
        )
        .await
        .unwrap();

        let access_key = client
            .keys()
            .derive_access_key(&identifier, "hunter2")
            .await
            .unwrap();
        let value = client
            .channel()
            .signed_graphql("{ping}", None, &access_key)
            .await
            .unwrap();
        assert_eq!(value, json!("pong"));

        // Wrong password, wrong key.
        let other = client
            .keys()
            .derive_access_key(&identifier, "hunter3")
            .await
            .unwrap();
        let err = client
            .channel()
            .signed_graphql("{ping}", None, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Application(_)));
    }
}

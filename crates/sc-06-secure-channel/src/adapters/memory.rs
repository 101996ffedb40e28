//! In-memory adapters.
//!
//! A discovery endpoint with a fixed answer and a server that speaks the
//! channel protocol in-process. Used by tests and local tooling.

use crate::domain::errors::ChannelError;
use crate::ports::outbound::{ChannelTransport, DiscoveryGateway, ServerKeyRecord};
use async_trait::async_trait;
use parking_lot::Mutex;
use sc_04_compute_module::protocol::{self, expiry_now};
use serde_json::{json, Value};
use shared_crypto::{Ed25519KeyPair, Ed25519PublicKey, ExchangePublicKey, ExchangeSecret};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

/// Discovery endpoint that always gives the same answer.
pub struct StaticDiscovery {
    answer: Result<ServerKeyRecord, ChannelError>,
    calls: AtomicUsize,
}

impl StaticDiscovery {
    pub fn new(record: ServerKeyRecord) -> Self {
        Self {
            answer: Ok(record),
            calls: AtomicUsize::new(0),
        }
    }

    /// Publish `server_key` signed by `anchor`.
    pub fn signed(server_key: &ExchangePublicKey, anchor: &Ed25519KeyPair) -> Self {
        Self::new(ServerKeyRecord {
            public_key: server_key.to_base64(),
            public_key_signature: anchor.sign(server_key.as_bytes()).to_base64(),
        })
    }

    /// Fail every fetch with `error`.
    pub fn failing(error: ChannelError) -> Self {
        Self {
            answer: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiscoveryGateway for StaticDiscovery {
    async fn fetch_server_key(&self) -> Result<ServerKeyRecord, ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}

type Handler = Box<dyn Fn(&Value) -> Value + Send + Sync>;

/// Server side of the channel, in-process.
///
/// Decrypts each query, hands the JSON body to a handler and encrypts the
/// handler's answer. Queries that fail to decrypt are rejected the way an
/// HTTP server would, as a transport failure.
pub struct LoopbackServer {
    secret: ExchangeSecret,
    handler: Handler,
    required_signer: Option<Ed25519PublicKey>,
    requests: AtomicUsize,
    response_expiry: Mutex<Option<u64>>,
    tamper: AtomicBool,
}

impl LoopbackServer {
    pub fn new(handler: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Self {
            secret: ExchangeSecret::random(),
            handler: Box::new(handler),
            required_signer: None,
            requests: AtomicUsize::new(0),
            response_expiry: Mutex::new(None),
            tamper: AtomicBool::new(false),
        }
    }

    /// Answers `{ping}` with `pong` and anything else with an error.
    pub fn ping_pong() -> Self {
        Self::new(|request| match request.get("graphql").and_then(Value::as_str) {
            Some("{ping}") => json!({"data": {"ping": "pong"}}),
            other => json!({"errors": [{"message": format!("unknown query {other:?}")}]}),
        })
    }

    /// Answer only queries signed by `signer`.
    pub fn require_signer(mut self, signer: Ed25519PublicKey) -> Self {
        self.required_signer = Some(signer);
        self
    }

    pub fn public_key(&self) -> ExchangePublicKey {
        self.secret.public_key()
    }

    /// Discovery answer for this server signed by `anchor`.
    pub fn discovery(&self, anchor: &Ed25519KeyPair) -> StaticDiscovery {
        StaticDiscovery::signed(&self.public_key(), anchor)
    }

    /// Queries received so far, including rejected ones.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Stamp responses with this expiry instead of the current time.
    pub fn set_response_expiry(&self, expires_at: Option<u64>) {
        *self.response_expiry.lock() = expires_at;
    }

    /// Flip a ciphertext bit in every response.
    pub fn set_tamper(&self, tamper: bool) {
        self.tamper.store(tamper, Ordering::SeqCst);
    }

    fn answer(&self, body: &[u8]) -> Result<Vec<u8>, ChannelError> {
        let query = protocol::unpack_query(body, &self.secret)
            .map_err(|e| ChannelError::Transport(format!("400 Bad Request: {e}")))?;

        let request: Value = serde_json::from_slice(&query.payload)
            .map_err(|e| ChannelError::Transport(format!("400 Bad Request: {e}")))?;

        let authorized = match &self.required_signer {
            Some(signer) => query.verify_signature(signer).is_ok(),
            None => true,
        };
        let response = if authorized {
            (self.handler)(&request)
        } else {
            json!({"errors": [{"message": "unauthorized"}]})
        };
        debug!(signed = query.is_signed(), authorized, "Loopback server answered");

        let payload =
            serde_json::to_vec(&response).map_err(|e| ChannelError::Transport(e.to_string()))?;
        let expires_at = (*self.response_expiry.lock()).unwrap_or_else(expiry_now);
        let mut packed = protocol::pack_response_at(&payload, &query.shared_secret, expires_at)
            .map_err(|e| ChannelError::Transport(format!("500 Internal Server Error: {e}")))?;

        if self.tamper.load(Ordering::SeqCst) {
            if let Some(last) = packed.last_mut() {
                *last ^= 0x80;
            }
        }
        Ok(packed)
    }
}

#[async_trait]
impl ChannelTransport for LoopbackServer {
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, ChannelError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.answer(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loopback_answers_packed_query() {
        let server = LoopbackServer::ping_pong();
        let query =
            protocol::pack_unsigned_query(b"{\"graphql\":\"{ping}\"}", &server.public_key()).unwrap();

        let response = server.post(query.bytes).await.unwrap();
        let payload = protocol::unpack_response(&response, &query.shared_secret).unwrap();
        assert_eq!(payload, b"{\"data\":{\"ping\":\"pong\"}}");
        assert_eq!(server.requests(), 1);
    }

    #[tokio::test]
    async fn test_garbage_rejected_as_transport_error() {
        let server = LoopbackServer::ping_pong();
        assert!(matches!(
            server.post(vec![0; 10]).await,
            Err(ChannelError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_static_discovery_counts() {
        let anchor = Ed25519KeyPair::generate();
        let server = LoopbackServer::ping_pong();
        let discovery = server.discovery(&anchor);
        let record = discovery.fetch_server_key().await.unwrap();
        assert_eq!(record.public_key, server.public_key().to_base64());
        assert_eq!(discovery.calls(), 1);
    }
}

//! Query packer and response unpacker.

use crate::application::bootstrap::ChannelBootstrap;
use crate::domain::envelope::{decode_response, encode_request};
use crate::domain::errors::ChannelError;
use crate::ports::outbound::ChannelTransport;
use crate::EXCHANGE_LOG_TARGET;
use sc_02_call_bridge::{Bridge, BridgeError, CallRequest, NativeHandle, WireValue};
use sc_03_entropy::EntropyCollector;
use sc_04_compute_module::ClassTag;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// A packed query waiting for its response.
///
/// Holds the per-query shared secret; consumed by [`SecureChannel::unpack`],
/// which wipes the secret.
pub struct Query {
    pub bytes: Vec<u8>,
    pub expires_at: u64,
    shared_secret: Zeroizing<Vec<u8>>,
}

impl Query {
    pub fn shared_secret(&self) -> &[u8] {
        &self.shared_secret
    }

    /// Move the secret buffer out, leaving an empty one behind.
    fn take_shared_secret(&mut self) -> Vec<u8> {
        std::mem::take(&mut *self.shared_secret)
    }
}

fn preloaded_expiry(value: WireValue) -> Result<u64, BridgeError> {
    match value {
        WireValue::Int(n) => u64::try_from(n).map_err(|_| {
            BridgeError::UnexpectedResult(format!("preloaded `expires_at` is negative: {n}"))
        }),
        other => Err(BridgeError::UnexpectedResult(format!(
            "preloaded `expires_at` is not an int: {}",
            other.kind()
        ))),
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("bytes", &self.bytes.len())
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Encrypted request/response over the channel.
#[derive(Clone)]
pub struct SecureChannel {
    bridge: Bridge<ClassTag>,
    bootstrap: Arc<ChannelBootstrap>,
    transport: Arc<dyn ChannelTransport>,
    entropy: Arc<EntropyCollector>,
}

impl SecureChannel {
    pub fn new(
        bridge: Bridge<ClassTag>,
        bootstrap: Arc<ChannelBootstrap>,
        transport: Arc<dyn ChannelTransport>,
        entropy: Arc<EntropyCollector>,
    ) -> Self {
        Self {
            bridge,
            bootstrap,
            transport,
            entropy,
        }
    }

    pub fn bootstrap(&self) -> &ChannelBootstrap {
        &self.bootstrap
    }

    /// Encrypt `payload` for the server.
    pub async fn pack(&self, payload: &[u8]) -> Result<Query, ChannelError> {
        self.pack_with("pack_unsigned_query", payload, None).await
    }

    /// Encrypt `payload` and sign it with `access_key`.
    pub async fn pack_signed(
        &self,
        payload: &[u8],
        access_key: &NativeHandle<ClassTag>,
    ) -> Result<Query, ChannelError> {
        self.pack_with("pack_signed_query", payload, Some(access_key))
            .await
    }

    async fn pack_with(
        &self,
        function: &str,
        payload: &[u8],
        access_key: Option<&NativeHandle<ClassTag>>,
    ) -> Result<Query, ChannelError> {
        let channel = self.bootstrap.channel().await?;

        let mut request = channel.method(function).arg(payload.to_vec());
        if let Some(key) = access_key {
            request = request.handle(key);
        }
        let request = request
            .preload("query", "get_query")
            .preload("shared_secret", "get_shared_secret")
            .preload("expires_at", "get_expiry")
            .release_immediately()
            .returns(ClassTag::Query);

        let (_, mut preloaded) = channel.call(request).await?.into_object()?;
        let expires_at = preloaded_expiry(preloaded.take("expires_at")?)?;
        Ok(Query {
            bytes: preloaded.take_bytes("query")?,
            shared_secret: Zeroizing::new(preloaded.take_bytes("shared_secret")?),
            expires_at,
        })
    }

    /// Decrypt the response to `query`.
    pub async fn unpack(&self, response: Vec<u8>, mut query: Query) -> Result<Vec<u8>, ChannelError> {
        let payload = self
            .bridge
            .call(
                CallRequest::function("unpack_response")
                    .arg(response)
                    .arg(query.take_shared_secret()),
            )
            .await
            .and_then(|result| result.into_bytes())?;
        Ok(payload)
    }

    /// Pack, post and unpack.
    pub async fn exchange(&self, payload: &[u8]) -> Result<Vec<u8>, ChannelError> {
        self.entropy.ping();
        let query = self.pack(payload).await?;
        self.round_trip(payload, query).await
    }

    /// [`exchange`](Self::exchange) with a signed query.
    pub async fn signed_exchange(
        &self,
        payload: &[u8],
        access_key: &NativeHandle<ClassTag>,
    ) -> Result<Vec<u8>, ChannelError> {
        self.entropy.ping();
        let query = self.pack_signed(payload, access_key).await?;
        self.round_trip(payload, query).await
    }

    async fn round_trip(&self, payload: &[u8], query: Query) -> Result<Vec<u8>, ChannelError> {
        debug!(
            target: EXCHANGE_LOG_TARGET,
            query = %String::from_utf8_lossy(payload),
            bytes = query.bytes.len(),
            "Sending query"
        );
        self.entropy.ping();

        let response = self.transport.post(query.bytes.clone()).await?;
        self.entropy.ping();

        let answer = self.unpack(response, query).await?;
        self.entropy.ping();
        debug!(
            target: EXCHANGE_LOG_TARGET,
            response = %String::from_utf8_lossy(&answer),
            "Received response"
        );
        Ok(answer)
    }

    /// Run a GraphQL query and return its `data`.
    pub async fn graphql(&self, query: &str, variables: Option<&Value>) -> Result<Value, ChannelError> {
        let body = encode_request(query, variables)?;
        decode_response(&self.exchange(&body).await?)
    }

    /// [`graphql`](Self::graphql) authenticated with `access_key`.
    pub async fn signed_graphql(
        &self,
        query: &str,
        variables: Option<&Value>,
        access_key: &NativeHandle<ClassTag>,
    ) -> Result<Value, ChannelError> {
        let body = encode_request(query, variables)?;
        decode_response(&self.signed_exchange(&body, access_key).await?)
    }
}

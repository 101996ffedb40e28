//! # Outbound Ports
//!
//! The two network endpoints the channel talks to.

use crate::domain::errors::ChannelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Discovery answer: the server's exchange key and the anchor's signature
/// over it, both base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerKeyRecord {
    pub public_key: String,
    pub public_key_signature: String,
}

/// Discovery endpoint - outbound port.
#[async_trait]
pub trait DiscoveryGateway: Send + Sync {
    /// Fetch the signed server key.
    async fn fetch_server_key(&self) -> Result<ServerKeyRecord, ChannelError>;
}

/// Secure channel endpoint - outbound port.
///
/// Only success or failure of the request itself carries meaning; the
/// body is opaque to the transport.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// Post a packed query, returning the packed response.
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, ChannelError>;
}

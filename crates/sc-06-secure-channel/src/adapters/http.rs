//! HTTP adapters.

use crate::domain::errors::ChannelError;
use crate::ports::outbound::{ChannelTransport, DiscoveryGateway, ServerKeyRecord};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

fn client(timeout: Duration) -> Result<reqwest::Client, ChannelError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ChannelError::Transport(format!("http client setup failed: {e}")))
}

fn transport_error(err: reqwest::Error) -> ChannelError {
    ChannelError::Transport(err.to_string())
}

/// `GET` on the discovery URL.
#[derive(Debug, Clone)]
pub struct HttpDiscovery {
    http_client: reqwest::Client,
    url: String,
}

impl HttpDiscovery {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChannelError> {
        Ok(Self {
            http_client: client(timeout)?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DiscoveryGateway for HttpDiscovery {
    async fn fetch_server_key(&self) -> Result<ServerKeyRecord, ChannelError> {
        debug!(url = %self.url, "Fetching server key");
        self.http_client
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport_error)?
            .json::<ServerKeyRecord>()
            .await
            .map_err(transport_error)
    }
}

/// `POST` of raw query bytes to the channel URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChannelError> {
        Ok(Self {
            http_client: client(timeout)?,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ChannelTransport for HttpTransport {
    async fn post(&self, body: Vec<u8>) -> Result<Vec<u8>, ChannelError> {
        let bytes = self
            .http_client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport_error)?
            .bytes()
            .await
            .map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

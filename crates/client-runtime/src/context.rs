//! # Client Context
//!
//! Holds the process-scoped objects and wires them together.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration and load the compiled-in trust anchor
//! 2. Spawn the computation context and connect the bridge
//! 3. Create the entropy pool
//! 4. Build the derivation cache, key factory and secure channel
//! 5. Kick off the channel bootstrap in the background

use crate::config::{compiled_trust_anchor, ClientConfig, ConfigError};
use sc_02_call_bridge::{Bridge, BridgeError};
use sc_03_entropy::{EntropyCollector, EntropyError, InputEvent};
use sc_04_compute_module::ClassTag;
use sc_05_derivation::{DerivationCache, KeyFactory};
use sc_06_secure_channel::{
    ChannelBootstrap, ChannelError, ChannelTransport, DiscoveryGateway, HttpDiscovery,
    HttpTransport, SecureChannel, TrustAnchor,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Startup errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error(transparent)]
    Entropy(#[from] EntropyError),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Everything a client needs, created once per process.
pub struct ClientContext {
    config: ClientConfig,
    bridge: Bridge<ClassTag>,
    entropy: Arc<EntropyCollector>,
    derivations: Arc<DerivationCache>,
    keys: KeyFactory,
    channel: SecureChannel,
}

impl ClientContext {
    /// Start a client that talks HTTP to the configured endpoints and
    /// trusts the anchor compiled into the build.
    pub async fn start(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let anchor = compiled_trust_anchor()?;

        let discovery = Arc::new(HttpDiscovery::new(
            config.discovery_url.clone(),
            config.http_timeout(),
        )?);
        let transport = Arc::new(HttpTransport::new(
            config.channel_url.clone(),
            config.http_timeout(),
        )?);
        Self::start_with(config, anchor, discovery, transport).await
    }

    /// Start a client on arbitrary endpoint adapters.
    pub async fn start_with(
        config: ClientConfig,
        anchor: TrustAnchor,
        discovery: Arc<dyn DiscoveryGateway>,
        transport: Arc<dyn ChannelTransport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let bridge = sc_04_compute_module::spawn(config.bridge_capacity)?;
        let entropy = Arc::new(EntropyCollector::new(config.entropy_pool_size)?);
        let derivations = Arc::new(DerivationCache::new(bridge.clone()));
        let keys = KeyFactory::new(bridge.clone(), Arc::clone(&entropy));

        let bootstrap = Arc::new(ChannelBootstrap::new(bridge.clone(), discovery, anchor));
        let channel = SecureChannel::new(
            bridge.clone(),
            Arc::clone(&bootstrap),
            transport,
            Arc::clone(&entropy),
        );

        // The outcome is kept by the bootstrap; failures are logged there.
        tokio::spawn(async move {
            let _ = bootstrap.start().await;
        });

        info!(
            channel_url = %config.channel_url,
            discovery_url = %config.discovery_url,
            bridge_capacity = config.bridge_capacity,
            entropy_pool_size = config.entropy_pool_size,
            "Client started"
        );

        Ok(Self {
            config,
            bridge,
            entropy,
            derivations,
            keys,
            channel,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn bridge(&self) -> &Bridge<ClassTag> {
        &self.bridge
    }

    pub fn entropy(&self) -> &Arc<EntropyCollector> {
        &self.entropy
    }

    pub fn derivations(&self) -> &DerivationCache {
        &self.derivations
    }

    pub fn keys(&self) -> &KeyFactory {
        &self.keys
    }

    pub fn channel(&self) -> &SecureChannel {
        &self.channel
    }

    /// Start feeding input events into the entropy pool.
    ///
    /// Events sent on the returned channel are mixed in until the sender is
    /// dropped or [`shutdown`](Self::shutdown) is called.
    pub fn listen_for_input(&self, capacity: usize) -> mpsc::Sender<InputEvent> {
        let (events, receiver) = mpsc::channel(capacity.max(1));
        self.entropy.start(receiver);
        events
    }

    /// Stop background work owned by the context.
    pub fn shutdown(&self) {
        if self.entropy.stop() {
            debug!("Input listener stopped");
        }
    }
}

impl Drop for ClientContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

//! Channel bootstrap.
//!
//! Fetches the signed server key, has the computation module verify it
//! against the trust anchor and keeps the resulting channel object for the
//! life of the process. The bootstrap runs at most once: its outcome, success
//! or failure, is what every later caller gets.

use crate::domain::errors::ChannelError;
use crate::domain::state::BootstrapState;
use crate::domain::trust::TrustAnchor;
use crate::ports::outbound::DiscoveryGateway;
use parking_lot::RwLock;
use sc_02_call_bridge::{Bridge, CallRequest, NativeHandle};
use sc_04_compute_module::ClassTag;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

pub type ChannelHandle = Arc<NativeHandle<ClassTag>>;

pub struct ChannelBootstrap {
    bridge: Bridge<ClassTag>,
    discovery: Arc<dyn DiscoveryGateway>,
    anchor: TrustAnchor,
    state: RwLock<BootstrapState>,
    outcome: OnceCell<Result<ChannelHandle, ChannelError>>,
}

impl ChannelBootstrap {
    pub fn new(
        bridge: Bridge<ClassTag>,
        discovery: Arc<dyn DiscoveryGateway>,
        anchor: TrustAnchor,
    ) -> Self {
        Self {
            bridge,
            discovery,
            anchor,
            state: RwLock::new(BootstrapState::Unstarted),
            outcome: OnceCell::new(),
        }
    }

    pub fn state(&self) -> BootstrapState {
        *self.state.read()
    }

    /// Run the bootstrap if nobody has yet and wait for its outcome.
    pub async fn start(&self) -> Result<(), ChannelError> {
        self.channel().await.map(|_| ())
    }

    /// The verified channel. Waits for a bootstrap in progress.
    pub async fn channel(&self) -> Result<ChannelHandle, ChannelError> {
        self.outcome.get_or_init(|| self.run()).await.clone()
    }

    fn transition(&self, next: BootstrapState) {
        let mut state = self.state.write();
        info!(from = %*state, to = %next, "Channel bootstrap");
        *state = next;
    }

    async fn run(&self) -> Result<ChannelHandle, ChannelError> {
        let result = self.establish().await;
        match &result {
            Ok(_) => self.transition(BootstrapState::Ready),
            Err(e) => {
                error!(error = %e, "Channel bootstrap failed");
                self.transition(BootstrapState::Failed);
            }
        }
        result
    }

    async fn establish(&self) -> Result<ChannelHandle, ChannelError> {
        self.transition(BootstrapState::Fetching);
        let record = self.discovery.fetch_server_key().await?;

        self.transition(BootstrapState::Verifying);
        let channel = self
            .bridge
            .call(
                CallRequest::function("from_signed_key")
                    .static_on(ClassTag::Channel)
                    .arg(record.public_key)
                    .arg(record.public_key_signature)
                    .arg(self.anchor.to_base64())
                    .returns(ClassTag::Channel),
            )
            .await
            .and_then(|result| result.into_handle())
            .map_err(|e| ChannelError::Trust(e.to_string()))?;

        Ok(Arc::new(channel))
    }
}

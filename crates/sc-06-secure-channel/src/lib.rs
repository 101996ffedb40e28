//! # Secure Channel
//!
//! The UI-facing side of the sealed channel.
//!
//! ## Flow
//!
//! ```text
//! ChannelBootstrap: UNSTARTED → FETCHING → VERIFYING → READY
//!                                   └──────────┴────────→ FAILED (terminal)
//!
//! SecureChannel::graphql
//!   → pack (bridge: Channel.pack_unsigned_query, preload + release)
//!   → ChannelTransport::post
//!   → unpack (bridge: unpack_response)
//!   → {data, errors?} envelope
//! ```
//!
//! Every operation waits for the bootstrap. Once the bootstrap has failed,
//! every operation fails with [`ChannelError::Trust`] without touching the
//! transport.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub use adapters::http::{HttpDiscovery, HttpTransport};
pub use adapters::memory::{LoopbackServer, StaticDiscovery};
pub use application::bootstrap::ChannelBootstrap;
pub use application::service::{Query, SecureChannel};
pub use domain::envelope::{decode_response, encode_request};
pub use domain::errors::ChannelError;
pub use domain::state::BootstrapState;
pub use domain::trust::TrustAnchor;
pub use ports::outbound::{ChannelTransport, DiscoveryGateway, ServerKeyRecord};

/// Log target for plaintext queries and responses.
pub const EXCHANGE_LOG_TARGET: &str = "secure_channel::exchange";

//! # Client Runtime
//!
//! Configuration, logging and wiring for a sealed-channel client.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use client_runtime::{init_logging, ClientConfig, ClientContext};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::from_env();
//!     init_logging(&config.telemetry)?;
//!
//!     let client = ClientContext::start(config).await?;
//!     let pong = client.channel().graphql("{ping}", None).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `SC_CHANNEL_URL` | `http://localhost:3000/channel` | Secure channel endpoint |
//! | `SC_DISCOVERY_URL` | `<channel url>_information` | Signed server key endpoint |
//! | `SC_BRIDGE_CAPACITY` | `64` | Bridge channel depth |
//! | `SC_ENTROPY_POOL_SIZE` | `1024` | Entropy pool bytes |
//! | `SC_HTTP_TIMEOUT_SECS` | `30` | HTTP request timeout |
//! | `SC_LOG_LEVEL` | `info` | Log level filter |
//! | `SC_JSON_LOGS` | `false` | JSON log output |
//!
//! The trust anchor is not read at run time. Set `SC_TRUST_ANCHOR` to the
//! base64 Ed25519 key when building; [`ClientContext::start`] refuses to run
//! without it.

#![cfg_attr(test, allow(clippy::unwrap_used))]

mod config;
mod context;
mod telemetry;

pub use config::{compiled_trust_anchor, ClientConfig, ConfigError, TelemetryConfig};
pub use context::{ClientContext, ClientError};
pub use telemetry::{init_logging, TelemetryError};

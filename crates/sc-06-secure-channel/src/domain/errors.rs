//! Channel errors.

use sc_02_call_bridge::{BridgeError, FaultKind};
use serde_json::Value;
use thiserror::Error;

/// Everything a channel operation can fail with.
///
/// `Clone` because a failed bootstrap hands the same error to every caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The request never got a usable answer. Not retried.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server key could not be established. Fatal for the channel.
    #[error("channel trust error: {0}")]
    Trust(String),

    /// The response failed authentication or was malformed.
    #[error("decryption error: {0}")]
    Decryption(String),

    /// The response carried an expiry too far in the past.
    #[error("expired message: {0}")]
    Expired(String),

    /// The server answered with a non-empty `errors` list.
    #[error("application error: {}", summarize(.0))]
    Application(Vec<Value>),

    /// The decrypted payload is not a response envelope.
    #[error("invalid response envelope: {0}")]
    Envelope(String),

    /// Any other failure of the call bridge.
    #[error(transparent)]
    Bridge(BridgeError),
}

impl ChannelError {
    /// Decryption or expiry failures; the caller must pack a new query.
    pub fn is_protocol(&self) -> bool {
        matches!(self, ChannelError::Decryption(_) | ChannelError::Expired(_))
    }
}

impl From<BridgeError> for ChannelError {
    fn from(err: BridgeError) -> Self {
        match err.fault_kind() {
            Some(FaultKind::Trust) => ChannelError::Trust(err.to_string()),
            Some(FaultKind::Decryption) => ChannelError::Decryption(err.to_string()),
            Some(FaultKind::Expired) => ChannelError::Expired(err.to_string()),
            _ => ChannelError::Bridge(err),
        }
    }
}

fn summarize(errors: &[Value]) -> String {
    let first = errors
        .first()
        .and_then(|e| e.get("message").and_then(Value::as_str).map(str::to_string))
        .or_else(|| errors.first().map(Value::to_string))
        .unwrap_or_default();
    match errors.len() {
        1 => first,
        n => format!("{first} (and {} more)", n - 1),
    }
}

//! Caller-side bridge errors.

use crate::domain::fault::{BridgeFault, FaultKind};
use thiserror::Error;

/// Errors surfaced to callers of the bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The computation context rejected the call.
    #[error("{0}")]
    Fault(BridgeFault),

    /// The local handle was already released; nothing was sent.
    #[error("invalid handle: {class} object was already released")]
    DeadHandle { class: &'static str },

    /// A transferred buffer was read again.
    #[error("buffer was transferred and can no longer be read")]
    Detached,

    /// The computation context is gone.
    #[error("bridge disconnected")]
    Disconnected,

    /// The computation context could not be started.
    #[error("failed to start computation context: {0}")]
    Startup(String),

    /// The result did not have the shape the caller asked for.
    #[error("unexpected result: {0}")]
    UnexpectedResult(String),
}

impl BridgeError {
    /// Kind of the remote fault, if this is one.
    pub fn fault_kind(&self) -> Option<FaultKind> {
        match self {
            BridgeError::Fault(fault) => Some(fault.kind),
            _ => None,
        }
    }

    /// Dead handles, whether caught locally or by the computation context.
    pub fn is_invalid_handle(&self) -> bool {
        matches!(self, BridgeError::DeadHandle { .. })
            || self.fault_kind() == Some(FaultKind::InvalidHandle)
    }
}

impl From<BridgeFault> for BridgeError {
    fn from(fault: BridgeFault) -> Self {
        BridgeError::Fault(fault)
    }
}

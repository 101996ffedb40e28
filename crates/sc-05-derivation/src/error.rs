//! Derivation errors.

use sc_02_call_bridge::BridgeError;
use thiserror::Error;

/// Shared by every caller waiting on the same derivation, hence `Clone`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DerivationError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Arguments could not be turned into a cache key.
    #[error("cannot build cache key: {0}")]
    Key(String),
}

//! Faults that cross the bridge.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure class of a rejected call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// No function of that name
    UnknownFunction,
    /// No class of that tag
    UnknownClass,
    /// Reference id is 0, stale, or of the wrong class
    InvalidHandle,
    /// Argument missing or of the wrong shape
    InvalidArgument,
    /// Signature over server key material did not verify
    Trust,
    /// Authenticated decryption failed
    Decryption,
    /// Embedded expiry is in the past
    Expired,
    /// Key derivation failed
    Derivation,
    /// Any other module failure
    Internal,
    /// The native call panicked
    Panicked,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FaultKind::UnknownFunction => "unknown function",
            FaultKind::UnknownClass => "unknown class",
            FaultKind::InvalidHandle => "invalid handle",
            FaultKind::InvalidArgument => "invalid argument",
            FaultKind::Trust => "channel trust",
            FaultKind::Decryption => "decryption",
            FaultKind::Expired => "expired",
            FaultKind::Derivation => "derivation",
            FaultKind::Internal => "internal",
            FaultKind::Panicked => "panicked",
        };
        f.write_str(name)
    }
}

/// Serialized rejection delivered to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeFault {
    pub kind: FaultKind,
    pub message: String,
}

impl BridgeFault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_function(name: &str) -> Self {
        Self::new(FaultKind::UnknownFunction, format!("unknown function `{name}`"))
    }

    pub fn unknown_class(tag: &str) -> Self {
        Self::new(FaultKind::UnknownClass, format!("unknown class tag `{tag}`"))
    }

    pub fn invalid_handle(detail: impl fmt::Display) -> Self {
        Self::new(FaultKind::InvalidHandle, detail.to_string())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FaultKind::InvalidArgument, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, message)
    }
}

impl fmt::Display for BridgeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for BridgeFault {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_function_names_function() {
        let fault = BridgeFault::unknown_function("frobnicate");
        assert_eq!(fault.kind, FaultKind::UnknownFunction);
        assert!(fault.to_string().contains("frobnicate"));
    }

    #[test]
    fn test_fault_serializes_kind_snake_case() {
        let fault = BridgeFault::new(FaultKind::InvalidHandle, "gone");
        let json = serde_json::to_value(&fault).unwrap();
        assert_eq!(json["kind"], "invalid_handle");
        assert_eq!(json["message"], "gone");
    }
}

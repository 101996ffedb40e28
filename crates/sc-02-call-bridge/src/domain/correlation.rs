//! Correlation ids matching calls to responses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier matching an outbound call to its inbound response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Create from a raw value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic correlation id source.
///
/// Ids wrap back to 0 after [`CorrelationSequence::MAX`]. Uniqueness among
/// in-flight calls relies on every earlier id having resolved by the time the
/// counter comes round again.
#[derive(Debug, Default)]
pub struct CorrelationSequence {
    next: AtomicU64,
}

impl CorrelationSequence {
    /// Largest id handed out (2^53 - 1, the largest integer every JSON peer
    /// represents exactly).
    pub const MAX: u64 = (1 << 53) - 1;

    /// Start at 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Start at `first`. Useful to exercise the wrap.
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first.min(Self::MAX)),
        }
    }

    /// Hand out the next id.
    pub fn next_id(&self) -> CorrelationId {
        let mut current = self.next.load(Ordering::Relaxed);
        loop {
            let following = if current >= Self::MAX { 0 } else { current + 1 };
            match self.next.compare_exchange_weak(
                current,
                following,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return CorrelationId(current),
                Err(actual) => current = actual,
            }
        }
    }
}

//! Opaque reference ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to an object in a [`HandleTable`](crate::HandleTable).
///
/// Layout: high 32 bits = slot generation, low 32 bits = slot index + 1.
/// The `+ 1` keeps every live id non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(u64);

impl RefId {
    /// The dead reference.
    pub const DEAD: RefId = RefId(0);

    pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
        Self((u64::from(generation) << 32) | (u64::from(index) + 1))
    }

    /// Rebuild from the raw value carried on the wire.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw value for the wire.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this id could name a live object.
    pub const fn is_live(self) -> bool {
        self.0 != 0
    }

    pub(crate) fn index(self) -> Option<u32> {
        let low = (self.0 & u64::from(u32::MAX)) as u32;
        low.checked_sub(1)
    }

    pub(crate) fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RefId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

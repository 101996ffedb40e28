//! Handle lookup errors.

use crate::RefId;
use thiserror::Error;

/// Errors from handle table operations.
///
/// Every variant reads as "invalid handle": callers on the far side of the
/// bridge cannot do anything different for a stale id than for a dead one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandleError {
    /// The reference id is 0 (released, or never assigned).
    #[error("invalid handle: reference id is 0")]
    Dead,

    /// The slot exists but the object it named was released.
    #[error("invalid handle {0}: object was released")]
    Stale(RefId),

    /// The id names no slot of this table.
    #[error("invalid handle {0}: unknown reference")]
    Unknown(RefId),

    /// The object exists but is not of the expected class.
    #[error("invalid handle {ref_id}: expected {expected}, found {found}")]
    ClassMismatch {
        /// The offending reference id
        ref_id: RefId,
        /// Class the caller claimed
        expected: String,
        /// Class actually stored
        found: String,
    },
}

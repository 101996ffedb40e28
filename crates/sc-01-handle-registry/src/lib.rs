//! # Handle Registry
//!
//! Objects created inside the computation context never leave it. The other
//! side only ever sees a [`RefId`]: an opaque, non-zero number naming a slot
//! in a [`HandleTable`] together with the generation of that slot.
//!
//! ## Invariants
//!
//! - `RefId(0)` is dead; every lookup with it fails
//! - Releasing a slot bumps its generation, so a stale id that points at a
//!   reused slot is detected instead of silently reaching the new object
//! - A second release of the same id is an error, never a no-op

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod ref_id;
pub mod table;

pub use error::HandleError;
pub use ref_id::RefId;
pub use table::{HandleTable, Tagged};

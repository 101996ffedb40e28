//! # Entropy Collector
//!
//! A fixed-size byte pool that accumulates the timing and position of user
//! input. Sensitive operations call [`EntropyCollector::ping`] before and
//! after they run, so the pool keeps moving even without user activity.
//!
//! The pool is exported (copied) to seed random generators inside the
//! computation module. Mixing is XOR at a circular cursor, so the order in
//! which concurrent writers land does not matter.

pub mod collector;
pub mod event;

pub use collector::{EntropyCollector, EntropyError, DEFAULT_POOL_SIZE};
pub use event::{InputEvent, Position};

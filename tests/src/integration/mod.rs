//! Integration flows.

pub mod channel;
pub mod derivation;
pub mod lifecycle;

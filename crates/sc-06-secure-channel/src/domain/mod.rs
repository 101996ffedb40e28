//! Channel domain types.

pub mod envelope;
pub mod errors;
pub mod state;
pub mod trust;

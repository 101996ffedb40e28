//! Bridge domain types.

pub mod buffer;
pub mod class;
pub mod correlation;
pub mod fault;
pub mod pending;
pub mod wire;

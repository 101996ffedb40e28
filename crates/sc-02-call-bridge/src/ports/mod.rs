//! Ports implemented by the computation module.

pub mod module;

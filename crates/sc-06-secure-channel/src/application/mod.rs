//! Application services.

pub mod bootstrap;
pub mod service;

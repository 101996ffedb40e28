//! Ports for the secure channel.

pub mod outbound;

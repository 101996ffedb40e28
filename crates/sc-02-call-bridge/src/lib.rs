//! # Call Bridge
//!
//! Asynchronous request/response multiplexer between the UI-facing context
//! and the computation context.
//!
//! The computation context runs a [`ComputeModule`] on its own thread and
//! processes one [`CallMessage`] at a time. The UI side holds a cloneable
//! [`Bridge`]; any number of calls may be in flight, each suspended on a
//! oneshot receiver registered under its correlation id. Responses are routed
//! back by correlation id only, so their order never matters.
//!
//! ```text
//! caller ──► Bridge::call ──► mpsc ──► worker (HandleTable + ComputeModule)
//!   ▲                                          │
//!   └──── PendingCallStore ◄── router ◄── mpsc ┘
//! ```
//!
//! Objects created by the module stay in the worker's handle table. The UI
//! side receives a [`NativeHandle`] and must release it explicitly.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod compute;
pub mod domain;
pub mod error;
pub mod handle;
pub mod ports;
pub mod request;

#[cfg(test)]
mod testing;

pub use client::Bridge;
pub use compute::ComputeContext;
pub use domain::buffer::SharedBuffer;
pub use domain::class::{ClassTable, NativeClass};
pub use domain::correlation::{CorrelationId, CorrelationSequence};
pub use domain::fault::{BridgeFault, FaultKind};
pub use domain::pending::{PendingCallStore, PendingStats};
pub use domain::wire::{BridgeResponse, CallMessage, Reply, WireValue};
pub use error::BridgeError;
pub use handle::NativeHandle;
pub use ports::module::{Args, ComputeModule, Invocation, Outcome, Target};
pub use request::{Arg, CallRequest, CallResult, Preloaded};

pub use sc_01_handle_registry::{HandleTable, RefId, Tagged};

/// Function name the worker handles itself: releases the receiver object.
pub const FREE_FUNCTION: &str = "free";

/// Default depth of the bounded channels between the two contexts.
pub const DEFAULT_CAPACITY: usize = 64;

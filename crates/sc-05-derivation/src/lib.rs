//! # Derivations
//!
//! UI-side wrappers around the computation module's slow, deterministic
//! functions and its key generators.
//!
//! - [`Derivations`]: one bridge call per request
//! - [`DerivationCache`]: memoizes [`Derivations`]; concurrent identical
//!   requests share a single bridge call
//! - [`KeyFactory`]: keys seeded from the process entropy pool

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod cache;
pub mod derivations;
pub mod error;
pub mod factory;
pub mod memo;

pub use cache::DerivationCache;
pub use derivations::Derivations;
pub use error::DerivationError;
pub use factory::KeyFactory;
pub use memo::{CacheKey, CacheStats, Memo};

use sc_02_call_bridge::NativeHandle;
use sc_04_compute_module::ClassTag;

/// Handle to an object inside the computation module.
pub type ModuleHandle = NativeHandle<ClassTag>;

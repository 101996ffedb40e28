//! # Computation Module
//!
//! Everything that touches key material. The module runs inside the
//! computation context and is reached only through the call bridge; nothing
//! here is called directly by the UI side.
//!
//! ## Components
//!
//! - [`protocol`]: wire format, query packing and response unpacking
//! - [`channel`]: server key verified against the trust anchor
//! - [`keys`]: entropy-seeded RNG for key generation
//! - [`derive`]: Argon2id identifier and password derivations
//! - [`vault`]: sealed user documents
//! - [`module`]: the [`CryptoModule`] function table served over the bridge

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod channel;
pub mod derive;
pub mod error;
pub mod keys;
pub mod module;
pub mod protocol;
pub mod vault;

pub use channel::Channel;
pub use error::ModuleError;
pub use keys::{EntropyRng, MIN_ENTROPY};
pub use module::{ClassTag, CryptoModule, NativeObject};
pub use protocol::{Mode, PackedQuery, UnpackedQuery};

use sc_02_call_bridge::{Bridge, BridgeError, ComputeContext};

/// Start the crypto module in its own computation context.
pub fn spawn(capacity: usize) -> Result<Bridge<ClassTag>, BridgeError> {
    ComputeContext::spawn(CryptoModule::new(), capacity)
}

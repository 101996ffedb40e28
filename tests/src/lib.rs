//! # Sealed-Channel Test Suite
//!
//! Cross-crate flows, run against the in-process loopback server.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── channel.rs     # Bootstrap, packing and full exchanges
//!     ├── derivation.rs  # Cache deduplication and key material
//!     └── lifecycle.rs   # Handle ownership across the bridge
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sc-tests
//! cargo test -p sc-tests integration::channel::
//! ```

pub mod integration;

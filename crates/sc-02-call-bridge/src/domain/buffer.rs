//! Binary buffers that can be moved across the bridge.

use crate::error::BridgeError;
use parking_lot::Mutex;
use std::sync::Arc;

/// Caller-side view of a byte buffer.
///
/// Passing a buffer as a plain argument copies it. Listing it in a call's
/// transfer set moves the bytes into the message: every clone of this
/// buffer is detached afterwards and reading it fails.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Option<Vec<u8>>>>,
}

impl SharedBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(bytes))),
        }
    }

    /// Copy of the contents.
    pub fn read(&self) -> Result<Vec<u8>, BridgeError> {
        self.inner.lock().clone().ok_or(BridgeError::Detached)
    }

    /// Take the contents, leaving the buffer detached.
    pub fn detach(&self) -> Result<Vec<u8>, BridgeError> {
        self.inner.lock().take().ok_or(BridgeError::Detached)
    }

    pub fn is_detached(&self) -> bool {
        self.inner.lock().is_none()
    }

    /// Length, or `None` once detached.
    pub fn len(&self) -> Option<usize> {
        self.inner.lock().as_ref().map(Vec::len)
    }
}

impl From<Vec<u8>> for SharedBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

//! Caller-side handle to an object owned by the computation context.

use crate::client::Bridge;
use crate::domain::class::NativeClass;
use crate::domain::wire::CallMessage;
use crate::error::BridgeError;
use crate::request::{Arg, CallRequest, CallResult};
use crate::FREE_FUNCTION;
use sc_01_handle_registry::RefId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Opaque reference to a native object.
///
/// The object lives until [`release`](Self::release) is called. Dropping a
/// live handle does not free the object: it stays in the computation
/// context's table for the rest of the process.
pub struct NativeHandle<C: NativeClass> {
    bridge: Bridge<C>,
    class: C,
    ref_id: AtomicU64,
}

impl<C: NativeClass> NativeHandle<C> {
    pub(crate) fn new(bridge: Bridge<C>, class: C, ref_id: RefId) -> Self {
        Self {
            bridge,
            class,
            ref_id: AtomicU64::new(ref_id.raw()),
        }
    }

    pub fn class(&self) -> C {
        self.class
    }

    /// Current reference; [`RefId::DEAD`] once released.
    pub fn ref_id(&self) -> RefId {
        RefId::from_raw(self.ref_id.load(Ordering::Acquire))
    }

    pub fn is_live(&self) -> bool {
        self.ref_id().is_live()
    }

    /// This handle as a call argument.
    pub fn as_arg(&self) -> Arg {
        Arg::Handle {
            ref_id: self.ref_id(),
            class_tag: self.class.name(),
        }
    }

    /// Start a method call on this object.
    pub fn method(&self, name: impl Into<String>) -> CallRequest<C> {
        CallRequest::function(name)
    }

    /// Call a method on this object.
    pub async fn call(&self, request: CallRequest<C>) -> Result<CallResult<C>, BridgeError> {
        let ref_id = self.ref_id();
        if !ref_id.is_live() {
            return Err(BridgeError::DeadHandle {
                class: self.class.name(),
            });
        }
        self.bridge
            .call(request.on_instance(self.class, ref_id))
            .await
    }

    /// Free the object.
    ///
    /// The local reference is zeroed before the release is sent, so nothing
    /// can use it while the release is in flight. Releasing twice is an
    /// error.
    pub async fn release(&self) -> Result<(), BridgeError> {
        let raw = self.ref_id.swap(0, Ordering::AcqRel);
        if raw == 0 {
            return Err(BridgeError::DeadHandle {
                class: self.class.name(),
            });
        }

        let mut message = CallMessage::new(FREE_FUNCTION);
        message.class_tag = Some(self.class.name().to_string());
        message.ref_id = Some(RefId::from_raw(raw));
        self.bridge.dispatch(message).await.map(|_| ())
    }
}

impl<C: NativeClass> fmt::Debug for NativeHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeHandle")
            .field("class", &self.class)
            .field("ref_id", &self.ref_id())
            .finish()
    }
}

//! Caller-side call construction and results.

use crate::domain::buffer::SharedBuffer;
use crate::domain::class::NativeClass;
use crate::domain::wire::{CallMessage, WireValue};
use crate::error::BridgeError;
use crate::handle::NativeHandle;
use sc_01_handle_registry::RefId;
use std::collections::BTreeMap;

/// An argument before marshaling.
#[derive(Debug, Clone)]
pub enum Arg {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    /// Owned bytes, moved into the message.
    Bytes(Vec<u8>),
    /// Shared bytes: copied, or moved if listed for transfer.
    Buffer(SharedBuffer),
    Handle {
        ref_id: RefId,
        class_tag: &'static str,
    },
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Arg::Bool(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Arg::Int(i64::from(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<Vec<u8>> for Arg {
    fn from(value: Vec<u8>) -> Self {
        Arg::Bytes(value)
    }
}

impl From<&[u8]> for Arg {
    fn from(value: &[u8]) -> Self {
        Arg::Bytes(value.to_vec())
    }
}

impl From<SharedBuffer> for Arg {
    fn from(value: SharedBuffer) -> Self {
        Arg::Buffer(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum RequestTarget<C> {
    Free,
    Static(C),
    Instance(C, RefId),
}

/// Builder for one bridge call.
#[derive(Debug, Clone)]
pub struct CallRequest<C: NativeClass> {
    function: String,
    target: RequestTarget<C>,
    args: Vec<Arg>,
    transfer: Vec<usize>,
    preload: BTreeMap<String, String>,
    release_immediately: bool,
    returns: Option<C>,
}

impl<C: NativeClass> CallRequest<C> {
    /// Call a module-level function.
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            function: name.into(),
            target: RequestTarget::Free,
            args: Vec::new(),
            transfer: Vec::new(),
            preload: BTreeMap::new(),
            release_immediately: false,
            returns: None,
        }
    }

    /// Address a static function of `class`.
    pub fn static_on(mut self, class: C) -> Self {
        self.target = RequestTarget::Static(class);
        self
    }

    pub(crate) fn on_instance(mut self, class: C, ref_id: RefId) -> Self {
        self.target = RequestTarget::Instance(class, ref_id);
        self
    }

    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Pass a handle. A released handle fails the call before it is sent.
    pub fn handle(mut self, handle: &NativeHandle<C>) -> Self {
        self.args.push(handle.as_arg());
        self
    }

    /// Pass a buffer by move. The buffer is detached once the call is sent.
    pub fn transfer(mut self, buffer: SharedBuffer) -> Self {
        self.transfer.push(self.args.len());
        self.args.push(Arg::Buffer(buffer));
        self
    }

    /// Run zero-argument `accessor` on an object result and attach its
    /// value under `key`.
    pub fn preload(mut self, key: impl Into<String>, accessor: impl Into<String>) -> Self {
        self.preload.insert(key.into(), accessor.into());
        self
    }

    /// Free an object result right after preloading.
    pub fn release_immediately(mut self) -> Self {
        self.release_immediately = true;
        self
    }

    /// Declare the class of an object result.
    pub fn returns(mut self, class: C) -> Self {
        self.returns = Some(class);
        self
    }

    pub fn function_name(&self) -> &str {
        &self.function
    }

    pub(crate) fn declared_result(&self) -> Option<C> {
        self.returns
    }

    /// Marshal into a message. Transferred buffers are detached here.
    pub fn into_message(self) -> Result<CallMessage, BridgeError> {
        let mut message = CallMessage::new(self.function);

        match self.target {
            RequestTarget::Free => {}
            RequestTarget::Static(class) => {
                message.class_tag = Some(class.name().to_string());
                message.is_static_call = true;
            }
            RequestTarget::Instance(class, ref_id) => {
                if !ref_id.is_live() {
                    return Err(BridgeError::DeadHandle { class: class.name() });
                }
                message.class_tag = Some(class.name().to_string());
                message.ref_id = Some(ref_id);
            }
        }

        let mut args = Vec::with_capacity(self.args.len());
        for (index, arg) in self.args.into_iter().enumerate() {
            let value = match arg {
                Arg::Null => WireValue::Null,
                Arg::Bool(b) => WireValue::Bool(b),
                Arg::Int(n) => WireValue::Int(n),
                Arg::Str(s) => WireValue::Str(s),
                Arg::Bytes(bytes) => WireValue::Bytes(bytes),
                Arg::Buffer(buffer) if self.transfer.contains(&index) => {
                    WireValue::Bytes(buffer.detach()?)
                }
                Arg::Buffer(buffer) => WireValue::Bytes(buffer.read()?),
                Arg::Handle { ref_id, class_tag } => {
                    if !ref_id.is_live() {
                        return Err(BridgeError::DeadHandle { class: class_tag });
                    }
                    WireValue::Handle {
                        ref_id,
                        class_tag: class_tag.to_string(),
                    }
                }
            };
            args.push(value);
        }

        message.args = args;
        message.transfer = self.transfer;
        message.preload = self.preload;
        message.release_immediately = self.release_immediately;
        message.result_class_tag = self.returns.map(|class| class.name().to_string());
        Ok(message)
    }
}

/// Accessor values attached to an object result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preloaded(BTreeMap<String, WireValue>);

impl Preloaded {
    pub fn new(values: BTreeMap<String, WireValue>) -> Self {
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&WireValue> {
        self.0.get(key)
    }

    pub fn take(&mut self, key: &str) -> Result<WireValue, BridgeError> {
        self.0
            .remove(key)
            .ok_or_else(|| BridgeError::UnexpectedResult(format!("no preloaded `{key}`")))
    }

    pub fn take_bytes(&mut self, key: &str) -> Result<Vec<u8>, BridgeError> {
        self.take(key)?
            .into_bytes()
            .ok_or_else(|| BridgeError::UnexpectedResult(format!("preloaded `{key}` is not bytes")))
    }

    pub fn take_string(&mut self, key: &str) -> Result<String, BridgeError> {
        self.take(key)?
            .into_string()
            .ok_or_else(|| BridgeError::UnexpectedResult(format!("preloaded `{key}` is not a string")))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a bridge call.
#[derive(Debug)]
pub enum CallResult<C: NativeClass> {
    Value(WireValue),
    Object {
        /// Dead if the call asked for immediate release.
        handle: NativeHandle<C>,
        preloaded: Preloaded,
    },
}

impl<C: NativeClass> CallResult<C> {
    pub fn into_value(self) -> Result<WireValue, BridgeError> {
        match self {
            CallResult::Value(value) => Ok(value),
            CallResult::Object { handle, .. } => Err(BridgeError::UnexpectedResult(format!(
                "expected a value, got a {} object",
                handle.class()
            ))),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>, BridgeError> {
        match self.into_value()? {
            WireValue::Bytes(bytes) => Ok(bytes),
            other => Err(BridgeError::UnexpectedResult(format!(
                "expected bytes, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_string(self) -> Result<String, BridgeError> {
        match self.into_value()? {
            WireValue::Str(s) => Ok(s),
            other => Err(BridgeError::UnexpectedResult(format!(
                "expected a string, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_int(self) -> Result<i64, BridgeError> {
        match self.into_value()? {
            WireValue::Int(n) => Ok(n),
            other => Err(BridgeError::UnexpectedResult(format!(
                "expected an int, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_object(self) -> Result<(NativeHandle<C>, Preloaded), BridgeError> {
        match self {
            CallResult::Object { handle, preloaded } => Ok((handle, preloaded)),
            CallResult::Value(value) => Err(BridgeError::UnexpectedResult(format!(
                "expected an object, got {}",
                value.kind()
            ))),
        }
    }

    pub fn into_handle(self) -> Result<NativeHandle<C>, BridgeError> {
        self.into_object().map(|(handle, _)| handle)
    }
}

//! The computation module port.

use crate::domain::class::NativeClass;
use crate::domain::fault::BridgeFault;
use crate::domain::wire::WireValue;
use sc_01_handle_registry::{HandleTable, RefId, Tagged};

/// What a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<C> {
    /// Module-level function.
    Free,
    /// Static function of a class.
    Static(C),
    /// Method of a live object. The worker has already checked that
    /// `ref_id` names an object of `class`.
    Instance { class: C, ref_id: RefId },
}

/// Positional arguments with typed accessors.
///
/// Handle arguments have been validated against the handle table before
/// the module sees them.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: Vec<WireValue>,
}

impl Args {
    pub fn new(values: Vec<WireValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&WireValue, BridgeFault> {
        self.values
            .get(index)
            .ok_or_else(|| BridgeFault::invalid_argument(format!("missing argument {index}")))
    }

    pub fn str(&self, index: usize) -> Result<&str, BridgeFault> {
        let value = self.get(index)?;
        value.as_str().ok_or_else(|| mismatch(index, "string", value))
    }

    pub fn bytes(&self, index: usize) -> Result<&[u8], BridgeFault> {
        let value = self.get(index)?;
        value.as_bytes().ok_or_else(|| mismatch(index, "bytes", value))
    }

    /// Move a buffer argument out, leaving an empty one behind.
    pub fn take_bytes(&mut self, index: usize) -> Result<Vec<u8>, BridgeFault> {
        match self.values.get_mut(index) {
            Some(WireValue::Bytes(bytes)) => Ok(std::mem::take(bytes)),
            Some(other) => Err(mismatch(index, "bytes", other)),
            None => Err(BridgeFault::invalid_argument(format!("missing argument {index}"))),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64, BridgeFault> {
        let value = self.get(index)?;
        value.as_int().ok_or_else(|| mismatch(index, "int", value))
    }

    /// Non-negative integer argument.
    pub fn usize(&self, index: usize) -> Result<usize, BridgeFault> {
        let n = self.int(index)?;
        usize::try_from(n).map_err(|_| {
            BridgeFault::invalid_argument(format!("argument {index}: {n} is not a valid size"))
        })
    }

    pub fn handle(&self, index: usize) -> Result<RefId, BridgeFault> {
        match self.get(index)? {
            WireValue::Handle { ref_id, .. } => Ok(*ref_id),
            other => Err(mismatch(index, "handle", other)),
        }
    }
}

fn mismatch(index: usize, expected: &str, found: &WireValue) -> BridgeFault {
    BridgeFault::invalid_argument(format!(
        "argument {index}: expected {expected}, found {}",
        found.kind()
    ))
}

/// One call as seen by the module.
pub struct Invocation<'a, C, O> {
    pub function: &'a str,
    pub target: Target<C>,
    pub args: Args,
    /// Every object the computation context owns.
    pub objects: &'a mut HandleTable<O>,
}

impl<C: NativeClass, O> Invocation<'_, C, O> {
    /// The receiver of an instance call.
    pub fn receiver(&self) -> Result<&O, BridgeFault> {
        match self.target {
            Target::Instance { ref_id, .. } => {
                self.objects.get(ref_id).map_err(BridgeFault::invalid_handle)
            }
            _ => Err(BridgeFault::invalid_argument(format!(
                "`{}` must be called on an object",
                self.function
            ))),
        }
    }

    /// Mutable access to the receiver of an instance call.
    pub fn receiver_mut(&mut self) -> Result<&mut O, BridgeFault> {
        match self.target {
            Target::Instance { ref_id, .. } => {
                self.objects.get_mut(ref_id).map_err(BridgeFault::invalid_handle)
            }
            _ => Err(BridgeFault::invalid_argument(format!(
                "`{}` must be called on an object",
                self.function
            ))),
        }
    }

    /// The object passed as argument `index`.
    pub fn object(&self, index: usize) -> Result<&O, BridgeFault> {
        let ref_id = self.args.handle(index)?;
        self.objects.get(ref_id).map_err(BridgeFault::invalid_handle)
    }

    /// Mutable access to the object passed as argument `index`.
    pub fn object_mut(&mut self, index: usize) -> Result<&mut O, BridgeFault> {
        let ref_id = self.args.handle(index)?;
        self.objects.get_mut(ref_id).map_err(BridgeFault::invalid_handle)
    }
}

/// Result of a module call.
#[derive(Debug)]
pub enum Outcome<O> {
    Value(WireValue),
    /// A new object; the worker stores it and returns a handle.
    Object(O),
}

impl<O> Outcome<O> {
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Outcome::Value(WireValue::Bytes(bytes))
    }

    pub fn string(s: impl Into<String>) -> Self {
        Outcome::Value(WireValue::Str(s.into()))
    }

    pub fn null() -> Self {
        Outcome::Value(WireValue::Null)
    }
}

/// A computation module reachable only through the bridge.
///
/// Runs on the computation context's own thread, one call at a time.
pub trait ComputeModule: Send + 'static {
    /// Closed set of object classes.
    type Class: NativeClass;

    /// Objects this module creates.
    type Object: Tagged<Tag = Self::Class> + Send + 'static;

    /// Run one call. Unknown function names must be reported with
    /// [`BridgeFault::unknown_function`].
    fn invoke(
        &mut self,
        call: Invocation<'_, Self::Class, Self::Object>,
    ) -> Result<Outcome<Self::Object>, BridgeFault>;

    /// Run a zero-argument accessor against a freshly returned object.
    fn accessor(&mut self, object: &Self::Object, name: &str) -> Result<WireValue, BridgeFault>;
}

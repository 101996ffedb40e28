//! Small module used by the bridge's own tests.

use crate::domain::class::NativeClass;
use crate::domain::fault::BridgeFault;
use crate::domain::wire::WireValue;
use crate::ports::module::{ComputeModule, Invocation, Outcome, Target};
use sc_01_handle_registry::Tagged;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Counter,
    Blob,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl NativeClass for Kind {
    fn name(self) -> &'static str {
        match self {
            Kind::Counter => "Counter",
            Kind::Blob => "Blob",
        }
    }

    fn all() -> &'static [Self] {
        &[Kind::Counter, Kind::Blob]
    }
}

pub enum Object {
    Counter(i64),
    Blob,
}

impl Tagged for Object {
    type Tag = Kind;

    fn tag(&self) -> Kind {
        match self {
            Object::Counter(_) => Kind::Counter,
            Object::Blob => Kind::Blob,
        }
    }
}

pub struct TestModule;

impl ComputeModule for TestModule {
    type Class = Kind;
    type Object = Object;

    fn invoke(
        &mut self,
        mut call: Invocation<'_, Kind, Object>,
    ) -> Result<Outcome<Object>, BridgeFault> {
        match (call.target, call.function) {
            (Target::Free, "echo") => Ok(Outcome::Value(call.args.get(0)?.clone())),
            (Target::Free, "boom") => panic!("kaboom"),
            (Target::Free, "new_counter") => Ok(Outcome::Object(Object::Counter(call.args.int(0)?))),
            (Target::Free, "new_blob") => Ok(Outcome::Object(Object::Blob)),
            (Target::Free, "sum_bytes") => {
                let bytes = call.args.take_bytes(0)?;
                Ok(Outcome::Value(WireValue::Int(
                    bytes.iter().map(|b| i64::from(*b)).sum(),
                )))
            }
            (Target::Free, "add") => {
                let delta = call.args.int(1)?;
                match call.object(0)? {
                    Object::Counter(n) => Ok(Outcome::Value(WireValue::Int(n + delta))),
                    Object::Blob => Err(BridgeFault::invalid_argument("not a counter")),
                }
            }
            (Target::Static(Kind::Counter), "zero") => Ok(Outcome::Object(Object::Counter(0))),
            (Target::Instance { .. }, "increment") => match call.receiver_mut()? {
                Object::Counter(n) => {
                    *n += 1;
                    Ok(Outcome::null())
                }
                Object::Blob => Err(BridgeFault::invalid_argument("not a counter")),
            },
            (Target::Instance { .. }, "value") => match call.receiver()? {
                Object::Counter(n) => Ok(Outcome::Value(WireValue::Int(*n))),
                Object::Blob => Err(BridgeFault::invalid_argument("not a counter")),
            },
            (_, name) => Err(BridgeFault::unknown_function(name)),
        }
    }

    fn accessor(&mut self, object: &Object, name: &str) -> Result<WireValue, BridgeFault> {
        match (object, name) {
            (Object::Counter(n), "value") => Ok(WireValue::Int(*n)),
            (Object::Counter(n), "double") => Ok(WireValue::Int(n * 2)),
            (_, name) => Err(BridgeFault::unknown_function(name)),
        }
    }
}

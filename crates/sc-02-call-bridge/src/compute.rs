//! The computation context.
//!
//! A dedicated thread owning the [`ComputeModule`] and its handle table.
//! Call messages are processed strictly one at a time.

use crate::client::Bridge;
use crate::domain::class::{ClassTable, NativeClass};
use crate::domain::fault::{BridgeFault, FaultKind};
use crate::domain::wire::{BridgeResponse, CallMessage, Reply, WireValue};
use crate::error::BridgeError;
use crate::ports::module::{Args, ComputeModule, Invocation, Outcome, Target};
use crate::FREE_FUNCTION;
use sc_01_handle_registry::{HandleTable, RefId, Tagged};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Entry point for starting a computation context.
pub struct ComputeContext;

impl ComputeContext {
    /// Start `module` on its own thread and connect a [`Bridge`] to it.
    ///
    /// Must be called from within a tokio runtime. The context stops once
    /// every clone of the returned bridge (and every handle) is dropped.
    pub fn spawn<M: ComputeModule>(
        module: M,
        capacity: usize,
    ) -> Result<Bridge<M::Class>, BridgeError> {
        let capacity = capacity.max(1);
        let (call_tx, call_rx) = mpsc::channel(capacity);
        let (response_tx, response_rx) = mpsc::channel(capacity);

        let worker = Worker::new(module);
        std::thread::Builder::new()
            .name("compute-context".into())
            .spawn(move || worker.run(call_rx, response_tx))
            .map_err(|e| BridgeError::Startup(e.to_string()))?;

        Ok(Bridge::connect(call_tx, response_rx))
    }
}

struct Worker<M: ComputeModule> {
    module: M,
    objects: HandleTable<M::Object>,
    classes: ClassTable<M::Class>,
}

impl<M: ComputeModule> Worker<M> {
    fn new(module: M) -> Self {
        Self {
            module,
            objects: HandleTable::new(),
            classes: ClassTable::build(),
        }
    }

    fn run(
        mut self,
        mut calls: mpsc::Receiver<CallMessage>,
        responses: mpsc::Sender<BridgeResponse>,
    ) {
        info!(classes = self.classes.len(), "Computation context started");

        while let Some(message) = calls.blocking_recv() {
            let correlation_id = message.correlation_id;
            let function = message.function_name.clone();

            let outcome = self.handle(message);
            match &outcome {
                Ok(_) => debug!(correlation_id = %correlation_id, function = %function, "Call served"),
                Err(fault) => error!(
                    correlation_id = %correlation_id,
                    function = %function,
                    kind = %fault.kind,
                    error = %fault.message,
                    "Call rejected"
                ),
            }

            if responses
                .blocking_send(BridgeResponse::new(correlation_id, outcome))
                .is_err()
            {
                break;
            }
        }

        info!(live_objects = self.objects.len(), "Computation context stopped");
    }

    fn handle(&mut self, message: CallMessage) -> Result<Reply, BridgeFault> {
        let target = self.target(&message)?;

        if message.function_name == FREE_FUNCTION {
            return match target {
                Target::Instance { ref_id, .. } => {
                    self.objects
                        .remove(ref_id)
                        .map_err(BridgeFault::invalid_handle)?;
                    Ok(Reply::Value(WireValue::Null))
                }
                _ => Err(BridgeFault::invalid_argument(
                    "`free` must be called on an object",
                )),
            };
        }

        for value in &message.args {
            if let WireValue::Handle { ref_id, class_tag } = value {
                let class = self.classes.resolve(class_tag)?;
                self.objects
                    .get_tagged(*ref_id, class)
                    .map_err(BridgeFault::invalid_handle)?;
            }
        }

        let CallMessage {
            function_name,
            args,
            preload,
            release_immediately,
            result_class_tag,
            ..
        } = message;

        let invocation = Invocation {
            function: &function_name,
            target,
            args: Args::new(args),
            objects: &mut self.objects,
        };
        let module = &mut self.module;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| module.invoke(invocation)))
            .map_err(panicked)??;

        match outcome {
            Outcome::Value(value) => Ok(Reply::Value(value)),
            Outcome::Object(object) => {
                self.store(object, &preload, release_immediately, result_class_tag.as_deref())
            }
        }
    }

    /// Resolve and validate what the message is addressed to.
    fn target(&self, message: &CallMessage) -> Result<Target<M::Class>, BridgeFault> {
        let Some(tag) = message.class_tag.as_deref() else {
            return match message.ref_id {
                Some(_) => Err(BridgeFault::invalid_argument(
                    "reference id given without a class tag",
                )),
                None => Ok(Target::Free),
            };
        };

        let class = self.classes.resolve(tag)?;
        if message.is_static_call {
            return Ok(Target::Static(class));
        }

        let ref_id = message
            .ref_id
            .filter(|id| id.is_live())
            .ok_or_else(|| {
                BridgeFault::invalid_handle(format!(
                    "`{}` called on a {tag} without a live reference",
                    message.function_name
                ))
            })?;
        self.objects
            .get_tagged(ref_id, class)
            .map_err(BridgeFault::invalid_handle)?;

        Ok(Target::Instance { class, ref_id })
    }

    /// Run preloads, then keep the object or drop it right away.
    fn store(
        &mut self,
        object: M::Object,
        preload: &BTreeMap<String, String>,
        release_immediately: bool,
        declared: Option<&str>,
    ) -> Result<Reply, BridgeFault> {
        let class_tag = object.tag().name().to_string();
        if let Some(declared) = declared {
            if declared != class_tag {
                return Err(BridgeFault::internal(format!(
                    "expected a {declared} result, got a {class_tag}"
                )));
            }
        }

        let mut preloaded = BTreeMap::new();
        for (key, accessor) in preload {
            let module = &mut self.module;
            let value = panic::catch_unwind(AssertUnwindSafe(|| module.accessor(&object, accessor)))
                .map_err(panicked)??;
            preloaded.insert(key.clone(), value);
        }

        let ref_id = if release_immediately {
            drop(object);
            RefId::DEAD
        } else {
            self.objects.insert(object)
        };

        Ok(Reply::Object {
            ref_id,
            class_tag,
            preloaded,
        })
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> BridgeFault {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "native call panicked".to_string()
    };
    BridgeFault::new(FaultKind::Panicked, message)
}

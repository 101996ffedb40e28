//! UI-side endpoint of the bridge.

use crate::domain::class::{ClassTable, NativeClass};
use crate::domain::correlation::CorrelationSequence;
use crate::domain::fault::BridgeFault;
use crate::domain::pending::{PendingCallStore, PendingStats};
use crate::domain::wire::{BridgeResponse, CallMessage, Reply};
use crate::error::BridgeError;
use crate::handle::NativeHandle;
use crate::request::{CallRequest, CallResult, Preloaded};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Inner<C: NativeClass> {
    calls: mpsc::Sender<CallMessage>,
    pending: Arc<PendingCallStore>,
    sequence: CorrelationSequence,
    classes: ClassTable<C>,
}

/// Cloneable handle to the computation context.
pub struct Bridge<C: NativeClass> {
    inner: Arc<Inner<C>>,
}

impl<C: NativeClass> Clone for Bridge<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: NativeClass> std::fmt::Debug for Bridge<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("pending", &self.inner.pending.pending_count())
            .finish()
    }
}

impl<C: NativeClass> Bridge<C> {
    /// Attach to a computation context through its two channels and start
    /// routing responses. Must be called from within a tokio runtime.
    pub fn connect(
        calls: mpsc::Sender<CallMessage>,
        responses: mpsc::Receiver<BridgeResponse>,
    ) -> Self {
        let pending = Arc::new(PendingCallStore::new());
        tokio::spawn(route_responses(responses, Arc::clone(&pending)));

        Self {
            inner: Arc::new(Inner {
                calls,
                pending,
                sequence: CorrelationSequence::new(),
                classes: ClassTable::build(),
            }),
        }
    }

    /// Send a raw message and wait for its reply.
    ///
    /// The message's correlation id is overwritten with a fresh one.
    pub async fn dispatch(&self, mut message: CallMessage) -> Result<Reply, BridgeError> {
        let correlation_id = self.inner.sequence.next_id();
        message.correlation_id = correlation_id;
        let function = message.function_name.clone();

        let receiver = self
            .inner
            .pending
            .register(correlation_id, &function)
            .ok_or_else(|| {
                BridgeError::Fault(BridgeFault::internal(format!(
                    "correlation id {correlation_id} is still in flight"
                )))
            })?;

        if self.inner.calls.send(message).await.is_err() {
            self.inner.pending.cancel(&correlation_id);
            return Err(BridgeError::Disconnected);
        }

        match receiver.await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(fault)) => {
                warn!(
                    correlation_id = %correlation_id,
                    function = %function,
                    kind = %fault.kind,
                    error = %fault.message,
                    "Bridge call rejected"
                );
                Err(BridgeError::Fault(fault))
            }
            Err(_) => Err(BridgeError::Disconnected),
        }
    }

    /// Marshal, send and lift the result of a call.
    pub async fn call(&self, request: CallRequest<C>) -> Result<CallResult<C>, BridgeError> {
        let declared = request.declared_result();
        let message = request.into_message()?;
        let reply = self.dispatch(message).await?;
        self.lift(reply, declared)
    }

    fn lift(&self, reply: Reply, declared: Option<C>) -> Result<CallResult<C>, BridgeError> {
        match reply {
            Reply::Value(value) => Ok(CallResult::Value(value)),
            Reply::Object {
                ref_id,
                class_tag,
                preloaded,
            } => {
                let class = self.inner.classes.resolve(&class_tag)?;
                if let Some(declared) = declared {
                    if declared != class {
                        return Err(BridgeError::UnexpectedResult(format!(
                            "expected a {declared} object, got a {class}"
                        )));
                    }
                }
                Ok(CallResult::Object {
                    handle: NativeHandle::new(self.clone(), class, ref_id),
                    preloaded: Preloaded::new(preloaded),
                })
            }
        }
    }

    /// Number of calls awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.pending_count()
    }

    pub fn stats(&self) -> &PendingStats {
        self.inner.pending.stats()
    }
}

async fn route_responses(
    mut responses: mpsc::Receiver<BridgeResponse>,
    pending: Arc<PendingCallStore>,
) {
    while let Some(response) = responses.recv().await {
        let correlation_id = response.correlation_id;
        pending.complete(correlation_id, response.into_outcome());
    }

    let abandoned = pending.abandon_all();
    debug!(abandoned, "Response router stopped");
}

//! Pending call store.
//!
//! Maps correlation ids to callers suspended on a oneshot receiver.
//!
//! Flow:
//! 1. Caller takes the next correlation id and calls `register()`
//! 2. Caller sends the call message to the computation context
//! 3. The router receives the response and calls `complete()`
//! 4. Caller awaits the receiver

use crate::domain::correlation::CorrelationId;
use crate::domain::fault::BridgeFault;
use crate::domain::wire::Reply;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::debug;

/// Outcome delivered to a waiting caller.
pub type CallOutcome = Result<Reply, BridgeFault>;

struct PendingCall {
    sender: oneshot::Sender<CallOutcome>,
    created_at: Instant,
    function: String,
}

/// Statistics for the pending call store
#[derive(Debug, Default)]
pub struct PendingStats {
    /// Total calls registered
    pub total_registered: AtomicU64,
    /// Total calls completed
    pub total_completed: AtomicU64,
    /// Responses whose correlation id matched nothing in flight
    pub total_stray: AtomicU64,
    /// Calls whose caller stopped waiting
    pub total_abandoned: AtomicU64,
}

/// In-flight calls keyed by correlation id.
#[derive(Default)]
pub struct PendingCallStore {
    pending: DashMap<CorrelationId, PendingCall>,
    stats: PendingStats,
}

impl PendingCallStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a call and get the receiver its outcome will arrive on.
    ///
    /// Returns `None` if `correlation_id` is already in flight.
    pub fn register(
        &self,
        correlation_id: CorrelationId,
        function: &str,
    ) -> Option<oneshot::Receiver<CallOutcome>> {
        let (tx, rx) = oneshot::channel();
        match self.pending.entry(correlation_id) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(slot) => {
                slot.insert(PendingCall {
                    sender: tx,
                    created_at: Instant::now(),
                    function: function.to_string(),
                });
            }
        }
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        debug!(
            correlation_id = %correlation_id,
            function = function,
            "Registered pending call"
        );

        Some(rx)
    }

    /// Resolve a call.
    ///
    /// The first response for an id wins; later duplicates and ids never
    /// registered are dropped. Returns true if a waiting caller received it.
    pub fn complete(&self, correlation_id: CorrelationId, outcome: CallOutcome) -> bool {
        let Some((_, pending)) = self.pending.remove(&correlation_id) else {
            self.stats.total_stray.fetch_add(1, Ordering::Relaxed);
            debug!(
                correlation_id = %correlation_id,
                "Dropping response for unknown correlation id"
            );
            return false;
        };

        let elapsed = pending.created_at.elapsed();
        match pending.sender.send(outcome) {
            Ok(()) => {
                self.stats.total_completed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    function = pending.function,
                    response_time_us = elapsed.as_micros() as u64,
                    "Completed pending call"
                );
                true
            }
            Err(_) => {
                self.stats.total_abandoned.fetch_add(1, Ordering::Relaxed);
                debug!(
                    correlation_id = %correlation_id,
                    function = pending.function,
                    "Caller stopped waiting"
                );
                false
            }
        }
    }

    /// Forget a call whose message never left.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.remove(correlation_id).is_some()
    }

    /// Drop every waiter. Their receivers observe a closed channel.
    pub fn abandon_all(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Get number of calls in flight
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, correlation_id: &CorrelationId) -> bool {
        self.pending.contains_key(correlation_id)
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::wire::WireValue;

    fn id(raw: u64) -> CorrelationId {
        CorrelationId::from_raw(raw)
    }

    #[tokio::test]
    async fn test_register_and_complete() {
        let store = PendingCallStore::new();
        let rx = store.register(id(1), "ping").unwrap();
        assert_eq!(store.pending_count(), 1);

        assert!(store.complete(id(1), Ok(Reply::Value(WireValue::Int(7)))));
        assert_eq!(rx.await.unwrap().unwrap(), Reply::Value(WireValue::Int(7)));
        assert_eq!(store.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_first_response_wins() {
        let store = PendingCallStore::new();
        let rx = store.register(id(2), "ping").unwrap();

        assert!(store.complete(id(2), Ok(Reply::Value(WireValue::Int(1)))));
        assert!(!store.complete(id(2), Ok(Reply::Value(WireValue::Int(2)))));

        assert_eq!(rx.await.unwrap().unwrap(), Reply::Value(WireValue::Int(1)));
        assert_eq!(store.stats().total_stray.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_stray_id_ignored() {
        let store = PendingCallStore::new();
        assert!(!store.complete(id(99), Ok(Reply::Value(WireValue::Null))));
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let store = PendingCallStore::new();
        let _rx = store.register(id(3), "a").unwrap();
        assert!(store.register(id(3), "b").is_none());
    }

    #[test]
    fn test_abandoned_caller() {
        let store = PendingCallStore::new();
        drop(store.register(id(4), "slow").unwrap());
        assert!(!store.complete(id(4), Ok(Reply::Value(WireValue::Null))));
        assert_eq!(store.stats().total_abandoned.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_cancel() {
        let store = PendingCallStore::new();
        let _rx = store.register(id(5), "x").unwrap();
        assert!(store.cancel(&id(5)));
        assert!(!store.is_pending(&id(5)));
    }
}

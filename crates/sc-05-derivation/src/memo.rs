//! Single-flight memo table.
//!
//! Each key owns a [`OnceCell`]. The first caller runs the computation, every
//! concurrent caller with the same key awaits that same run, and later
//! callers read the stored value. A failed run stores nothing: its caller gets
//! the error and the next caller for that key starts over.
//!
//! Arguments routinely include passwords, so the table is indexed by a keyed
//! BLAKE3 digest of the canonical key and only the function name is logged.
//! The digest key is drawn per table and never leaves it.
//!
//! Entries are never evicted.

use crate::error::DerivationError;
use dashmap::DashMap;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, trace};
use zeroize::Zeroizing;

/// Statistics for a memo table
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from a stored value
    pub hits: AtomicU64,
    /// Computations started
    pub dispatches: AtomicU64,
    /// Computations that failed
    pub failures: AtomicU64,
}

/// `function` applied to `args`, in canonical form.
pub struct CacheKey {
    function: String,
    canonical: Zeroizing<String>,
}

impl CacheKey {
    pub fn new(function: &str, args: &[Value]) -> Result<Self, DerivationError> {
        let canonical = serde_json::to_string(&(function, args))
            .map_err(|e| DerivationError::Key(e.to_string()))?;
        Ok(Self {
            function: function.to_string(),
            canonical: Zeroizing::new(canonical),
        })
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    fn canonical(&self) -> &[u8] {
        self.canonical.as_bytes()
    }
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheKey")
            .field("function", &self.function)
            .finish_non_exhaustive()
    }
}

/// Memoized results of one value type.
pub struct Memo<T> {
    digest_key: Zeroizing<[u8; 32]>,
    entries: DashMap<String, Arc<OnceCell<T>>>,
    stats: CacheStats,
}

impl<T> Default for Memo<T> {
    fn default() -> Self {
        Self {
            digest_key: Zeroizing::new(rand::random()),
            entries: DashMap::new(),
            stats: CacheStats::default(),
        }
    }
}

impl<T: Clone> Memo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn digest(&self, key: &CacheKey) -> String {
        blake3::keyed_hash(&self.digest_key, key.canonical())
            .to_hex()
            .to_string()
    }

    /// Return the value stored under `key`, computing it with `compute` if
    /// no run has succeeded yet.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<T, DerivationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DerivationError>>,
    {
        let function = key.function();
        // The map guard must not live across the await below.
        let cell = Arc::clone(self.entries.entry(self.digest(&key)).or_default().value());

        if let Some(value) = cell.get() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            trace!(function, "Derivation cache hit");
            return Ok(value.clone());
        }

        let value = cell
            .get_or_try_init(|| {
                self.stats.dispatches.fetch_add(1, Ordering::Relaxed);
                debug!(function, "Derivation cache miss");
                compute()
            })
            .await
            .inspect_err(|e| {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                debug!(function, error = %e, "Derivation failed");
            })?;
        Ok(value.clone())
    }

    /// Whether a value is stored under `key`.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .get(&self.digest(key))
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}

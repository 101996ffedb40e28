//! The entropy pool.

use crate::event::{InputEvent, Position};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Default pool size in bytes.
pub const DEFAULT_POOL_SIZE: usize = 1024;

/// Errors from entropy collector construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EntropyError {
    /// A pool needs at least one byte.
    #[error("entropy pool must hold at least one byte")]
    EmptyPool,
}

struct Pool {
    data: Vec<u8>,
    cursor: usize,
    last_time: Instant,
    last_position: Position,
    samples: u64,
}

impl Pool {
    fn mix(&mut self, value: i64) {
        self.data[self.cursor] ^= value as u8;
        self.cursor = (self.cursor + 1) % self.data.len();
        self.samples += 1;
    }

    fn mix_position(&mut self, position: Position) {
        self.mix(self.last_position.x.wrapping_sub(position.x));
        self.mix(self.last_position.y.wrapping_sub(position.y));
        self.last_position = position;
    }
}

/// Signed nanoseconds from `earlier` to `later`.
fn signed_nanos(later: Instant, earlier: Instant) -> i64 {
    match later.checked_duration_since(earlier) {
        Some(elapsed) => elapsed.as_nanos() as i64,
        None => -(earlier.duration_since(later).as_nanos() as i64),
    }
}

/// Process-wide entropy pool.
///
/// Share it as `Arc<EntropyCollector>`; every method takes `&self`.
pub struct EntropyCollector {
    pool: Mutex<Pool>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl EntropyCollector {
    /// Create a pool of `size` bytes.
    pub fn new(size: usize) -> Result<Self, EntropyError> {
        if size == 0 {
            return Err(EntropyError::EmptyPool);
        }
        Ok(Self::with_pool_size(size))
    }

    fn with_pool_size(size: usize) -> Self {
        let last_position = Position::new(
            i64::from(rand::random::<u16>()),
            i64::from(rand::random::<u16>()),
        );
        Self {
            pool: Mutex::new(Pool {
                data: vec![0; size],
                cursor: 0,
                last_time: Instant::now(),
                last_position,
                samples: 0,
            }),
            listener: Mutex::new(None),
        }
    }

    /// XOR the low byte of `value` into the pool at the cursor and advance.
    pub fn register(&self, value: i64) {
        self.pool.lock().mix(value);
    }

    /// Mix an input event: its delay since the previous event, then the
    /// movement of the pointer and of each touch point.
    ///
    /// An event stamped at the same instant as the previous one is ignored.
    /// Returns whether anything was mixed.
    pub fn observe(&self, event: &InputEvent) -> bool {
        let mut pool = self.pool.lock();
        let delay = signed_nanos(event.at, pool.last_time);
        if delay == 0 {
            return false;
        }

        pool.last_time = event.at;
        pool.mix(delay);
        if let Some(screen) = event.screen {
            pool.mix_position(screen);
        }
        for touch in &event.touches {
            pool.mix_position(*touch);
        }
        true
    }

    /// Mix a timing sample taken now.
    pub fn ping(&self) {
        self.observe(&InputEvent::now());
    }

    /// Copy of the pool. The pool itself keeps accumulating.
    pub fn export(&self) -> Vec<u8> {
        self.pool.lock().data.clone()
    }

    /// [`export`](Self::export), base64 encoded.
    pub fn export_base64(&self) -> String {
        STANDARD.encode(self.export())
    }

    /// Pool size in bytes.
    pub fn size(&self) -> usize {
        self.pool.lock().data.len()
    }

    /// Number of values mixed so far.
    pub fn samples(&self) -> u64 {
        self.pool.lock().samples
    }

    /// Feed every event from `events` into the pool on a background task.
    ///
    /// A listener that is already running is stopped first. The task ends
    /// when the sender side closes or the collector is dropped.
    pub fn start(self: &Arc<Self>, mut events: mpsc::Receiver<InputEvent>) {
        self.stop();

        let collector: Weak<Self> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(collector) = collector.upgrade() else {
                    break;
                };
                if collector.observe(&event) {
                    trace!("Input event mixed into entropy pool");
                }
            }
            debug!("Entropy listener finished");
        });

        *self.listener.lock() = Some(handle);
        debug!("Entropy listener started");
    }

    /// Stop the background listener. Returns false if none was running.
    pub fn stop(&self) -> bool {
        match self.listener.lock().take() {
            Some(handle) => {
                handle.abort();
                debug!("Entropy listener stopped");
                true
            }
            None => false,
        }
    }

    /// Whether a listener task is running.
    pub fn is_listening(&self) -> bool {
        self.listener
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Default for EntropyCollector {
    fn default() -> Self {
        Self::with_pool_size(DEFAULT_POOL_SIZE)
    }
}

impl Drop for EntropyCollector {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.get_mut().take() {
            handle.abort();
        }
    }
}

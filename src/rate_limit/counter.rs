//! Keyed counters with expiry.

use crate::song_cache::{CacheBackend, CacheResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Number of tracked keys above which expired windows are swept.
const SWEEP_THRESHOLD: usize = 10_000;

/// Counts attempts per key within fixed windows.
pub trait AttemptCounter: Send + Sync {
    /// Adds one attempt for `key` and returns the count in the current
    /// window. A new window of length `window` starts at the first attempt.
    fn increment(&self, key: &str, window: Duration) -> CacheResult<u64>;
}

#[derive(Default)]
pub struct MemoryAttemptCounter {
    windows: Mutex<HashMap<String, (u64, Instant)>>,
}

impl MemoryAttemptCounter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AttemptCounter for MemoryAttemptCounter {
    fn increment(&self, key: &str, window: Duration) -> CacheResult<u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        if windows.len() > SWEEP_THRESHOLD {
            windows.retain(|_, (_, expires_at)| *expires_at > now);
        }
        let entry = windows
            .entry(key.to_string())
            .or_insert((0, now + window));
        if entry.1 <= now {
            *entry = (0, now + window);
        }
        entry.0 += 1;
        Ok(entry.0)
    }
}

/// Counter stored in the cache backend, shared by every server using it.
pub struct CacheAttemptCounter {
    backend: Arc<dyn CacheBackend>,
}

impl CacheAttemptCounter {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        CacheAttemptCounter { backend }
    }
}

impl AttemptCounter for CacheAttemptCounter {
    fn increment(&self, key: &str, window: Duration) -> CacheResult<u64> {
        let count = self.backend.incr_with_expiry(key, window)?;
        Ok(count.max(0) as u64)
    }
}

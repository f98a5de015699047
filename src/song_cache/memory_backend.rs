//! In-process cache backend.

use super::backend::{CacheBackend, CacheBatch, CacheError, CacheOp, CacheResult};
use std::cmp::Ordering as CmpOrdering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Number of live counters above which expired ones are swept.
const COUNTER_SWEEP_THRESHOLD: usize = 10_000;

#[derive(Default)]
struct MemoryState {
    strings: HashMap<String, String>,
    sorted_sets: HashMap<String, HashMap<String, f64>>,
    counters: HashMap<String, (i64, Instant)>,
}

impl MemoryState {
    fn delete(&mut self, key: &str) {
        self.strings.remove(key);
        self.sorted_sets.remove(key);
        self.counters.remove(key);
    }

    fn apply(&mut self, op: &CacheOp) {
        match op {
            CacheOp::Set { key, value } => {
                self.delete(key);
                self.strings.insert(key.clone(), value.clone());
            }
            CacheOp::Delete { key } => self.delete(key),
            CacheOp::ZAdd { key, member, score } => {
                self.sorted_sets
                    .entry(key.clone())
                    .or_default()
                    .insert(member.clone(), *score);
            }
        }
    }
}

/// Single-node cache living in the server process.
///
/// The whole state sits behind one lock, so every batch is atomic with
/// respect to readers. [`MemoryCacheBackend::set_reachable`] simulates an
/// outage: while unreachable every call fails with
/// [`CacheError::Unavailable`].
pub struct MemoryCacheBackend {
    state: Mutex<MemoryState>,
    reachable: AtomicBool,
}

impl Default for MemoryCacheBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        MemoryCacheBackend {
            state: Mutex::new(MemoryState::default()),
            reachable: AtomicBool::new(true),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    fn check_reachable(&self) -> CacheResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CacheError::Unavailable(
                "memory cache is switched offline".to_string(),
            ))
        }
    }
}

impl CacheBackend for MemoryCacheBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn ping(&self) -> CacheResult<()> {
        self.check_reachable()
    }

    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(state.strings.get(key).cloned())
    }

    fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        Ok(keys.iter().map(|k| state.strings.get(k).cloned()).collect())
    }

    fn zrevrange_all(&self, key: &str) -> CacheResult<Vec<String>> {
        self.check_reachable()?;
        let state = self.state.lock().unwrap();
        let Some(set) = state.sorted_sets.get(key) else {
            return Ok(vec![]);
        };
        let mut members: Vec<(&String, f64)> = set.iter().map(|(m, s)| (m, *s)).collect();
        members.sort_by(|(m1, s1), (m2, s2)| {
            s2.partial_cmp(s1)
                .unwrap_or(CmpOrdering::Equal)
                .then_with(|| m2.cmp(m1))
        });
        Ok(members.into_iter().map(|(m, _)| m.clone()).collect())
    }

    fn execute(&self, batch: &CacheBatch) -> CacheResult<()> {
        self.check_reachable()?;
        let mut state = self.state.lock().unwrap();
        for op in batch.ops() {
            state.apply(op);
        }
        Ok(())
    }

    fn incr_with_expiry(&self, key: &str, ttl: Duration) -> CacheResult<i64> {
        self.check_reachable()?;
        let now = Instant::now();
        let mut state = self.state.lock().unwrap();
        if state.counters.len() > COUNTER_SWEEP_THRESHOLD {
            state.counters.retain(|_, (_, expires_at)| *expires_at > now);
        }
        let entry = state
            .counters
            .entry(key.to_string())
            .or_insert((0, now + ttl));
        if entry.1 <= now {
            *entry = (0, now + ttl);
        }
        entry.0 += 1;
        Ok(entry.0)
    }
}

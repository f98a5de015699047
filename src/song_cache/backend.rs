//! Cache backend abstraction.
//!
//! A backend speaks a small subset of the Redis data model: string keys,
//! sorted sets and expiring counters. Writes that must land together are
//! grouped in a [`CacheBatch`] and applied atomically.

use super::memory_backend::MemoryCacheBackend;
use super::redis_backend::RedisCacheBackend;
use crate::config::{CacheBackendKind, CacheSettings};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Cache command failed: {0}")]
    Command(String),

    #[error("Failed to encode or decode cache entry: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug, Clone, PartialEq)]
pub enum CacheOp {
    Set { key: String, value: String },
    Delete { key: String },
    ZAdd { key: String, member: String, score: f64 },
}

/// Ordered list of writes applied as one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheBatch {
    ops: Vec<CacheOp>,
}

impl CacheBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) -> &mut Self {
        self.ops.push(CacheOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete<K: Into<String>>(&mut self, key: K) -> &mut Self {
        self.ops.push(CacheOp::Delete { key: key.into() });
        self
    }

    pub fn zadd<K: Into<String>, M: Into<String>>(
        &mut self,
        key: K,
        member: M,
        score: f64,
    ) -> &mut Self {
        self.ops.push(CacheOp::ZAdd {
            key: key.into(),
            member: member.into(),
            score,
        });
        self
    }

    pub fn ops(&self) -> &[CacheOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

pub trait CacheBackend: Send + Sync {
    /// Short name reported by the status endpoint.
    fn name(&self) -> &'static str;

    fn ping(&self) -> CacheResult<()>;

    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Values for `keys`, positionally, `None` where a key is missing.
    fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>>;

    /// All members of a sorted set, highest score first.
    ///
    /// Members with equal scores come back in reverse lexicographic order.
    fn zrevrange_all(&self, key: &str) -> CacheResult<Vec<String>>;

    fn execute(&self, batch: &CacheBatch) -> CacheResult<()>;

    /// Increments the counter at `key`, creating it with a lifetime of `ttl`
    /// when absent. Returns the value after the increment.
    fn incr_with_expiry(&self, key: &str, ttl: Duration) -> CacheResult<i64>;
}

/// Opens the configured cache backend and checks that it answers.
///
/// Returns `None` when caching is disabled or the backend can't be reached;
/// the caller then runs without a cache for the lifetime of the process.
pub fn connect_cache(settings: &CacheSettings) -> Option<Arc<dyn CacheBackend>> {
    let backend: Arc<dyn CacheBackend> = match settings.backend {
        CacheBackendKind::Disabled => {
            info!("Song cache disabled, serving from the database only");
            return None;
        }
        CacheBackendKind::Memory => Arc::new(MemoryCacheBackend::new()),
        CacheBackendKind::Redis => match RedisCacheBackend::open(
            &settings.url,
            settings.connect_timeout,
            settings.command_timeout,
        ) {
            Ok(backend) => Arc::new(backend),
            Err(err) => {
                warn!(
                    "Invalid cache url {}: {}. Running without cache",
                    settings.url, err
                );
                return None;
            }
        },
    };

    match backend.ping() {
        Ok(()) => {
            info!("Connected to {} song cache", backend.name());
            Some(backend)
        }
        Err(err) => {
            warn!(
                "Song cache at {} unreachable: {}. Running without cache",
                settings.url, err
            );
            None
        }
    }
}

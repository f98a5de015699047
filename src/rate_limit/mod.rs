//! Fixed-window limit on rating submissions.
//!
//! Attempts are counted per (identity, song) pair, whether or not the
//! submitted rating turns out to be valid.

mod counter;

pub use counter::{AttemptCounter, CacheAttemptCounter, MemoryAttemptCounter};

use crate::config::RateLimitSettings;
use crate::song_cache::CacheBackend;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Identity used when the client address is unknown.
pub const ANONYMOUS_IDENTITY: &str = "anonymous";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Rate limit exceeded. Please wait before rating this song again.")]
pub struct RateLimited;

pub fn rate_limit_key(identity: &str, song_id: &str) -> String {
    format!("rate_limit:{}:{}", identity, song_id)
}

#[derive(Clone)]
pub struct RatingRateLimiter {
    counter: Arc<dyn AttemptCounter>,
    max_attempts: u64,
    window: Duration,
}

impl RatingRateLimiter {
    pub fn new(counter: Arc<dyn AttemptCounter>, settings: &RateLimitSettings) -> Self {
        RatingRateLimiter {
            counter,
            max_attempts: settings.max_attempts,
            window: settings.window,
        }
    }

    /// Counter in the cache backend if there is one, else in process memory.
    pub fn for_backend(
        backend: Option<Arc<dyn CacheBackend>>,
        settings: &RateLimitSettings,
    ) -> Self {
        let counter: Arc<dyn AttemptCounter> = match backend {
            Some(backend) => Arc::new(CacheAttemptCounter::new(backend)),
            None => Arc::new(MemoryAttemptCounter::new()),
        };
        Self::new(counter, settings)
    }

    /// Records an attempt and checks it against the limit.
    ///
    /// A failing counter lets the attempt through.
    pub fn check(&self, identity: &str, song_id: &str) -> Result<(), RateLimited> {
        let key = rate_limit_key(identity, song_id);
        match self.counter.increment(&key, self.window) {
            Ok(count) if count > self.max_attempts => {
                debug!("{} over the limit ({} attempts)", key, count);
                Err(RateLimited)
            }
            Ok(_) => Ok(()),
            Err(err) => {
                warn!("Rate limit counter unavailable, allowing attempt: {}", err);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song_cache::MemoryCacheBackend;

    fn settings(max_attempts: u64) -> RateLimitSettings {
        RateLimitSettings {
            max_attempts,
            window: Duration::from_secs(60),
        }
    }

    #[test]
    fn eleventh_attempt_is_limited() {
        let limiter = RatingRateLimiter::for_backend(None, &settings(10));
        for _ in 0..10 {
            assert_eq!(limiter.check("1.2.3.4", "s1"), Ok(()));
        }
        assert_eq!(limiter.check("1.2.3.4", "s1"), Err(RateLimited));
        assert_eq!(limiter.check("1.2.3.4", "s2"), Ok(()));
        assert_eq!(limiter.check("5.6.7.8", "s1"), Ok(()));
    }

    #[test]
    fn cache_backed_limiter_shares_counters() {
        let backend: Arc<dyn CacheBackend> = Arc::new(MemoryCacheBackend::new());
        let first = RatingRateLimiter::for_backend(Some(backend.clone()), &settings(2));
        let second = RatingRateLimiter::for_backend(Some(backend.clone()), &settings(2));

        assert!(first.check(ANONYMOUS_IDENTITY, "s1").is_ok());
        assert!(second.check(ANONYMOUS_IDENTITY, "s1").is_ok());
        assert!(first.check(ANONYMOUS_IDENTITY, "s1").is_err());
        assert!(second.check(ANONYMOUS_IDENTITY, "s2").is_ok());
    }

    #[test]
    fn failing_counter_fails_open() {
        let backend = Arc::new(MemoryCacheBackend::new());
        backend.set_reachable(false);
        let limiter = RatingRateLimiter::for_backend(Some(backend), &settings(1));
        for _ in 0..5 {
            assert!(limiter.check("ip", "s1").is_ok());
        }
    }
}

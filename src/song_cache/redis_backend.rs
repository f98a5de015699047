//! Redis cache backend.

use super::backend::{CacheBackend, CacheBatch, CacheError, CacheOp, CacheResult};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if is_connection_error(&err) {
            CacheError::Unavailable(err.to_string())
        } else {
            CacheError::Command(err.to_string())
        }
    }
}

fn is_connection_error(err: &redis::RedisError) -> bool {
    err.is_io_error()
        || err.is_timeout()
        || err.is_connection_dropped()
        || err.is_connection_refusal()
}

/// Redis-backed cache using one synchronous connection.
///
/// The connection is opened lazily and dropped after any connection level
/// failure; the next command reconnects, waiting at most the connect timeout.
pub struct RedisCacheBackend {
    client: redis::Client,
    connection: Mutex<Option<redis::Connection>>,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl RedisCacheBackend {
    pub fn open(
        url: &str,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(RedisCacheBackend {
            client,
            connection: Mutex::new(None),
            connect_timeout,
            command_timeout,
        })
    }

    fn connect(&self) -> CacheResult<redis::Connection> {
        debug!("Opening redis connection");
        let conn = self
            .client
            .get_connection_with_timeout(self.connect_timeout)?;
        conn.set_read_timeout(Some(self.command_timeout))?;
        conn.set_write_timeout(Some(self.command_timeout))?;
        Ok(conn)
    }

    fn with_connection<T, F>(&self, f: F) -> CacheResult<T>
    where
        F: FnOnce(&mut redis::Connection) -> redis::RedisResult<T>,
    {
        let mut guard = self.connection.lock().unwrap();
        let mut conn = match guard.take() {
            Some(conn) => conn,
            None => self.connect()?,
        };
        match f(&mut conn) {
            Ok(value) => {
                *guard = Some(conn);
                Ok(value)
            }
            Err(err) => {
                if is_connection_error(&err) {
                    warn!("Dropping redis connection after error: {}", err);
                } else {
                    *guard = Some(conn);
                }
                Err(err.into())
            }
        }
    }
}

impl CacheBackend for RedisCacheBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn ping(&self) -> CacheResult<()> {
        self.with_connection(|conn| redis::cmd("PING").query::<String>(conn))?;
        Ok(())
    }

    fn get(&self, key: &str) -> CacheResult<Option<String>> {
        self.with_connection(|conn| redis::cmd("GET").arg(key).query(conn))
    }

    fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(vec![]);
        }
        self.with_connection(|conn| redis::cmd("MGET").arg(keys).query(conn))
    }

    fn zrevrange_all(&self, key: &str) -> CacheResult<Vec<String>> {
        self.with_connection(|conn| {
            redis::cmd("ZREVRANGE")
                .arg(key)
                .arg(0)
                .arg(-1)
                .query(conn)
        })
    }

    fn execute(&self, batch: &CacheBatch) -> CacheResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in batch.ops() {
            match op {
                CacheOp::Set { key, value } => {
                    pipe.cmd("SET").arg(key).arg(value).ignore();
                }
                CacheOp::Delete { key } => {
                    pipe.cmd("DEL").arg(key).ignore();
                }
                CacheOp::ZAdd { key, member, score } => {
                    pipe.cmd("ZADD").arg(key).arg(*score).arg(member).ignore();
                }
            }
        }
        self.with_connection(|conn| pipe.query::<()>(conn))
    }

    fn incr_with_expiry(&self, key: &str, ttl: Duration) -> CacheResult<i64> {
        let ttl_secs = ttl.as_secs().max(1);
        let (count,): (i64,) = self.with_connection(|conn| {
            redis::pipe()
                .atomic()
                .cmd("SET")
                .arg(key)
                .arg(0)
                .arg("NX")
                .arg("EX")
                .arg(ttl_secs)
                .ignore()
                .cmd("INCR")
                .arg(key)
                .query(conn)
        })?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_url_is_rejected() {
        assert!(RedisCacheBackend::open(
            "http://example.com",
            Duration::from_millis(100),
            Duration::from_millis(100)
        )
        .is_err());
    }

    #[test]
    fn unreachable_server_reports_unavailable() {
        let backend = RedisCacheBackend::open(
            "redis://127.0.0.1:1/",
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
        .unwrap();
        assert!(matches!(backend.ping(), Err(CacheError::Unavailable(_))));
        // Failed connects leave nothing behind and are retried.
        assert!(matches!(
            backend.get("song:1"),
            Err(CacheError::Unavailable(_))
        ));
    }
}

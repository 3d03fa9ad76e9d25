//! Redis-backed store
//!
//! Holds a single multiplexed async connection; each operation clones the
//! handle (cheap, shares the underlying socket) and issues one command.
//! TTLs are applied with millisecond precision (`PX` / `PEXPIRE`).

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::{KvStore, StoreFuture};

/// Store client backed by a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
}

impl RedisStore {
    /// Open a client for `url` and establish the multiplexed connection.
    ///
    /// Accepts `redis://`, `rediss://` and `unix://` URLs. The URL may carry
    /// credentials, so it is never logged.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Connection(format!("invalid redis url: {e}")))?;
        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::Connection(format!("failed to connect to redis: {e}")))?;
        info!("connected to redis");
        Ok(Self { connection })
    }
}

/// Escape glob metacharacters so a literal prefix can be used in a KEYS pattern.
fn glob_escape(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 2);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn ttl_millis(ttl: Duration) -> u64 {
    // PX 0 is rejected by Redis
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 100;

impl KvStore for RedisStore {
    fn id(&self) -> &str {
        "redis"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let mut con = self.connection.clone();
            let value: Option<String> = con.get(key).await?;
            Ok(value)
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut con = self.connection.clone();
            let mut cmd = redis::cmd("SET");
            cmd.arg(key).arg(value);
            if let Some(ttl) = ttl {
                cmd.arg("PX").arg(ttl_millis(ttl));
            }
            cmd.query_async::<()>(&mut con).await?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut con = self.connection.clone();
            let removed: i64 = con.del(key).await?;
            Ok(removed > 0)
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            let mut con = self.connection.clone();
            let present: bool = con.exists(key).await?;
            Ok(present)
        })
    }

    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut con = self.connection.clone();
            let pattern = format!("{}*", glob_escape(prefix));

            // Cursor-based SCAN; batches may repeat keys.
            let mut keys = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut con)
                    .await?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            keys.sort_unstable();
            keys.dedup();

            debug!(pattern = %pattern, count = keys.len(), "enumerated keys");
            Ok(keys)
        })
    }

    fn hget<'a>(&'a self, key: &'a str, field: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            let mut con = self.connection.clone();
            let value: Option<String> = con.hget(key, field).await?;
            Ok(value)
        })
    }

    fn hset<'a>(
        &'a self,
        key: &'a str,
        field: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut con = self.connection.clone();
            match ttl {
                None => {
                    con.hset::<_, _, _, ()>(key, field, value).await?;
                }
                Some(ttl) => {
                    redis::pipe()
                        .atomic()
                        .cmd("HSET")
                        .arg(key)
                        .arg(field)
                        .arg(value)
                        .ignore()
                        .cmd("PEXPIRE")
                        .arg(key)
                        .arg(ttl_millis(ttl))
                        .ignore()
                        .query_async::<()>(&mut con)
                        .await?;
                }
            }
            Ok(())
        })
    }
}

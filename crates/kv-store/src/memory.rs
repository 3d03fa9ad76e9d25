//! In-process store with per-key expiry
//!
//! Mirrors the Redis semantics the gateway relies on: plain values and hashes
//! live in one keyspace, a key holds one type at a time, and expired keys
//! behave as absent. Single-key operations drop the key they touch if it has
//! expired; a full sweep only runs when enumerating (`keys_with_prefix`,
//! `len`).
//!
//! `set_unavailable(true)` makes every call fail with `Error::Connection`,
//! which lets callers exercise their store-outage paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Error, Result};
use crate::{KvStore, StoreFuture};

const WRONG_TYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug, Clone)]
enum Value {
    Plain(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Thread-safe in-memory keyspace.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: while set, every operation returns a connection error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        purge_expired(&mut entries);
        entries.len()
    }

    /// Whether the store holds no live keys.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(Error::Connection("memory store marked unavailable".into()));
        }
        Ok(())
    }
}

fn purge_expired(entries: &mut HashMap<String, Entry>) {
    let now = Instant::now();
    let before = entries.len();
    entries.retain(|_, entry| entry.is_live(now));
    let purged = before - entries.len();
    if purged > 0 {
        debug!(purged, "purged expired keys");
    }
}

/// Drop `key` if it has expired, leaving every other entry alone.
fn expire_key(entries: &mut HashMap<String, Entry>, key: &str) {
    if entries
        .get(key)
        .is_some_and(|entry| !entry.is_live(Instant::now()))
    {
        entries.remove(key);
    }
}

fn expiry(ttl: Option<Duration>) -> Option<Instant> {
    ttl.map(|ttl| Instant::now() + ttl)
}

impl KvStore for MemoryStore {
    fn id(&self) -> &str {
        "memory"
    }

    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            self.check_available()?;
            let mut entries = self.entries.lock().await;
            expire_key(&mut entries, key);
            match entries.get(key).map(|e| &e.value) {
                None => Ok(None),
                Some(Value::Plain(v)) => Ok(Some(v.clone())),
                Some(Value::Hash(_)) => Err(Error::Command(WRONG_TYPE.into())),
            }
        })
    }

    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.check_available()?;
            let mut entries = self.entries.lock().await;
            entries.insert(
                key.to_string(),
                Entry {
                    value: Value::Plain(value.to_string()),
                    expires_at: expiry(ttl),
                },
            );
            Ok(())
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.check_available()?;
            let mut entries = self.entries.lock().await;
            expire_key(&mut entries, key);
            Ok(entries.remove(key).is_some())
        })
    }

    fn exists<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(async move {
            self.check_available()?;
            let mut entries = self.entries.lock().await;
            expire_key(&mut entries, key);
            Ok(entries.contains_key(key))
        })
    }

    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>> {
        Box::pin(async move {
            self.check_available()?;
            let mut entries = self.entries.lock().await;
            purge_expired(&mut entries);
            Ok(entries
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect())
        })
    }

    fn hget<'a>(&'a self, key: &'a str, field: &'a str) -> StoreFuture<'a, Option<String>> {
        Box::pin(async move {
            self.check_available()?;
            let mut entries = self.entries.lock().await;
            expire_key(&mut entries, key);
            match entries.get(key).map(|e| &e.value) {
                None => Ok(None),
                Some(Value::Hash(fields)) => Ok(fields.get(field).cloned()),
                Some(Value::Plain(_)) => Err(Error::Command(WRONG_TYPE.into())),
            }
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
            self.check_available()?;
            let mut entries = self.entries.lock().await;
            expire_key(&mut entries, key);
            let entry = entries.entry(key.to_string()).or_insert_with(|| Entry {
                value: Value::Hash(HashMap::new()),
                expires_at: None,
            });
            match &mut entry.value {
                Value::Hash(fields) => {
                    fields.insert(field.to_string(), value.to_string());
                }
                Value::Plain(_) => return Err(Error::Command(WRONG_TYPE.into())),
            }
            if ttl.is_some() {
                entry.expires_at = expiry(ttl);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = MemoryStore::new();
        store.set("current_token", "abc", None).await.unwrap();
        assert_eq!(store.get("current_token").await.unwrap().as_deref(), Some("abc"));
        assert!(store.exists("current_token").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let store = MemoryStore::new();
        assert!(store.get("nope").await.unwrap().is_none());
        assert!(store.hget("nope", "tenant_url").await.unwrap().is_none());
        assert!(!store.exists("nope").await.unwrap());
        assert!(!store.delete("nope").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn ttl_expires_key() {
        let store = MemoryStore::new();
        store
            .set("login:token:t1", "valid", Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert!(store.exists("login:token:t1").await.unwrap());

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(!store.exists("login:token:t1").await.unwrap());
        assert!(store.get("login:token:t1").await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn point_reads_expire_only_the_key_they_touch() {
        let store = MemoryStore::new();
        let ttl = Some(Duration::from_secs(10));
        store.set("login:token:a", "valid", ttl).await.unwrap();
        store.set("login:token:b", "valid", ttl).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;

        assert!(store.get("login:token:a").await.unwrap().is_none());
        assert_eq!(
            store.entries.lock().await.len(),
            1,
            "a point read must not sweep unrelated keys"
        );

        assert!(store.keys_with_prefix("login:token:").await.unwrap().is_empty());
        assert_eq!(store.entries.lock().await.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_expired_key_reports_absent() {
        let store = MemoryStore::new();
        store
            .set("login:token:a", "valid", Some(Duration::from_secs(10)))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!store.delete("login:token:a").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn key_without_ttl_never_expires() {
        let store = MemoryStore::new();
        store.set("current_token", "abc", None).await.unwrap();
        tokio::time::advance(Duration::from_secs(365 * 24 * 3600)).await;
        assert!(store.exists("current_token").await.unwrap());
    }

    #[tokio::test]
    async fn hset_preserves_other_fields() {
        let store = MemoryStore::new();
        store.hset("token:a", "tenant_url", "https://t1.example", None).await.unwrap();
        store.hset("token:a", "note", "primary", None).await.unwrap();
        store.hset("token:a", "tenant_url", "https://t2.example", None).await.unwrap();

        assert_eq!(
            store.hget("token:a", "tenant_url").await.unwrap().as_deref(),
            Some("https://t2.example")
        );
        assert_eq!(store.hget("token:a", "note").await.unwrap().as_deref(), Some("primary"));
        assert!(store.hget("token:a", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_type_access_is_a_command_error() {
        let store = MemoryStore::new();
        store.set("plain", "v", None).await.unwrap();
        store.hset("hash", "f", "v", None).await.unwrap();

        assert!(matches!(store.hget("plain", "f").await, Err(Error::Command(_))));
        assert!(matches!(store.get("hash").await, Err(Error::Command(_))));
        assert!(matches!(store.hset("plain", "f", "v", None).await, Err(Error::Command(_))));
    }

    #[tokio::test]
    async fn set_replaces_hash() {
        let store = MemoryStore::new();
        store.hset("k", "f", "v", None).await.unwrap();
        store.set("k", "plain", None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("plain"));
    }

    #[tokio::test]
    async fn keys_with_prefix_filters_namespace() {
        let store = MemoryStore::new();
        store.hset("token:a", "tenant_url", "u", None).await.unwrap();
        store.hset("token:b", "tenant_url", "u", None).await.unwrap();
        store.set("login:token:s", "valid", None).await.unwrap();
        store.set("current_token", "a", None).await.unwrap();

        let mut keys = store.keys_with_prefix("token:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["token:a", "token:b"]);
    }

    #[tokio::test]
    async fn delete_removes_any_type() {
        let store = MemoryStore::new();
        store.hset("token:a", "tenant_url", "u", None).await.unwrap();
        assert!(store.delete("token:a").await.unwrap());
        assert!(!store.exists("token:a").await.unwrap());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set("k", "v", None).await.unwrap();
        store.set_unavailable(true);

        assert!(matches!(store.get("k").await, Err(Error::Connection(_))));
        assert!(matches!(store.exists("k").await, Err(Error::Connection(_))));
        assert!(matches!(store.set("k", "v", None).await, Err(Error::Connection(_))));
        assert!(matches!(store.keys_with_prefix("").await, Err(Error::Connection(_))));

        store.set_unavailable(false);
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
    }

    #[tokio::test]
    async fn concurrent_writes_all_land() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut handles = vec![];
        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .hset(&format!("token:{i}"), "tenant_url", "u", None)
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.keys_with_prefix("token:").await.unwrap().len(), 10);
    }
}

//! Key-value store abstraction for the token gateway
//!
//! Defines the `KvStore` trait that decouples session and credential logic
//! from the concrete store. `RedisStore` talks to a real Redis server;
//! `MemoryStore` keeps everything in-process and is used by tests and the
//! `memory` backend.
//!
//! Every call is atomic for the single key it touches. Multi-key sequences
//! (enumerate, then fetch each) are not, and callers must tolerate keys that
//! appear or disappear between calls.

pub mod error;
pub mod memory;
pub mod redis_store;

pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future returned by every store operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Capability set the gateway needs from its backing store.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn KvStore>`).
pub trait KvStore: Send + Sync {
    /// Backend name for logging and health reporting (e.g. "redis", "memory")
    fn id(&self) -> &str;

    /// Read a plain string value. `None` when the key is absent or expired.
    fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

    /// Write a plain string value, replacing whatever the key held.
    ///
    /// With `ttl` the key expires after that duration; without it the key
    /// persists until deleted.
    fn set<'a>(
        &'a self,
        key: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()>;

    /// Remove a key of any type. Returns whether a key was removed.
    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    /// Whether a key of any type currently exists.
    fn exists<'a>(&'a self, key: &'a str) -> StoreFuture<'a, bool>;

    /// All keys starting with `prefix`, in no particular order.
    fn keys_with_prefix<'a>(&'a self, prefix: &'a str) -> StoreFuture<'a, Vec<String>>;

    /// Read one field of a hash. `None` when the key or field is absent.
    fn hget<'a>(&'a self, key: &'a str, field: &'a str) -> StoreFuture<'a, Option<String>>;

    /// Set one field of a hash, creating the hash if needed. Other fields are
    /// left untouched. With `ttl` the whole hash expires after that duration.
    fn hset<'a>(
        &'a self,
        key: &'a str,
        field: &'a str,
        value: &'a str,
        ttl: Option<Duration>,
    ) -> StoreFuture<'a, ()>;
}

//! # Outbound Port
//!
//! The single dependency every other component in the engine takes on
//! persistence: a key-value store with TTLs, lists, sets, atomic
//! counters, and pub/sub. Every lifecycle component (fingerprint cache,
//! rate limiter, rendezvous, flow coordinator, janitor) depends on
//! `KvStore`, never on a concrete adapter.

use crate::domain::errors::StoreError;
use async_trait::async_trait;
use std::time::Duration;

/// A single message received on a subscribed channel.
#[derive(Debug, Clone)]
pub struct KvMessage {
    pub channel: String,
    pub payload: String,
}

/// A live subscription to one or more pub/sub channels.
#[async_trait]
pub trait KvSubscription: Send {
    /// Waits for the next message, or `None` once the subscription is closed.
    async fn next(&mut self) -> Option<KvMessage>;
}

/// Abstract key-value store used by every lifecycle component.
///
/// Production: `RedisKvStore`. Testing: `InMemoryKvStore` (below).
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Sets `key` to `value`, expiring it after `ttl` if given.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Sets `key` to `value` only if it does not already exist, optionally
    /// with a TTL. Returns `true` if the key was set, `false` if it already
    /// held a value. This is the primitive the flow coordinator's
    /// per-fingerprint lock is built on.
    async fn set_nx(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically increments `key` (creating it at 0 first) and returns the
    /// new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Sets (or refreshes) the TTL on an existing key. A no-op if the key
    /// is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Returns the key's remaining TTL, `None` if the key has no expiry
    /// or does not exist.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError>;

    async fn lpush(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Pops and returns the last element of the list, or `None` if empty.
    async fn rpop(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Returns up to `count` elements starting at `start` (0-indexed).
    async fn lrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError>;

    /// Removes all occurrences of `value` from the list at `key`.
    async fn lrem(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn sadd(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    async fn smembers(&self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn srem(&self, key: &str, member: &str) -> Result<(), StoreError>;

    async fn publish(&self, channel: &str, payload: &str) -> Result<(), StoreError>;

    async fn subscribe(&self, channel: &str) -> Result<Box<dyn KvSubscription>, StoreError>;
}

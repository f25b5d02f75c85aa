//! Remote (L2) store traits
//!
//! The coordinator only ever talks to the shared tier through these traits,
//! so a Redis deployment, a Redis cluster and the in-process test double are
//! interchangeable behind one `Arc<dyn RemoteBackend>`.

use async_trait::async_trait;
use std::time::Duration;

use crate::{RemoteCursor, Result};

/// Key/value operations on the shared tier
///
/// Keys passed here are physical keys: namespacing is applied by the caller.
/// Transport failures surface as [`CacheError::RemoteUnavailable`] and are
/// never retried by implementations.
///
/// [`CacheError::RemoteUnavailable`]: crate::CacheError::RemoteUnavailable
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    /// Check whether a key exists (EXISTS)
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Fetch the raw bytes stored under a key
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Unconditional write; `None` ttl means no expiry
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Atomic insert (SET NX). Returns `false` when the key already existed.
    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<bool>;

    /// Delete keys, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<u64>;

    /// One cursor step over keys matching a glob `pattern`
    ///
    /// `limit` is a hint for the number of keys examined per step. The
    /// returned cursor is finished once the whole keyspace has been walked.
    async fn scan(
        &self,
        cursor: &RemoteCursor,
        pattern: &str,
        limit: usize,
    ) -> Result<(RemoteCursor, Vec<String>)>;

    /// All keys matching `pattern`, gathered by driving [`scan`](Self::scan)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut cursor = RemoteCursor::start();
        let mut keys = Vec::new();
        loop {
            let (next, batch) = self.scan(&cursor, pattern, 1000).await?;
            keys.extend(batch);
            if next.is_finished() {
                return Ok(keys);
            }
            cursor = next;
        }
    }

    /// Remove every key in the database (FLUSHALL)
    async fn flush_all(&self) -> Result<()>;

    /// Write many entries without waiting per command
    ///
    /// Returns `Ok(false)` when the writes did not all complete within
    /// `timeout` or any individual write failed. Completed writes are kept.
    async fn set_pipelined(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Result<bool>;
}

/// Server-side aggregates that need per-operation atomicity
///
/// Counters, lists and sets live only in the shared tier.
#[async_trait]
pub trait AggregateStore: Send + Sync + 'static {
    /// INCRBY; returns the new value
    async fn counter_incr(&self, key: &str, delta: i64) -> Result<i64>;

    /// Current counter value, zero when absent
    async fn counter_get(&self, key: &str) -> Result<i64>;

    async fn counter_set(&self, key: &str, value: i64) -> Result<()>;

    /// RPUSH; returns the new length
    async fn list_push(&self, key: &str, items: Vec<Vec<u8>>) -> Result<u64>;

    async fn list_items(&self, key: &str) -> Result<Vec<Vec<u8>>>;

    /// Remove every occurrence of `item`; returns the number removed
    async fn list_remove(&self, key: &str, item: &[u8]) -> Result<u64>;

    async fn list_len(&self, key: &str) -> Result<u64>;

    /// SADD; returns how many members were new
    async fn set_add(&self, key: &str, members: Vec<Vec<u8>>) -> Result<u64>;

    async fn set_remove(&self, key: &str, member: &[u8]) -> Result<bool>;

    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>>;

    async fn set_contains(&self, key: &str, member: &[u8]) -> Result<bool>;

    async fn set_len(&self, key: &str) -> Result<u64>;
}

/// Everything the coordinator needs from the shared tier
pub trait RemoteBackend: RemoteStore + AggregateStore {}

impl<T: RemoteStore + AggregateStore> RemoteBackend for T {}

//! The two-tier cache

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tiercache_core::{
    CacheError, CacheKey, CacheMetrics, CacheOperation, LocalStats, CacheTier, JsonSerializer,
    NoopMetrics, RemoteBackend, RemoteCursor, Result, Serializer,
};
use tiercache_storage::{LocalStore, Loaded, Registration};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::{CacheConfig, CacheMode};
use crate::namespace::Namespace;

mod aggregates;
mod batch;
mod builder;
mod loader;
mod scan;

pub use aggregates::{AtomicCounter, SharedList, SharedSet};
pub use builder::CacheBuilder;
pub use loader::{loader_fn, Loader, LoaderFn};
pub use scan::{ScanCursor, ScanPage, DEFAULT_SCAN_LIMIT};

/// The tiers an instance was built with; fixed for its lifetime
pub(crate) enum Tiers {
    Local(LocalStore),
    Remote {
        remote: Arc<dyn RemoteBackend>,
        local: Option<LocalStore>,
    },
}

impl Tiers {
    pub(crate) fn local(&self) -> Option<&LocalStore> {
        match self {
            Tiers::Local(local) => Some(local),
            Tiers::Remote { local, .. } => local.as_ref(),
        }
    }

    pub(crate) fn remote(&self) -> Option<&Arc<dyn RemoteBackend>> {
        match self {
            Tiers::Local(_) => None,
            Tiers::Remote { remote, .. } => Some(remote),
        }
    }
}

/// Closed flag and the registry slot held by an instance
pub(crate) struct Lifecycle {
    closed: AtomicBool,
    registration: Mutex<Option<Registration>>,
}

impl Lifecycle {
    pub(crate) fn new(registration: Option<Registration>) -> Self {
        Self {
            closed: AtomicBool::new(false),
            registration: Mutex::new(registration),
        }
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(CacheError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Object cache with an optional in-process tier in front of a remote store
///
/// Values of type `V` are encoded once by `S` and kept as bytes in both
/// tiers, so every read hands out a fresh copy. The remote tier is the
/// source of truth for existence: a local hit is only served after the
/// remote store confirms the key still exists.
///
/// Generic over:
/// - `V`: the value type
/// - `S`: the serializer (JSON, MessagePack, Bincode)
/// - `M`: the metrics collector
///
/// Clones share the same tiers and lifecycle.
pub struct TieredCache<V, S = JsonSerializer, M = NoopMetrics>
where
    S: Serializer,
    M: CacheMetrics,
{
    tiers: Arc<Tiers>,
    namespace: Arc<Namespace>,
    config: Arc<CacheConfig>,
    serializer: Arc<S>,
    metrics: Arc<M>,
    loader: Option<Arc<dyn Loader<V>>>,
    lifecycle: Arc<Lifecycle>,
    _value: PhantomData<fn() -> V>,
}

impl<V, S, M> Clone for TieredCache<V, S, M>
where
    S: Serializer,
    M: CacheMetrics,
{
    fn clone(&self) -> Self {
        Self {
            tiers: self.tiers.clone(),
            namespace: self.namespace.clone(),
            config: self.config.clone(),
            serializer: self.serializer.clone(),
            metrics: self.metrics.clone(),
            loader: self.loader.clone(),
            lifecycle: self.lifecycle.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> TieredCache<V> {
    /// Start building a cache for `config`
    pub fn builder(config: CacheConfig) -> CacheBuilder<V> {
        CacheBuilder::new(config)
    }
}

impl<V, S, M> TieredCache<V, S, M>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
    M: CacheMetrics,
{
    pub(crate) fn assemble(
        tiers: Tiers,
        namespace: Namespace,
        config: CacheConfig,
        serializer: S,
        metrics: Arc<M>,
        loader: Option<Arc<dyn Loader<V>>>,
        registration: Option<Registration>,
    ) -> Self {
        Self {
            tiers: Arc::new(tiers),
            namespace: Arc::new(namespace),
            config: Arc::new(config),
            serializer: Arc::new(serializer),
            metrics,
            loader,
            lifecycle: Arc::new(Lifecycle::new(registration)),
            _value: PhantomData,
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn mode(&self) -> CacheMode {
        self.config.mode()
    }

    pub fn serializer(&self) -> &S {
        &self.serializer
    }

    /// Insert `value` under a key that must not exist yet
    ///
    /// Uses the instance default TTL. Fails with `DuplicateKey` if the key
    /// already exists in the authoritative tier.
    pub async fn store(&self, key: impl CacheKey, value: V) -> Result<V> {
        self.store_with_ttl(key, value, None).await
    }

    /// Insert `value` with an explicit TTL; a zero TTL never expires
    pub async fn store_with_ttl(
        &self,
        key: impl CacheKey,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<V> {
        self.ensure_open()?;
        let key = key.cache_key();
        let bytes = self.encode(&value)?;
        let ttl = self.effective_ttl(ttl);
        let start = Instant::now();

        match &*self.tiers {
            Tiers::Local(local) => local.insert(&key, bytes, ttl)?,
            Tiers::Remote { remote, local } => {
                if let Some(local) = local {
                    local.put(&key, bytes.clone(), ttl);
                }
                let inserted = remote
                    .set_if_absent(&self.namespace.physical(&key), bytes, ttl)
                    .await;
                if !matches!(inserted, Ok(true)) {
                    if let Some(local) = local {
                        local.remove(&key);
                    }
                }
                if !inserted? {
                    debug!(target: "tiercache", key = %key, "store lost to an existing key");
                    return Err(CacheError::DuplicateKey(key));
                }
            }
        }

        self.metrics
            .record_latency(CacheOperation::Store, start.elapsed());
        Ok(value)
    }

    /// Read the value for `key`
    ///
    /// Falls back to the configured loader when neither tier has it; the
    /// loaded value is written through so peers see it too.
    pub async fn get(&self, key: impl CacheKey) -> Result<Option<V>> {
        self.ensure_open()?;
        let key = key.cache_key();
        let start = Instant::now();

        let bytes = match &*self.tiers {
            Tiers::Local(local) => self.get_local(local, &key).await?,
            Tiers::Remote {
                remote,
                local: Some(local),
            } => self.get_validated(remote.as_ref(), local, &key).await?,
            Tiers::Remote {
                remote,
                local: None,
            } => self.get_remote(remote.as_ref(), &key).await?,
        };

        self.metrics
            .record_latency(CacheOperation::Get, start.elapsed());
        match bytes {
            Some(bytes) => self.decode(&bytes).map(Some),
            None => {
                self.metrics.record_miss(&key);
                Ok(None)
            }
        }
    }

    async fn get_local(&self, local: &LocalStore, key: &str) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = local.get(key) {
            self.metrics.record_hit(key, CacheTier::Local);
            return Ok(Some(bytes));
        }
        let Some(loader) = &self.loader else {
            return Ok(None);
        };

        local
            .load_missing(key, || async {
                self.metrics.record_load(key);
                debug!(target: "tiercache", key, "loading missing key");
                match loader.load(key).await? {
                    Some(value) => Ok(Some(Loaded {
                        value: self.encode(&value)?,
                        ttl: self.effective_ttl(None),
                    })),
                    None => Ok(None),
                }
            })
            .await
    }

    async fn get_validated(
        &self,
        remote: &dyn RemoteBackend,
        local: &LocalStore,
        key: &str,
    ) -> Result<Option<Vec<u8>>> {
        let physical = self.namespace.physical(key);

        if let Some(bytes) = local.get(key) {
            if remote.exists(&physical).await? {
                self.metrics.record_hit(key, CacheTier::Local);
                return Ok(Some(bytes));
            }
            local.remove(key);
            self.metrics.record_stale(key);
            debug!(target: "tiercache", key, "evicted local entry gone from remote");
        }

        local
            .load_missing(key, || async {
                if let Some(bytes) = remote.get(&physical).await? {
                    self.metrics.record_hit(key, CacheTier::Remote);
                    return Ok(Some(Loaded {
                        value: bytes,
                        ttl: None,
                    }));
                }
                let ttl = self.effective_ttl(None);
                Ok(self
                    .load_through(remote, key, &physical)
                    .await?
                    .map(|value| Loaded { value, ttl }))
            })
            .await
    }

    async fn get_remote(&self, remote: &dyn RemoteBackend, key: &str) -> Result<Option<Vec<u8>>> {
        let physical = self.namespace.physical(key);
        if let Some(bytes) = remote.get(&physical).await? {
            self.metrics.record_hit(key, CacheTier::Remote);
            return Ok(Some(bytes));
        }
        self.load_through(remote, key, &physical).await
    }

    /// Read `key` straight from the remote tier
    ///
    /// The local tier is neither consulted nor filled and the loader is
    /// not run.
    pub async fn get_from_remote(&self, key: impl CacheKey) -> Result<Option<V>> {
        self.ensure_open()?;
        let remote = self.require_remote("remote reads")?;
        let key = key.cache_key();
        let start = Instant::now();

        let bytes = remote.get(&self.namespace.physical(&key)).await?;
        self.metrics
            .record_latency(CacheOperation::Get, start.elapsed());
        match bytes {
            Some(bytes) => {
                self.metrics.record_hit(&key, CacheTier::Remote);
                self.decode(&bytes).map(Some)
            }
            None => {
                self.metrics.record_miss(&key);
                Ok(None)
            }
        }
    }

    /// Run the loader and insert its value remotely
    ///
    /// If a peer inserted the key first, the peer's value wins.
    async fn load_through(
        &self,
        remote: &dyn RemoteBackend,
        key: &str,
        physical: &str,
    ) -> Result<Option<Vec<u8>>> {
        let Some(loader) = &self.loader else {
            return Ok(None);
        };

        self.metrics.record_load(key);
        debug!(target: "tiercache", key, "loading missing key");
        let Some(value) = loader.load(key).await? else {
            return Ok(None);
        };

        let bytes = self.encode(&value)?;
        if remote
            .set_if_absent(physical, bytes.clone(), self.effective_ttl(None))
            .await?
        {
            return Ok(Some(bytes));
        }

        debug!(target: "tiercache", key, "loaded key was inserted by a peer");
        Ok(Some(remote.get(physical).await?.unwrap_or(bytes)))
    }

    /// Overwrite `key` in every tier
    pub async fn replace(&self, key: impl CacheKey, value: V) -> Result<()> {
        self.replace_with_ttl(key, value, None).await
    }

    /// Overwrite `key` in every tier with an explicit TTL
    pub async fn replace_with_ttl(
        &self,
        key: impl CacheKey,
        value: V,
        ttl: Option<Duration>,
    ) -> Result<()> {
        self.ensure_open()?;
        let key = key.cache_key();
        let bytes = self.encode(&value)?;
        let ttl = self.effective_ttl(ttl);
        let start = Instant::now();

        if let Some(local) = self.tiers.local() {
            local.put(&key, bytes.clone(), ttl);
        }
        if let Some(remote) = self.tiers.remote() {
            remote
                .set(&self.namespace.physical(&key), bytes, ttl)
                .await?;
        }

        self.metrics
            .record_latency(CacheOperation::Replace, start.elapsed());
        Ok(())
    }

    /// Remove `key` from every tier
    ///
    /// Returns true if the authoritative tier held it.
    pub async fn delete_if_present(&self, key: impl CacheKey) -> Result<bool> {
        self.ensure_open()?;
        let key = key.cache_key();
        let start = Instant::now();

        let removed = match &*self.tiers {
            Tiers::Local(local) => Self::remove_local(local, &key),
            Tiers::Remote { remote, local } => {
                if let Some(local) = local {
                    local.remove(&key);
                }
                remote.delete(&[self.namespace.physical(&key)]).await? > 0
            }
        };

        self.metrics
            .record_latency(CacheOperation::Delete, start.elapsed());
        Ok(removed)
    }

    /// Remove several keys; returns how many the authoritative tier held
    pub async fn delete_by_keys<K: CacheKey>(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<u64> {
        self.ensure_open()?;
        let keys: Vec<String> = keys.into_iter().map(|key| key.cache_key()).collect();
        if keys.is_empty() {
            return Ok(0);
        }
        let start = Instant::now();

        let removed = match &*self.tiers {
            Tiers::Local(local) => keys
                .iter()
                .filter(|key| Self::remove_local(local, key))
                .count() as u64,
            Tiers::Remote { remote, local } => {
                if let Some(local) = local {
                    for key in &keys {
                        local.remove(key);
                    }
                }
                let physical: Vec<String> = keys
                    .iter()
                    .map(|key| self.namespace.physical(key))
                    .collect();
                remote.delete(&physical).await?
            }
        };

        self.metrics
            .record_latency(CacheOperation::Delete, start.elapsed());
        Ok(removed)
    }

    /// [`delete_by_keys`](Self::delete_by_keys) on a background task
    pub fn delete_by_keys_async<K: CacheKey>(
        &self,
        keys: impl IntoIterator<Item = K>,
    ) -> JoinHandle<Result<u64>> {
        let cache = self.clone();
        let keys: Vec<String> = keys.into_iter().map(|key| key.cache_key()).collect();
        tokio::spawn(async move { cache.delete_by_keys(keys).await })
    }

    /// Local-only removal; a key names either a value or a collection
    fn remove_local(local: &LocalStore, key: &str) -> bool {
        // both run so a value and a collection sharing a name go together
        local.remove(key) | local.remove_collection(key)
    }

    /// Remove every key of this namespace that starts with `pattern`
    pub async fn delete_by_pattern(&self, pattern: &str) -> Result<u64> {
        self.ensure_open()?;
        let remote = self.require_remote("pattern deletes")?;
        let match_pattern = self.namespace.match_pattern(pattern);
        let start = Instant::now();

        let mut cursor = RemoteCursor::start();
        let mut deleted = 0;
        loop {
            let (next, keys) = remote
                .scan(&cursor, &match_pattern, DEFAULT_SCAN_LIMIT)
                .await?;
            if !keys.is_empty() {
                if let Some(local) = self.tiers.local() {
                    for key in keys.iter().filter_map(|k| self.namespace.logical(k)) {
                        local.remove(key);
                    }
                }
                deleted += remote.delete(&keys).await?;
            }
            if next.is_finished() {
                break;
            }
            cursor = next;
        }

        debug!(target: "tiercache", pattern, deleted, "deleted keys by pattern");
        self.metrics
            .record_latency(CacheOperation::Delete, start.elapsed());
        Ok(deleted)
    }

    /// [`delete_by_pattern`](Self::delete_by_pattern) on a background task
    pub fn delete_by_pattern_async(&self, pattern: impl Into<String>) -> JoinHandle<Result<u64>> {
        let cache = self.clone();
        let pattern = pattern.into();
        tokio::spawn(async move { cache.delete_by_pattern(&pattern).await })
    }

    /// Empty the local tier and flush the entire remote database
    ///
    /// This reaches past the namespace: every key on the remote server is
    /// dropped. Use [`clear`](Self::clear) to empty one namespace.
    pub async fn purge(&self) -> Result<()> {
        self.ensure_open()?;
        if let Some(local) = self.tiers.local() {
            local.purge();
        }
        if let Some(remote) = self.tiers.remote() {
            remote.flush_all().await?;
        }
        warn!(target: "tiercache", namespace = self.namespace.id(), "purged cache");
        Ok(())
    }

    /// [`purge`](Self::purge) on a background task
    pub fn purge_async(&self) -> JoinHandle<Result<()>> {
        let cache = self.clone();
        tokio::spawn(async move { cache.purge().await })
    }

    /// Remove every value key of this namespace
    ///
    /// In local-only mode the local collections go with it.
    pub async fn clear(&self) -> Result<u64> {
        self.ensure_open()?;
        match &*self.tiers {
            Tiers::Local(local) => {
                let cleared = local.len() as u64;
                local.purge();
                Ok(cleared)
            }
            Tiers::Remote { local, .. } => {
                let cleared = self.delete_by_pattern("").await?;
                if let Some(local) = local {
                    local.purge();
                }
                Ok(cleared)
            }
        }
    }

    /// Release this instance
    ///
    /// The local tier is handed back to its registry (or emptied) and every
    /// later call on any clone fails with `Closed`. Idempotent.
    pub fn close(&self) {
        if self.lifecycle.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let registration = self.lifecycle.registration.lock().take();
        match registration {
            Some(registration) => registration.release(),
            None => {
                if let Some(local) = self.tiers.local() {
                    local.purge();
                }
            }
        }
        debug!(target: "tiercache", namespace = self.namespace.id(), "cache closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.closed.load(Ordering::Acquire)
    }

    /// Counters of the local tier, if there is one
    pub fn local_stats(&self) -> Option<LocalStats> {
        self.tiers.local().map(LocalStore::stats)
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        self.lifecycle.ensure_open()
    }

    pub(crate) fn require_remote(&self, what: &str) -> Result<&Arc<dyn RemoteBackend>> {
        self.tiers.remote().ok_or_else(|| {
            CacheError::UnsupportedCapability(format!("{} need a remote tier", what))
        })
    }

    /// Explicit TTL, else the instance default; zero means no expiry
    pub(crate) fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        ttl.or(self.config.default_ttl())
            .filter(|ttl| !ttl.is_zero())
    }

    pub(crate) fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let start = Instant::now();
        let bytes = self.serializer.serialize(value)?;
        self.metrics
            .record_latency(CacheOperation::Serialize, start.elapsed());
        Ok(bytes)
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        let start = Instant::now();
        let value = self.serializer.deserialize(bytes)?;
        self.metrics
            .record_latency(CacheOperation::Deserialize, start.elapsed());
        Ok(value)
    }
}

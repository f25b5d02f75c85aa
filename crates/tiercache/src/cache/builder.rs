use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tiercache_core::{
    CacheError, CacheMetrics, JsonSerializer, NoopMetrics, RemoteBackend, Result, Serializer,
};
use tiercache_storage::{LocalRegistry, LocalStore};
use tracing::debug;

use super::{Loader, TieredCache, Tiers};
use crate::config::{CacheConfig, CacheMode};
use crate::namespace::Namespace;

/// Assembles a [`TieredCache`] from a [`CacheConfig`]
///
/// Cloning a builder is cheap; every clone builds an independent instance
/// with the same settings.
pub struct CacheBuilder<V, S = JsonSerializer, M = NoopMetrics> {
    config: CacheConfig,
    serializer: S,
    metrics: Arc<M>,
    loader: Option<Arc<dyn Loader<V>>>,
    registry: Option<LocalRegistry>,
    remote: Option<Arc<dyn RemoteBackend>>,
    _value: PhantomData<fn() -> V>,
}

impl<V, S: Clone, M> Clone for CacheBuilder<V, S, M> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            serializer: self.serializer.clone(),
            metrics: self.metrics.clone(),
            loader: self.loader.clone(),
            registry: self.registry.clone(),
            remote: self.remote.clone(),
            _value: PhantomData,
        }
    }
}

impl<V> CacheBuilder<V> {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            serializer: JsonSerializer,
            metrics: Arc::new(NoopMetrics),
            loader: None,
            registry: None,
            remote: None,
            _value: PhantomData,
        }
    }
}

impl<V, S, M> CacheBuilder<V, S, M> {
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Encode values with `serializer` instead of JSON
    pub fn serializer<S2: Serializer>(self, serializer: S2) -> CacheBuilder<V, S2, M> {
        CacheBuilder {
            config: self.config,
            serializer,
            metrics: self.metrics,
            loader: self.loader,
            registry: self.registry,
            remote: self.remote,
            _value: PhantomData,
        }
    }

    /// Report hits, misses and latencies to `metrics`
    pub fn metrics<M2: CacheMetrics>(self, metrics: M2) -> CacheBuilder<V, S, M2> {
        CacheBuilder {
            config: self.config,
            serializer: self.serializer,
            metrics: Arc::new(metrics),
            loader: self.loader,
            registry: self.registry,
            remote: self.remote,
            _value: PhantomData,
        }
    }

    /// Fill misses from `loader`
    pub fn loader(mut self, loader: impl Loader<V>) -> Self {
        self.loader = Some(Arc::new(loader));
        self
    }

    /// Share the local tier with every cache of the same namespace id built
    /// on `registry`
    pub fn registry(mut self, registry: &LocalRegistry) -> Self {
        self.registry = Some(registry.clone());
        self
    }

    /// Use `remote` as the remote tier instead of connecting to the
    /// configured endpoints
    pub fn remote_store(mut self, remote: impl RemoteBackend) -> Self {
        self.remote = Some(Arc::new(remote));
        self
    }

    /// Like [`remote_store`](Self::remote_store), for a store that is
    /// already shared
    pub fn shared_remote(mut self, remote: Arc<dyn RemoteBackend>) -> Self {
        self.remote = Some(remote);
        self
    }
}

impl<V, S, M> CacheBuilder<V, S, M>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
    M: CacheMetrics,
{
    /// Create the cache, connecting to the remote tier if the mode has one
    pub async fn build(self) -> Result<TieredCache<V, S, M>> {
        let config = self.config;
        let namespace = match config.namespace_id() {
            Some(id) => Namespace::new(id)?,
            None => Namespace::generated(),
        };

        let local_config = config.local_config();
        let (local, registration) = if config.has_local_tier() {
            match &self.registry {
                Some(registry) => {
                    let registration = registry.acquire(namespace.id(), &local_config);
                    (Some(registration.store().clone()), Some(registration))
                }
                None => (Some(LocalStore::new(local_config)), None),
            }
        } else {
            (None, None)
        };

        let tiers = match (config.mode(), local) {
            (CacheMode::LocalOnly, Some(local)) => Tiers::Local(local),
            (CacheMode::LocalOnly, None) => {
                return Err(CacheError::Internal("local-only cache without a local tier".into()));
            }
            (_, local) => {
                let remote = match self.remote {
                    Some(remote) => remote,
                    None => connect(&config).await?,
                };
                Tiers::Remote { remote, local }
            }
        };

        debug!(
            target: "tiercache",
            namespace = namespace.id(),
            mode = ?config.mode(),
            local = config.has_local_tier(),
            serializer = self.serializer.name(),
            "cache created"
        );
        Ok(TieredCache::assemble(
            tiers,
            namespace,
            config,
            self.serializer,
            self.metrics,
            self.loader,
            registration,
        ))
    }
}

#[cfg(feature = "redis")]
async fn connect(config: &CacheConfig) -> Result<Arc<dyn RemoteBackend>> {
    let store = tiercache_storage::RedisStore::connect(config.redis_config()).await?;
    debug!(target: "tiercache", clustered = store.is_clustered(), "connected to redis");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
async fn connect(config: &CacheConfig) -> Result<Arc<dyn RemoteBackend>> {
    Err(CacheError::InvalidConfig(format!(
        "{:?} needs the `redis` feature or an injected remote store",
        config.mode()
    )))
}

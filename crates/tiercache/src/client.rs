//! Lazily constructed, process-wide cache handle

use serde::de::DeserializeOwned;
use serde::Serialize;
use tiercache_core::{CacheMetrics, JsonSerializer, NoopMetrics, Result, Serializer};
use tokio::sync::OnceCell;

use crate::cache::{CacheBuilder, TieredCache};
use crate::config::CacheConfig;

/// Builds its cache on first use and hands out the same instance afterwards
///
/// Construction runs at most once even under concurrent first calls. A
/// failed construction leaves the client empty so a later call can retry.
pub struct CacheClient<V, S = JsonSerializer, M = NoopMetrics>
where
    S: Serializer,
    M: CacheMetrics,
{
    template: CacheBuilder<V, S, M>,
    cache: OnceCell<TieredCache<V, S, M>>,
}

impl<V> CacheClient<V> {
    /// Client for a cache with default serializer and metrics
    pub fn new(config: CacheConfig) -> Self {
        Self::from_builder(CacheBuilder::new(config))
    }
}

impl<V, S, M> CacheClient<V, S, M>
where
    S: Serializer,
    M: CacheMetrics,
{
    /// Client that builds its cache from `builder`
    pub fn from_builder(builder: CacheBuilder<V, S, M>) -> Self {
        Self {
            template: builder,
            cache: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        self.template.config()
    }

    /// The cache, if it was built already
    pub fn get(&self) -> Option<&TieredCache<V, S, M>> {
        self.cache.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.cache.initialized()
    }
}

impl<V, S, M> CacheClient<V, S, M>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
    M: CacheMetrics,
{
    /// The cache, building it on first call
    pub async fn cache(&self) -> Result<&TieredCache<V, S, M>> {
        self.cache
            .get_or_try_init(|| self.template.clone().build())
            .await
    }

    /// Close the cache if it was built
    pub fn close(&self) {
        if let Some(cache) = self.cache.get() {
            cache.close();
        }
    }
}

//! Bulk writes

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tiercache_core::{CacheKey, CacheMetrics, CacheOperation, Result, Serializer};
use tracing::warn;

use super::TieredCache;

impl<V, S, M> TieredCache<V, S, M>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
    M: CacheMetrics,
{
    /// Write many entries, waiting at most `timeout` for the remote tier
    ///
    /// Entries overwrite existing keys and take the instance default TTL.
    /// Every value is encoded before anything is written. Returns false when
    /// the remote writes did not all finish in time or one of them failed;
    /// writes that did finish stay in place.
    pub async fn store_batch<K: CacheKey>(
        &self,
        entries: impl IntoIterator<Item = (K, V)>,
        timeout: Duration,
    ) -> Result<bool> {
        self.ensure_open()?;
        let encoded = entries
            .into_iter()
            .map(|(key, value)| -> Result<(String, Vec<u8>)> {
                Ok((key.cache_key(), self.encode(&value)?))
            })
            .collect::<Result<Vec<_>>>()?;
        if encoded.is_empty() {
            return Ok(true);
        }
        let ttl = self.effective_ttl(None);
        let start = Instant::now();

        if let Some(local) = self.tiers.local() {
            for (key, bytes) in &encoded {
                local.put(key, bytes.clone(), ttl);
            }
        }

        let written = match self.tiers.remote() {
            Some(remote) => {
                let count = encoded.len();
                let physical = encoded
                    .into_iter()
                    .map(|(key, bytes)| (self.namespace.physical(&key), bytes))
                    .collect();
                let written = remote.set_pipelined(physical, ttl, timeout).await?;
                if !written {
                    warn!(target: "tiercache", entries = count, ?timeout, "batch write did not complete");
                }
                written
            }
            None => true,
        };

        self.metrics
            .record_latency(CacheOperation::Batch, start.elapsed());
        Ok(written)
    }

    /// Same as [`store_batch`](Self::store_batch); batch writes always overwrite
    pub async fn replace_batch<K: CacheKey>(
        &self,
        entries: impl IntoIterator<Item = (K, V)>,
        timeout: Duration,
    ) -> Result<bool> {
        self.store_batch(entries, timeout).await
    }
}

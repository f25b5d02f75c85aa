//! Observability hooks invoked by the cache on every tier decision

use std::fmt;
use std::time::Duration;

/// Which tier answered a read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    Local,
    Remote,
}

impl CacheTier {
    pub fn label(self) -> &'static str {
        match self {
            CacheTier::Local => "local",
            CacheTier::Remote => "remote",
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Timed operations reported through [`CacheMetrics::record_latency`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheOperation {
    Store,
    Get,
    Replace,
    Delete,
    Scan,
    Batch,
    /// Value to bytes, including rejection of unencodable values
    Serialize,
    Deserialize,
}

impl CacheOperation {
    pub fn label(self) -> &'static str {
        match self {
            CacheOperation::Store => "store",
            CacheOperation::Get => "get",
            CacheOperation::Replace => "replace",
            CacheOperation::Delete => "delete",
            CacheOperation::Scan => "scan",
            CacheOperation::Batch => "batch",
            CacheOperation::Serialize => "serialize",
            CacheOperation::Deserialize => "deserialize",
        }
    }
}

impl fmt::Display for CacheOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Receives cache events
///
/// Keys passed here are logical keys, without the namespace prefix.
/// Implementations are called inline on the request path and must not block.
pub trait CacheMetrics: Send + Sync + 'static {
    fn record_hit(&self, key: &str, tier: CacheTier);

    /// Neither tier had the key and no loader produced a value
    fn record_miss(&self, key: &str);

    /// A local entry was dropped because the remote tier no longer has the key
    fn record_stale(&self, key: &str);

    /// The configured loader was invoked for `key`
    fn record_load(&self, key: &str);

    fn record_latency(&self, operation: CacheOperation, duration: Duration);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl CacheMetrics for NoopMetrics {
    #[inline]
    fn record_hit(&self, _: &str, _: CacheTier) {}

    #[inline]
    fn record_miss(&self, _: &str) {}

    #[inline]
    fn record_stale(&self, _: &str) {}

    #[inline]
    fn record_load(&self, _: &str) {}

    #[inline]
    fn record_latency(&self, _: CacheOperation, _: Duration) {}
}

/// Forwards events to the global `metrics` recorder
///
/// With prefix `tiercache` this emits `tiercache_hits_total{tier}`,
/// `tiercache_misses_total`, `tiercache_stale_local_total`,
/// `tiercache_loads_total` and `tiercache_operation_seconds{operation}`.
/// Keys are never used as labels.
#[cfg(feature = "metrics")]
#[derive(Debug, Clone)]
pub struct MetricsCrateAdapter {
    hits: String,
    misses: String,
    stale: String,
    loads: String,
    latency: String,
}

#[cfg(feature = "metrics")]
impl MetricsCrateAdapter {
    pub fn new(prefix: impl AsRef<str>) -> Self {
        let prefix = prefix.as_ref();
        Self {
            hits: format!("{prefix}_hits_total"),
            misses: format!("{prefix}_misses_total"),
            stale: format!("{prefix}_stale_local_total"),
            loads: format!("{prefix}_loads_total"),
            latency: format!("{prefix}_operation_seconds"),
        }
    }
}

#[cfg(feature = "metrics")]
impl CacheMetrics for MetricsCrateAdapter {
    fn record_hit(&self, _: &str, tier: CacheTier) {
        metrics::counter!(self.hits.clone(), "tier" => tier.label()).increment(1);
    }

    fn record_miss(&self, _: &str) {
        metrics::counter!(self.misses.clone()).increment(1);
    }

    fn record_stale(&self, _: &str) {
        metrics::counter!(self.stale.clone()).increment(1);
    }

    fn record_load(&self, _: &str) {
        metrics::counter!(self.loads.clone()).increment(1);
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        metrics::histogram!(self.latency.clone(), "operation" => operation.label())
            .record(duration.as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_render_through_display() {
        assert_eq!(CacheTier::Remote.to_string(), "remote");
        assert_eq!(CacheOperation::Deserialize.to_string(), "deserialize");
        assert_eq!(format!("{}/{}", CacheTier::Local, CacheOperation::Scan), "local/scan");
    }

    #[cfg(feature = "metrics")]
    #[test]
    fn test_adapter_names_use_prefix() {
        let adapter = MetricsCrateAdapter::new("orders");
        assert_eq!(adapter.hits, "orders_hits_total");
        assert_eq!(adapter.latency, "orders_operation_seconds");
        // no recorder installed: events are dropped
        adapter.record_hit("k", CacheTier::Local);
        adapter.record_latency(CacheOperation::Get, Duration::from_millis(2));
    }
}

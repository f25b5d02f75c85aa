use std::time::Duration;

use tracing::{debug, trace};

use crate::{CacheMetrics, CacheOperation, CacheTier};

/// Reports cache events as `tracing` events under the `tiercache` target
///
/// Hits, misses, stale local entries and loads are `DEBUG`; latencies are
/// `TRACE` since they fire on every operation.
#[derive(Debug, Clone, Default)]
pub struct TracingMetrics {
    service: Option<String>,
}

impl TracingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every event with `service = name`
    pub fn for_service(name: impl Into<String>) -> Self {
        Self {
            service: Some(name.into()),
        }
    }

    fn service(&self) -> &str {
        self.service.as_deref().unwrap_or("-")
    }
}

impl CacheMetrics for TracingMetrics {
    fn record_hit(&self, key: &str, tier: CacheTier) {
        debug!(target: "tiercache", service = self.service(), key, %tier, "hit");
    }

    fn record_miss(&self, key: &str) {
        debug!(target: "tiercache", service = self.service(), key, "miss");
    }

    fn record_stale(&self, key: &str) {
        debug!(
            target: "tiercache",
            service = self.service(),
            key,
            "local entry gone from remote tier, evicted"
        );
    }

    fn record_load(&self, key: &str) {
        debug!(target: "tiercache", service = self.service(), key, "loading");
    }

    fn record_latency(&self, operation: CacheOperation, duration: Duration) {
        trace!(
            target: "tiercache",
            service = self.service(),
            %operation,
            micros = duration.as_micros() as u64,
            "timed"
        );
    }
}

//! Core traits for cache operations

mod key;
mod metrics;
mod remote;
mod serializer;
mod tracing_metrics;

pub use key::CacheKey;
pub use metrics::{CacheMetrics, CacheOperation, CacheTier, NoopMetrics};
pub use remote::{AggregateStore, RemoteBackend, RemoteStore};
pub use serializer::{JsonSerializer, Serializer};
pub use tracing_metrics::TracingMetrics;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;

#[cfg(feature = "msgpack")]
pub use serializer::MsgPackSerializer;

#[cfg(feature = "bincode")]
pub use serializer::BincodeSerializer;

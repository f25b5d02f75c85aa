//! Configuration for the Redis remote tier

use std::time::Duration;

/// Connection settings for [`RedisStore`](super::RedisStore)
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URLs (`redis://host:port/db` or `rediss://` for TLS).
    /// A single node uses the first URL; a cluster uses them as seeds and
    /// discovers its primaries from them. Credentials and TLS of the first
    /// URL apply to every discovered node.
    pub urls: Vec<String>,

    /// Talk to a Redis Cluster instead of a single node
    pub clustered: bool,

    /// Connection pool size (single node)
    pub pool_size: u32,

    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: vec!["redis://127.0.0.1:6379".to_string()],
            clustered: false,
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisConfig {
    /// Single node at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            ..Default::default()
        }
    }

    /// Cluster reachable through `urls`
    pub fn cluster<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            urls: urls.into_iter().map(Into::into).collect(),
            clustered: true,
            ..Default::default()
        }
    }

    /// Set pool size
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Set connection timeout
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

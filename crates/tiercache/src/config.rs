//! Cache configuration

use std::fmt;
use std::time::Duration;

use tiercache_core::{CacheError, Result};
use tiercache_storage::LocalConfig;

use crate::namespace::validate_id;

/// Which tiers a cache instance runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// In-process tier only
    #[default]
    LocalOnly,
    /// One remote node, optionally fronted by the local tier
    SingleRemote,
    /// A remote cluster, optionally fronted by the local tier
    ClusteredRemote,
}

impl CacheMode {
    pub fn is_remote(&self) -> bool {
        !matches!(self, CacheMode::LocalOnly)
    }
}

/// Address of one remote node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub database: Option<u32>,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
            database: None,
        }
    }

    /// Connect over TLS (`rediss://`)
    pub fn tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    /// Select a logical database
    pub fn database(mut self, db: u32) -> Self {
        self.database = Some(db);
        self
    }

    /// Connection URL understood by the redis client
    pub fn connection_string(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };
        match self.database {
            Some(db) => format!("{}://{}:{}/{}", scheme, self.host, self.port, db),
            None => format!("{}://{}:{}", scheme, self.host, self.port),
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connection_string())
    }
}

/// Immutable settings for one cache instance
///
/// Built and validated by [`CacheConfigBuilder`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    mode: CacheMode,
    endpoints: Vec<ServerAddress>,
    default_ttl: Option<Duration>,
    local_cache: bool,
    local_capacity: usize,
    local_expiry: Option<Duration>,
    namespace_id: Option<String>,
    pool_size: u32,
    connection_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::LocalOnly,
            endpoints: Vec::new(),
            default_ttl: None,
            local_cache: false,
            local_capacity: 500,
            local_expiry: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            namespace_id: None,
            pool_size: 10,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Local-only cache with default settings
    pub fn local() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    pub fn endpoints(&self) -> &[ServerAddress] {
        &self.endpoints
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Whether a local tier runs in front of the remote one
    pub fn local_cache_enabled(&self) -> bool {
        self.local_cache
    }

    pub fn local_capacity(&self) -> usize {
        self.local_capacity
    }

    pub fn local_expiry(&self) -> Option<Duration> {
        self.local_expiry
    }

    pub fn namespace_id(&self) -> Option<&str> {
        self.namespace_id.as_deref()
    }

    pub fn pool_size(&self) -> u32 {
        self.pool_size
    }

    pub fn connection_timeout(&self) -> Duration {
        self.connection_timeout
    }

    /// Whether this config instantiates a local tier at all
    pub fn has_local_tier(&self) -> bool {
        self.mode == CacheMode::LocalOnly || self.local_cache
    }

    /// Settings for the local tier
    pub(crate) fn local_config(&self) -> LocalConfig {
        let expiry = match self.mode {
            CacheMode::LocalOnly => self
                .default_ttl
                .filter(|ttl| !ttl.is_zero())
                .or(self.local_expiry),
            _ => self.local_expiry,
        };
        LocalConfig::with_capacity(self.local_capacity).expire_after_write(expiry)
    }

    #[cfg(feature = "redis")]
    pub(crate) fn redis_config(&self) -> tiercache_storage::RedisConfig {
        let urls: Vec<String> = self
            .endpoints
            .iter()
            .map(ServerAddress::connection_string)
            .collect();
        let config = match self.mode {
            CacheMode::ClusteredRemote => tiercache_storage::RedisConfig::cluster(urls),
            _ => tiercache_storage::RedisConfig {
                urls,
                ..Default::default()
            },
        };
        config
            .pool_size(self.pool_size)
            .connection_timeout(self.connection_timeout)
    }
}

/// Builder for [`CacheConfig`]
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn mode(mut self, mode: CacheMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Add a remote node (a seed node in cluster mode)
    pub fn endpoint(mut self, address: ServerAddress) -> Self {
        self.config.endpoints.push(address);
        self
    }

    /// TTL applied when an operation does not pass one; zero means no expiry
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = Some(ttl);
        self
    }

    /// Run a local tier of `capacity` entries in front of the remote store
    pub fn local_cache(mut self, capacity: usize) -> Self {
        self.config.local_cache = true;
        self.config.local_capacity = capacity;
        self
    }

    /// Expire-after-write bound for the local tier (`None` disables it)
    pub fn local_expiry(mut self, expiry: Option<Duration>) -> Self {
        self.config.local_expiry = expiry;
        self
    }

    pub fn namespace_id(mut self, id: impl Into<String>) -> Self {
        self.config.namespace_id = Some(id.into());
        self
    }

    pub fn pool_size(mut self, size: u32) -> Self {
        self.config.pool_size = size;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Validate and freeze the configuration
    pub fn build(self) -> Result<CacheConfig> {
        let config = self.config;
        match config.mode {
            CacheMode::LocalOnly if !config.endpoints.is_empty() => {
                return Err(CacheError::InvalidConfig(
                    "local-only mode takes no remote endpoints".into(),
                ));
            }
            CacheMode::SingleRemote | CacheMode::ClusteredRemote if config.endpoints.is_empty() => {
                return Err(CacheError::InvalidConfig(format!(
                    "{:?} needs at least one endpoint",
                    config.mode
                )));
            }
            CacheMode::SingleRemote if config.endpoints.len() > 1 => {
                return Err(CacheError::InvalidConfig(format!(
                    "single-node mode got {} endpoints",
                    config.endpoints.len()
                )));
            }
            _ => {}
        }
        if config.has_local_tier() && config.local_capacity == 0 {
            return Err(CacheError::InvalidConfig(
                "local cache capacity must be positive".into(),
            ));
        }
        if config.pool_size == 0 {
            return Err(CacheError::InvalidConfig("pool size must be positive".into()));
        }
        if let Some(id) = &config.namespace_id {
            validate_id(id)?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_string() {
        let plain = ServerAddress::new("cache.internal", 6379);
        assert_eq!(plain.connection_string(), "redis://cache.internal:6379");

        let tls = ServerAddress::new("cache.internal", 6380).tls(true).database(3);
        assert_eq!(tls.connection_string(), "rediss://cache.internal:6380/3");
        assert_eq!(tls.to_string(), tls.connection_string());
    }

    #[test]
    fn test_defaults() {
        let config = CacheConfig::builder().build().unwrap();
        assert_eq!(config.mode(), CacheMode::LocalOnly);
        assert_eq!(config.local_capacity(), 500);
        assert_eq!(config.local_expiry(), Some(Duration::from_secs(604_800)));
        assert_eq!(config.pool_size(), 10);
        assert_eq!(config.connection_timeout(), Duration::from_secs(5));
        assert!(config.has_local_tier());
    }

    #[test]
    fn test_validation() {
        let remote_without_endpoint = CacheConfig::builder().mode(CacheMode::SingleRemote).build();
        assert!(matches!(remote_without_endpoint, Err(CacheError::InvalidConfig(_))));

        let single_with_two = CacheConfig::builder()
            .mode(CacheMode::SingleRemote)
            .endpoint(ServerAddress::new("a", 6379))
            .endpoint(ServerAddress::new("b", 6379))
            .build();
        assert!(matches!(single_with_two, Err(CacheError::InvalidConfig(_))));

        let local_with_endpoint = CacheConfig::builder()
            .endpoint(ServerAddress::new("a", 6379))
            .build();
        assert!(matches!(local_with_endpoint, Err(CacheError::InvalidConfig(_))));

        let zero_capacity = CacheConfig::builder().local_cache(0).build();
        assert!(matches!(zero_capacity, Err(CacheError::InvalidConfig(_))));

        let bad_id = CacheConfig::builder().namespace_id("a:b").build();
        assert!(matches!(bad_id, Err(CacheError::InvalidConfig(_))));

        let cluster_seed = CacheConfig::builder()
            .mode(CacheMode::ClusteredRemote)
            .endpoint(ServerAddress::new("a", 7000))
            .build();
        assert!(cluster_seed.is_ok());
    }

    #[test]
    fn test_local_config_expiry() {
        let local = CacheConfig::builder()
            .default_ttl(Duration::from_secs(30))
            .build()
            .unwrap();
        assert_eq!(
            local.local_config().expire_after_write,
            Some(Duration::from_secs(30))
        );

        let hybrid = CacheConfig::builder()
            .mode(CacheMode::SingleRemote)
            .endpoint(ServerAddress::new("a", 6379))
            .default_ttl(Duration::from_secs(30))
            .local_cache(50)
            .build()
            .unwrap();
        let local_config = hybrid.local_config();
        assert_eq!(local_config.max_capacity, 50);
        assert_eq!(local_config.expire_after_write, Some(Duration::from_secs(604_800)));
    }
}

use async_trait::async_trait;
use bb8::Pool;
use bb8_redis::RedisConnectionManager;
use redis::aio::ConnectionManager;
use redis::cluster_async::ClusterConnection;
use redis::{Cmd, FromRedisValue, RedisError};
use std::time::Duration;
use tracing::{debug, warn};

use tiercache_core::{AggregateStore, CacheError, RemoteCursor, RemoteStore, Result};

use super::config::RedisConfig;

enum Topology {
    Single(Pool<RedisConnectionManager>),
    Cluster {
        conn: ClusterConnection,
        /// One connection per primary, used for SCAN and FLUSHALL
        primaries: Vec<ConnectionManager>,
    },
}

/// Remote tier backed by Redis, single node or cluster
///
/// The topology is picked once when connecting; callers never see which one
/// is in use.
pub struct RedisStore {
    topology: Topology,
    config: RedisConfig,
}

/// Classify a client error
///
/// Transport trouble becomes `RemoteUnavailable` so callers can retry;
/// anything the server rejected is reported as-is.
pub(crate) fn map_redis_error(e: RedisError) -> CacheError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout()
    {
        CacheError::RemoteUnavailable(e.to_string())
    } else if e.code() == Some("WRONGTYPE") {
        CacheError::WrongType(e.to_string())
    } else {
        CacheError::Backend(e.to_string())
    }
}

/// Longest PX Redis accepts without overflowing its own clock arithmetic
const MAX_PX_MS: u128 = (i64::MAX / 2) as u128;

/// TTL in whole milliseconds; TTLs past `MAX_PX_MS` are sent without expiry
fn px(ttl: Option<Duration>) -> Option<u64> {
    ttl.map(|ttl| ttl.as_millis().max(1))
        .filter(|ms| *ms <= MAX_PX_MS)
        .and_then(|ms| u64::try_from(ms).ok())
}

fn set_cmd(key: &str, value: &[u8], ttl: Option<Duration>, only_if_absent: bool) -> Cmd {
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(value);
    if only_if_absent {
        cmd.arg("NX");
    }
    if let Some(ms) = px(ttl) {
        cmd.arg("PX").arg(ms);
    }
    cmd
}

/// `host:port` of every healthy primary in a `CLUSTER NODES` reply
///
/// Each line reads `<id> <ip:port@cport[,hostname]> <flags> ...`; replicas
/// and nodes flagged as failing or without an address are skipped.
fn primary_addresses(layout: &str) -> Vec<String> {
    let mut addresses: Vec<String> = layout
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let (_id, address, flags) = (fields.next()?, fields.next()?, fields.next()?);
            let flags: Vec<&str> = flags.split(',').collect();
            let healthy = flags.contains(&"master")
                && !flags
                    .iter()
                    .any(|flag| matches!(*flag, "fail" | "fail?" | "handshake" | "noaddr"));
            let address = address.split(['@', ',']).next()?;
            let (host, port) = address.rsplit_once(':')?;
            (healthy && !host.is_empty() && !port.is_empty()).then(|| address.to_string())
        })
        .collect();
    addresses.sort();
    addresses.dedup();
    addresses
}

/// `seed` with its host and port replaced by `address`
///
/// Scheme, credentials and database carry over, so TLS and auth settings of
/// the seed apply to every node.
fn node_url(seed: &str, address: &str) -> String {
    let (scheme, rest) = seed.split_once("://").unwrap_or(("redis", seed));
    let (authority, path) = match rest.find('/') {
        Some(at) => rest.split_at(at),
        None => (rest, ""),
    };
    let credentials = authority
        .rsplit_once('@')
        .map(|(credentials, _)| format!("{}@", credentials))
        .unwrap_or_default();

    let address = match address.rsplit_once(':') {
        // bare IPv6 hosts need brackets in a URL
        Some((host, port)) if host.contains(':') && !host.starts_with('[') => {
            format!("[{}]:{}", host, port)
        }
        _ => address.to_string(),
    };
    format!("{}://{}{}{}", scheme, credentials, address, path)
}

impl RedisStore {
    /// Connect according to `config`
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        if config.urls.is_empty() {
            return Err(CacheError::InvalidConfig(
                "at least one redis url is required".to_string(),
            ));
        }

        let topology = if config.clustered {
            tokio::time::timeout(config.connection_timeout, Self::connect_cluster(&config))
                .await
                .map_err(|_| {
                    CacheError::RemoteUnavailable("timed out connecting to cluster".to_string())
                })??
        } else {
            let manager = RedisConnectionManager::new(config.urls[0].as_str())
                .map_err(|e| CacheError::InvalidConfig(e.to_string()))?;

            let pool = Pool::builder()
                .max_size(config.pool_size)
                .connection_timeout(config.connection_timeout)
                .build(manager)
                .await
                .map_err(map_redis_error)?;
            Topology::Single(pool)
        };

        debug!(
            target: "tiercache",
            clustered = config.clustered,
            seeds = config.urls.len(),
            "connected to redis"
        );
        Ok(Self { topology, config })
    }

    /// Connect through the seeds, then open one connection per primary the
    /// cluster reports, so node-local commands cover every slot
    async fn connect_cluster(config: &RedisConfig) -> Result<Topology> {
        let client = redis::cluster::ClusterClient::new(config.urls.clone())
            .map_err(|e| CacheError::InvalidConfig(e.to_string()))?;
        let mut conn = client
            .get_async_connection()
            .await
            .map_err(map_redis_error)?;

        let layout: String = redis::cmd("CLUSTER")
            .arg("NODES")
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        let addresses = primary_addresses(&layout);
        if addresses.is_empty() {
            return Err(CacheError::Backend(
                "cluster reported no reachable primaries".to_string(),
            ));
        }

        let seed = &config.urls[0];
        let mut primaries = Vec::with_capacity(addresses.len());
        for address in &addresses {
            let client = redis::Client::open(node_url(seed, address).as_str())
                .map_err(|e| CacheError::InvalidConfig(e.to_string()))?;
            primaries.push(
                ConnectionManager::new(client)
                    .await
                    .map_err(map_redis_error)?,
            );
        }
        debug!(target: "tiercache", primaries = ?addresses, "discovered cluster primaries");

        Ok(Topology::Cluster { conn, primaries })
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    pub fn is_clustered(&self) -> bool {
        matches!(self.topology, Topology::Cluster { .. })
    }

    /// Run one command on whichever connection owns the key
    async fn query<T: FromRedisValue>(&self, cmd: &Cmd) -> Result<T> {
        match &self.topology {
            Topology::Single(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| CacheError::RemoteUnavailable(e.to_string()))?;
                cmd.query_async(&mut *conn).await.map_err(map_redis_error)
            }
            Topology::Cluster { conn, .. } => {
                let mut conn = conn.clone();
                cmd.query_async(&mut conn).await.map_err(map_redis_error)
            }
        }
    }

    fn node_count(&self) -> usize {
        match &self.topology {
            Topology::Single(_) => 1,
            Topology::Cluster { primaries, .. } => primaries.len(),
        }
    }

    /// Run a node-local command (SCAN, FLUSHALL) on node `index`
    async fn query_node<T: FromRedisValue>(&self, index: usize, cmd: &Cmd) -> Result<T> {
        match &self.topology {
            Topology::Single(_) => self.query(cmd).await,
            Topology::Cluster { primaries, .. } => {
                let mut conn = primaries
                    .get(index)
                    .cloned()
                    .ok_or_else(|| CacheError::Internal(format!("no cluster node {}", index)))?;
                cmd.query_async(&mut conn).await.map_err(map_redis_error)
            }
        }
    }
}

#[async_trait]
impl RemoteStore for RedisStore {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.query(redis::cmd("EXISTS").arg(key)).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.query(redis::cmd("GET").arg(key)).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.query(&set_cmd(key, &value, ttl, false)).await
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        // Nil reply means the key already existed
        let reply: Option<String> = self.query(&set_cmd(key, &value, ttl, true)).await?;
        Ok(reply.is_some())
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        match &self.topology {
            Topology::Single(_) => self.query(redis::cmd("DEL").arg(keys)).await,
            // Keys may live on different slots
            Topology::Cluster { .. } => {
                let mut removed = 0;
                for key in keys {
                    let n: u64 = self.query(redis::cmd("DEL").arg(key)).await?;
                    removed += n;
                }
                Ok(removed)
            }
        }
    }

    async fn scan(
        &self,
        cursor: &RemoteCursor,
        pattern: &str,
        limit: usize,
    ) -> Result<(RemoteCursor, Vec<String>)> {
        if cursor.is_finished() {
            return Ok((RemoteCursor::finished(), Vec::new()));
        }

        let position: u64 = match cursor.token() {
            "" => 0,
            token => token
                .parse()
                .map_err(|_| CacheError::Internal(format!("malformed scan cursor {}", token)))?,
        };

        let (next, keys): (u64, Vec<String>) = self
            .query_node(
                cursor.node(),
                redis::cmd("SCAN")
                    .cursor_arg(position)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(limit.max(1)),
            )
            .await?;

        let next = if next != 0 {
            RemoteCursor::at(cursor.node(), next.to_string())
        } else if cursor.node() + 1 < self.node_count() {
            RemoteCursor::at(cursor.node() + 1, "")
        } else {
            RemoteCursor::finished()
        };
        Ok((next, keys))
    }

    async fn flush_all(&self) -> Result<()> {
        for node in 0..self.node_count() {
            self.query_node::<()>(node, &redis::cmd("FLUSHALL")).await?;
        }
        Ok(())
    }

    async fn set_pipelined(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Result<bool> {
        if entries.is_empty() {
            return Ok(true);
        }

        let outcome = match &self.topology {
            Topology::Single(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| CacheError::RemoteUnavailable(e.to_string()))?;

                let mut pipe = redis::pipe();
                for (key, value) in &entries {
                    pipe.add_command(set_cmd(key, value, ttl, false)).ignore();
                }
                tokio::time::timeout(timeout, pipe.query_async::<()>(&mut *conn))
                    .await
                    .map(|res| res.map_err(map_redis_error))
            }
            // No cross-slot transaction: independent writes awaited together
            Topology::Cluster { conn, .. } => {
                let writes = entries.iter().map(|(key, value)| {
                    let mut conn = conn.clone();
                    let cmd = set_cmd(key, value, ttl, false);
                    async move { cmd.query_async::<()>(&mut conn).await }
                });
                tokio::time::timeout(timeout, futures::future::join_all(writes))
                    .await
                    .map(|results| {
                        results
                            .into_iter()
                            .collect::<std::result::Result<Vec<()>, RedisError>>()
                            .map(|_| ())
                            .map_err(map_redis_error)
                    })
            }
        };

        match outcome {
            Ok(Ok(())) => Ok(true),
            Ok(Err(e)) => {
                warn!(target: "tiercache", error = %e, entries = entries.len(), "pipelined write failed");
                Ok(false)
            }
            Err(_) => {
                warn!(
                    target: "tiercache",
                    timeout_ms = timeout.as_millis() as u64,
                    entries = entries.len(),
                    "pipelined write timed out"
                );
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl AggregateStore for RedisStore {
    async fn counter_incr(&self, key: &str, delta: i64) -> Result<i64> {
        self.query(redis::cmd("INCRBY").arg(key).arg(delta)).await
    }

    async fn counter_get(&self, key: &str) -> Result<i64> {
        let value: Option<i64> = self.query(redis::cmd("GET").arg(key)).await?;
        Ok(value.unwrap_or(0))
    }

    async fn counter_set(&self, key: &str, value: i64) -> Result<()> {
        self.query(redis::cmd("SET").arg(key).arg(value)).await
    }

    async fn list_push(&self, key: &str, items: Vec<Vec<u8>>) -> Result<u64> {
        if items.is_empty() {
            return self.list_len(key).await;
        }
        self.query(redis::cmd("RPUSH").arg(key).arg(items)).await
    }

    async fn list_items(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.query(redis::cmd("LRANGE").arg(key).arg(0).arg(-1)).await
    }

    async fn list_remove(&self, key: &str, item: &[u8]) -> Result<u64> {
        self.query(redis::cmd("LREM").arg(key).arg(0).arg(item)).await
    }

    async fn list_len(&self, key: &str) -> Result<u64> {
        self.query(redis::cmd("LLEN").arg(key)).await
    }

    async fn set_add(&self, key: &str, members: Vec<Vec<u8>>) -> Result<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        self.query(redis::cmd("SADD").arg(key).arg(members)).await
    }

    async fn set_remove(&self, key: &str, member: &[u8]) -> Result<bool> {
        let removed: u64 = self.query(redis::cmd("SREM").arg(key).arg(member)).await?;
        Ok(removed > 0)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.query(redis::cmd("SMEMBERS").arg(key)).await
    }

    async fn set_contains(&self, key: &str, member: &[u8]) -> Result<bool> {
        self.query(redis::cmd("SISMEMBER").arg(key).arg(member)).await
    }

    async fn set_len(&self, key: &str) -> Result<u64> {
        self.query(redis::cmd("SCARD").arg(key)).await
    }
}

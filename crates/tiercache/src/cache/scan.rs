//! Cursor-based key scans over one namespace

use std::collections::HashSet;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tiercache_core::{CacheError, CacheMetrics, CacheOperation, RemoteCursor, Result, Serializer};

use super::{TieredCache, Tiers};

/// Keys requested per scan step when driving a scan to completion
pub const DEFAULT_SCAN_LIMIT: usize = 1000;

/// Resume point of a key scan
///
/// Cursors only move forward: each [`advance`](TieredCache::advance) yields
/// the next page and a new cursor. A cursor belongs to the namespace that
/// issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    position: RemoteCursor,
    pattern: String,
    limit: usize,
    namespace: String,
}

impl ScanCursor {
    /// Logical key prefix being scanned
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Keys requested per step
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// One step of a key scan
#[derive(Debug, Clone)]
pub struct ScanPage {
    /// Logical keys, namespace prefix removed
    pub keys: Vec<String>,
    /// Cursor for the next step, `None` once the keyspace is exhausted
    pub next: Option<ScanCursor>,
}

impl ScanPage {
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

impl<V, S, M> TieredCache<V, S, M>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
    M: CacheMetrics,
{
    /// First page of keys starting with `pattern`
    ///
    /// `limit` is a hint for how many keys the remote store examines per
    /// step; a page may hold fewer keys, or none, without being the last.
    /// Keys present for the whole scan are returned at least once.
    pub async fn scan_keys(&self, pattern: &str, limit: usize) -> Result<ScanPage> {
        let cursor = ScanCursor {
            position: RemoteCursor::start(),
            pattern: pattern.to_string(),
            limit: limit.max(1),
            namespace: self.namespace.id().to_string(),
        };
        self.advance(&cursor).await
    }

    /// First page of every key in the namespace
    pub async fn scan_all_keys(&self, limit: usize) -> Result<ScanPage> {
        self.scan_keys("", limit).await
    }

    /// Next page after `cursor`
    pub async fn advance(&self, cursor: &ScanCursor) -> Result<ScanPage> {
        self.ensure_open()?;
        let remote = self.require_remote("key scans")?;
        if cursor.namespace != self.namespace.id() {
            return Err(CacheError::InvalidConfig(format!(
                "cursor of namespace {} used on namespace {}",
                cursor.namespace,
                self.namespace.id()
            )));
        }
        let start = Instant::now();

        let (position, physical) = remote
            .scan(
                &cursor.position,
                &self.namespace.match_pattern(&cursor.pattern),
                cursor.limit,
            )
            .await?;
        let keys = physical
            .iter()
            .filter_map(|key| self.namespace.logical(key))
            .map(str::to_string)
            .collect();

        self.metrics
            .record_latency(CacheOperation::Scan, start.elapsed());
        let next = (!position.is_finished()).then(|| ScanCursor {
            position,
            ..cursor.clone()
        });
        Ok(ScanPage { keys, next })
    }

    /// Every key of the namespace
    ///
    /// Local-only caches answer from the local store, collection names
    /// included.
    pub async fn get_all_keys(&self) -> Result<HashSet<String>> {
        self.ensure_open()?;
        if let Tiers::Local(local) = &*self.tiers {
            return Ok(local.keys().into_iter().collect());
        }
        self.collect_keys("").await
    }

    /// Every key of the namespace starting with `pattern`
    pub async fn get_key_list_by_pattern(&self, pattern: &str) -> Result<HashSet<String>> {
        self.collect_keys(pattern).await
    }

    async fn collect_keys(&self, pattern: &str) -> Result<HashSet<String>> {
        let mut keys = HashSet::new();
        let mut page = self.scan_keys(pattern, DEFAULT_SCAN_LIMIT).await?;
        loop {
            keys.extend(page.keys.drain(..));
            let Some(next) = page.next.take() else {
                break;
            };
            page = self.advance(&next).await?;
        }
        Ok(keys)
    }
}

//! In-process cache tier using DashMap

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tiercache_core::{CacheEntry, CacheError, LocalStats, Result};

use super::coalescer::Coalescer;
use super::expiry::ExpiryWheel;

/// Configuration for the local tier
#[derive(Debug, Clone)]
pub struct LocalConfig {
    /// Maximum number of entries per map (0 = unlimited)
    pub max_capacity: usize,
    /// Entries are dropped this long after they were written
    pub expire_after_write: Option<Duration>,
    /// Resolution of the expiry wheel
    pub tick: Duration,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            max_capacity: 500,
            expire_after_write: Some(Duration::from_secs(7 * 24 * 60 * 60)),
            tick: Duration::from_secs(1),
        }
    }
}

impl LocalConfig {
    /// Create config with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            max_capacity: capacity,
            ..Default::default()
        }
    }

    /// Set the expire-after-write bound
    pub fn expire_after_write(mut self, expiry: Option<Duration>) -> Self {
        self.expire_after_write = expiry;
        self
    }
}

/// A value produced by a miss-path load, with the TTL it should carry
#[derive(Debug, Clone)]
pub struct Loaded {
    pub value: Vec<u8>,
    pub ttl: Option<Duration>,
}

#[derive(Debug, Clone)]
enum Collection {
    List(Vec<Vec<u8>>),
    Set(HashSet<Vec<u8>>),
}

impl Collection {
    fn kind(&self) -> &'static str {
        match self {
            Collection::List(_) => "list",
            Collection::Set(_) => "set",
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    writes: u64,
    removals: u64,
    expirations: u64,
    evictions: u64,
}

/// In-process cache tier
///
/// Values are kept as encoded bytes, so every read hands out a fresh copy
/// and the tier is shared safely between caches of different value types.
/// Cloning creates a new handle to the SAME underlying store.
#[derive(Clone)]
pub struct LocalStore {
    data: Arc<DashMap<String, CacheEntry<Vec<u8>>>>,
    collections: Arc<DashMap<String, CacheEntry<Collection>>>,
    expiry: Arc<Mutex<ExpiryWheel>>,
    stats: Arc<RwLock<Counters>>,
    loads: Coalescer<Option<Vec<u8>>>,
    config: LocalConfig,
}

impl LocalStore {
    /// Create a new local store
    pub fn new(config: LocalConfig) -> Self {
        let span = config
            .expire_after_write
            .unwrap_or(Duration::from_secs(3600));
        let wheel = ExpiryWheel::new(config.tick, span);

        Self {
            data: Arc::new(DashMap::with_capacity(config.max_capacity.min(10_000))),
            collections: Arc::new(DashMap::new()),
            expiry: Arc::new(Mutex::new(wheel)),
            stats: Arc::new(RwLock::new(Counters::default())),
            loads: Coalescer::new(),
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults() -> Self {
        Self::new(LocalConfig::default())
    }

    pub fn config(&self) -> &LocalConfig {
        &self.config
    }

    /// Per-entry TTL bounded by the expire-after-write setting
    fn effective_ttl(&self, ttl: Option<Duration>) -> Option<Duration> {
        match (ttl, self.config.expire_after_write) {
            (Some(ttl), Some(max)) => Some(ttl.min(max)),
            (ttl, max) => ttl.or(max),
        }
    }

    fn new_entry(&self, value: Vec<u8>, ttl: Option<Duration>) -> CacheEntry<Vec<u8>> {
        CacheEntry::new(value, self.effective_ttl(ttl))
    }

    fn schedule(&self, key: &str, ttl: Option<Duration>) {
        let mut wheel = self.expiry.lock();
        match ttl {
            Some(ttl) => wheel.schedule(key.to_string(), ttl),
            None => wheel.remove(key),
        }
    }

    /// Drop the entries whose deadline the wheel has reached
    ///
    /// Runs on every write, so expired values leave the map without a scan.
    fn drain_expired(&self) -> usize {
        let due = self.expiry.lock().advance();
        let mut count = 0;
        for key in due {
            if self
                .data
                .remove_if(&key, |_, entry| entry.is_expired())
                .is_some()
            {
                count += 1;
            }
        }
        if count > 0 {
            self.stats.write().expirations += count as u64;
        }
        count
    }

    /// Make room for one more entry
    ///
    /// Expired entries go first; if that is not enough the oldest writes are
    /// evicted.
    fn maybe_evict(&self) {
        let cap = self.config.max_capacity;
        if cap == 0 || self.data.len() < cap {
            return;
        }

        let mut by_age: Vec<(String, std::time::Instant, bool)> = self
            .data
            .iter()
            .map(|entry| (entry.key().clone(), entry.written_at, entry.is_expired()))
            .collect();
        // expired entries the wheel has not reached yet sort first
        by_age.sort_by_key(|(_, written, expired)| (!*expired, *written));

        let excess = self.data.len() + 1 - cap;
        for (key, _, expired) in by_age.into_iter().take(excess) {
            if self.data.remove(&key).is_some() {
                self.expiry.lock().remove(&key);
                let mut stats = self.stats.write();
                if expired {
                    stats.expirations += 1;
                } else {
                    stats.evictions += 1;
                }
            }
        }
    }

    fn holds_live(&self, key: &str) -> bool {
        self.data.get(key).is_some_and(|entry| !entry.is_expired())
    }

    /// Insert a key that must not already hold a live value
    ///
    /// A rejected insert leaves every other entry in place.
    pub fn insert(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.drain_expired();
        if self.holds_live(key) {
            return Err(CacheError::DuplicateKey(key.to_string()));
        }
        self.maybe_evict();

        let entry = self.new_entry(value, ttl);
        let ttl = entry.ttl();
        match self.data.entry(key.to_string()) {
            // a concurrent insert won between the check and the write
            Entry::Occupied(o) if !o.get().is_expired() => {
                return Err(CacheError::DuplicateKey(key.to_string()));
            }
            Entry::Occupied(mut o) => {
                o.insert(entry);
            }
            Entry::Vacant(v) => {
                v.insert(entry);
            }
        }

        self.schedule(key, ttl);
        self.stats.write().writes += 1;
        Ok(())
    }

    /// Write a value, overwriting any previous one
    pub fn put(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        self.drain_expired();
        if !self.data.contains_key(key) {
            self.maybe_evict();
        }
        let entry = self.new_entry(value, ttl);
        let ttl = entry.ttl();

        self.data.insert(key.to_string(), entry);
        self.schedule(key, ttl);
        self.stats.write().writes += 1;
    }

    /// Read a copy of the live value under `key`
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let hit = match self.data.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(entry) => {
                drop(entry);
                self.evict_expired(key);
                None
            }
            None => None,
        };

        let mut stats = self.stats.write();
        if hit.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        hit
    }

    fn evict_expired(&self, key: &str) {
        if self
            .data
            .remove_if(key, |_, entry| entry.is_expired())
            .is_some()
        {
            self.expiry.lock().remove(key);
            self.stats.write().expirations += 1;
        }
    }

    /// Whether `key` holds a live value
    pub fn contains(&self, key: &str) -> bool {
        self.data
            .get(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Remaining lifetime of a live entry
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        self.data
            .get(key)
            .filter(|entry| !entry.is_expired())
            .and_then(|entry| entry.remaining())
    }

    /// Remove a value; returns whether a live value was removed
    pub fn remove(&self, key: &str) -> bool {
        match self.data.remove(key) {
            Some((_, entry)) => {
                self.expiry.lock().remove(key);
                self.stats.write().removals += 1;
                !entry.is_expired()
            }
            None => false,
        }
    }

    /// Read the value for `key`, running `load` on a miss
    ///
    /// Concurrent misses on one key share a single `load`. A loaded value is
    /// cached before it is returned.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Loaded>>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(Some(value));
        }
        self.load_missing(key, load).await
    }

    /// The miss half of [`get_or_load`](Self::get_or_load), for callers that
    /// already looked `key` up with [`get`](Self::get)
    pub async fn load_missing<F, Fut>(&self, key: &str, load: F) -> Result<Option<Vec<u8>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Loaded>>>,
    {
        self.loads
            .run(key, || async {
                // Another flight may have filled the slot after our miss
                if let Some(value) = self.data.get(key).filter(|e| !e.is_expired()) {
                    return Ok(Some(value.value.clone()));
                }
                match load().await? {
                    Some(loaded) => {
                        self.put(key, loaded.value.clone(), loaded.ttl);
                        Ok(Some(loaded.value))
                    }
                    None => Ok(None),
                }
            })
            .await
    }

    /// Live value and collection names
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .data
            .iter()
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.key().clone())
            .collect();
        keys.extend(
            self.collections
                .iter()
                .filter(|entry| !entry.is_expired())
                .map(|entry| entry.key().clone()),
        );
        keys
    }

    /// Drop every value and collection
    pub fn purge(&self) {
        self.data.clear();
        self.collections.clear();
        self.expiry.lock().clear();
    }

    /// Number of stored values (expired ones included until cleanup)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Run expiry now and return the number of values and collections removed
    pub fn cleanup_expired(&self) -> usize {
        let values = self.drain_expired();
        let before = self.collections.len();
        self.collections.retain(|_, entry| !entry.is_expired());
        values + (before - self.collections.len())
    }

    /// Get approximate memory usage
    pub fn memory_usage(&self) -> usize {
        self.data
            .iter()
            .map(|entry| entry.value.len() + entry.key().len())
            .sum()
    }

    pub fn stats(&self) -> LocalStats {
        let counters = self.stats.read();
        LocalStats {
            hits: counters.hits,
            misses: counters.misses,
            writes: counters.writes,
            removals: counters.removals,
            expirations: counters.expirations,
            evictions: counters.evictions,
            entries: self.data.len(),
            collections: self.collections.len(),
            approx_bytes: self.memory_usage(),
        }
    }

    // Collections. Readers always get snapshots.

    fn with_collection<R>(
        &self,
        name: &str,
        empty: fn() -> Collection,
        f: impl FnOnce(&mut Collection) -> Result<R>,
    ) -> Result<R> {
        if !self.collections.contains_key(name) {
            self.evict_collections();
        }
        let mut entry = self
            .collections
            .entry(name.to_string())
            .or_insert_with(|| CacheEntry::new(empty(), self.config.expire_after_write));
        if entry.is_expired() {
            entry.renew(empty());
        }
        let wanted = empty().kind();
        if entry.value.kind() != wanted {
            return Err(CacheError::WrongType(format!(
                "{} holds a {}, not a {}",
                name,
                entry.value.kind(),
                wanted
            )));
        }
        f(&mut entry.value)
    }

    fn read_collection<R>(
        &self,
        name: &str,
        kind: &'static str,
        f: impl FnOnce(&Collection) -> R,
        absent: R,
    ) -> Result<R> {
        match self.collections.get(name) {
            Some(entry) if !entry.is_expired() => {
                if entry.value.kind() != kind {
                    return Err(CacheError::WrongType(format!(
                        "{} holds a {}, not a {}",
                        name,
                        entry.value.kind(),
                        kind
                    )));
                }
                Ok(f(&entry.value))
            }
            _ => Ok(absent),
        }
    }

    fn evict_collections(&self) {
        let cap = self.config.max_capacity;
        if cap == 0 || self.collections.len() < cap {
            return;
        }
        self.collections.retain(|_, entry| !entry.is_expired());
        while self.collections.len() >= cap {
            let oldest = self
                .collections
                .iter()
                .min_by_key(|entry| entry.written_at)
                .map(|entry| entry.key().clone());
            match oldest {
                Some(key) => {
                    self.collections.remove(&key);
                    self.stats.write().evictions += 1;
                }
                None => break,
            }
        }
    }

    /// Append items to a list; returns the new length
    pub fn list_push(&self, name: &str, items: Vec<Vec<u8>>) -> Result<u64> {
        self.with_collection(name, || Collection::List(Vec::new()), |c| match c {
            Collection::List(list) => {
                list.extend(items);
                Ok(list.len() as u64)
            }
            Collection::Set(_) => Err(CacheError::WrongType(name.to_string())),
        })
    }

    /// Snapshot of a list
    pub fn list_items(&self, name: &str) -> Result<Vec<Vec<u8>>> {
        self.read_collection(
            name,
            "list",
            |c| match c {
                Collection::List(list) => list.clone(),
                Collection::Set(_) => Vec::new(),
            },
            Vec::new(),
        )
    }

    /// Remove every occurrence of `item`; returns the number removed
    pub fn list_remove(&self, name: &str, item: &[u8]) -> Result<u64> {
        self.with_collection(name, || Collection::List(Vec::new()), |c| match c {
            Collection::List(list) => {
                let before = list.len();
                list.retain(|existing| existing.as_slice() != item);
                Ok((before - list.len()) as u64)
            }
            Collection::Set(_) => Err(CacheError::WrongType(name.to_string())),
        })
    }

    /// Add members to a set; returns how many were new
    pub fn set_add(&self, name: &str, members: Vec<Vec<u8>>) -> Result<u64> {
        self.with_collection(name, || Collection::Set(HashSet::new()), |c| match c {
            Collection::Set(set) => {
                let added = members.into_iter().filter(|m| set.insert(m.clone())).count();
                Ok(added as u64)
            }
            Collection::List(_) => Err(CacheError::WrongType(name.to_string())),
        })
    }

    pub fn set_remove(&self, name: &str, member: &[u8]) -> Result<bool> {
        self.with_collection(name, || Collection::Set(HashSet::new()), |c| match c {
            Collection::Set(set) => Ok(set.remove(member)),
            Collection::List(_) => Err(CacheError::WrongType(name.to_string())),
        })
    }

    /// Snapshot of a set
    pub fn set_members(&self, name: &str) -> Result<Vec<Vec<u8>>> {
        self.read_collection(
            name,
            "set",
            |c| match c {
                Collection::Set(set) => set.iter().cloned().collect(),
                Collection::List(_) => Vec::new(),
            },
            Vec::new(),
        )
    }

    pub fn set_contains(&self, name: &str, member: &[u8]) -> Result<bool> {
        self.read_collection(
            name,
            "set",
            |c| matches!(c, Collection::Set(set) if set.contains(member)),
            false,
        )
    }

    /// Number of items in a list or set
    pub fn collection_len(&self, name: &str) -> usize {
        match self.collections.get(name) {
            Some(entry) if !entry.is_expired() => match &entry.value {
                Collection::List(list) => list.len(),
                Collection::Set(set) => set.len(),
            },
            _ => 0,
        }
    }

    /// Drop a collection; returns whether a live one existed
    pub fn remove_collection(&self, name: &str) -> bool {
        self.collections
            .remove(name)
            .is_some_and(|(_, entry)| !entry.is_expired())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_put_get() {
        let store = LocalStore::with_defaults();
        store.put("key1", b"value1".to_vec(), Some(Duration::from_secs(60)));

        assert_eq!(store.get("key1"), Some(b"value1".to_vec()));
        assert_eq!(store.get("missing"), None);

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_insert_rejects_live_key() {
        let store = LocalStore::with_defaults();
        store.insert("k", b"1".to_vec(), None).unwrap();

        let err = store.insert("k", b"2".to_vec(), None).unwrap_err();
        assert!(matches!(err, CacheError::DuplicateKey(k) if k == "k"));
        assert_eq!(store.get("k"), Some(b"1".to_vec()));
    }

    #[test]
    fn test_insert_over_expired_key() {
        let store = LocalStore::with_defaults();
        store
            .insert("k", b"1".to_vec(), Some(Duration::from_millis(10)))
            .unwrap();
        std::thread::sleep(Duration::from_millis(30));

        store.insert("k", b"2".to_vec(), None).unwrap();
        assert_eq!(store.get("k"), Some(b"2".to_vec()));
    }

    #[test]
    fn test_ttl_expiry() {
        let store = LocalStore::with_defaults();
        store.put("k", b"v".to_vec(), Some(Duration::from_millis(20)));
        assert!(store.contains("k"));

        std::thread::sleep(Duration::from_millis(50));
        assert!(!store.contains("k"));
        assert_eq!(store.get("k"), None);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn test_expire_after_write_bounds_ttl() {
        let config = LocalConfig::default().expire_after_write(Some(Duration::from_secs(5)));
        let store = LocalStore::new(config);

        store.put("no_ttl", b"v".to_vec(), None);
        store.put("long_ttl", b"v".to_vec(), Some(Duration::from_secs(3600)));

        assert!(store.ttl("no_ttl").unwrap() <= Duration::from_secs(5));
        assert!(store.ttl("long_ttl").unwrap() <= Duration::from_secs(5));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = LocalStore::new(LocalConfig::with_capacity(3));
        for key in ["a", "b", "c"] {
            store.put(key, b"v".to_vec(), None);
            std::thread::sleep(Duration::from_millis(2));
        }
        store.put("d", b"v".to_vec(), None);

        assert_eq!(store.len(), 3);
        assert!(!store.contains("a"));
        assert!(store.contains("d"));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_duplicate_insert_at_capacity_evicts_nothing() {
        let store = LocalStore::new(LocalConfig::with_capacity(3));
        for key in ["a", "b", "c"] {
            store.insert(key, key.as_bytes().to_vec(), None).unwrap();
            std::thread::sleep(Duration::from_millis(2));
        }

        // "a" is the oldest entry and must not be evicted to make room for itself
        let err = store.insert("a", b"again".to_vec(), None).unwrap_err();
        assert!(matches!(err, CacheError::DuplicateKey(k) if k == "a"));
        assert_eq!(store.get("a"), Some(b"a".to_vec()));
        assert_eq!(store.len(), 3);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_writes_drain_expired_entries() {
        let config = LocalConfig {
            tick: Duration::from_millis(5),
            ..Default::default()
        };
        let store = LocalStore::new(config);
        store.put("short", b"v".to_vec(), Some(Duration::from_millis(10)));

        std::thread::sleep(Duration::from_millis(40));
        store.put("other", b"v".to_vec(), None);

        assert_eq!(store.len(), 1);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_full_store_reclaims_expired_before_evicting() {
        let store = LocalStore::new(LocalConfig::with_capacity(2));
        store.put("stale", b"v".to_vec(), Some(Duration::from_millis(5)));
        store.put("keep", b"v".to_vec(), None);
        std::thread::sleep(Duration::from_millis(20));

        store.put("new", b"v".to_vec(), None);

        assert!(store.contains("keep"));
        assert!(store.contains("new"));
        let stats = store.stats();
        assert_eq!((stats.expirations, stats.evictions), (1, 0));
    }

    #[test]
    fn test_unrepresentable_ttl_is_kept_without_expiry() {
        let store = LocalStore::new(LocalConfig::default().expire_after_write(None));
        store
            .insert("k", b"v".to_vec(), Some(Duration::from_secs(u64::MAX)))
            .unwrap();

        assert_eq!(store.get("k"), Some(b"v".to_vec()));
        assert_eq!(store.ttl("k"), None);
    }

    #[test]
    fn test_remove() {
        let store = LocalStore::with_defaults();
        store.put("k", b"v".to_vec(), None);

        assert!(store.remove("k"));
        assert!(!store.remove("k"));
        assert!(!store.contains("k"));
    }

    #[test]
    fn test_cleanup_expired() {
        let config = LocalConfig {
            tick: Duration::from_millis(5),
            ..Default::default()
        };
        let store = LocalStore::new(config);
        store.put("short", b"v".to_vec(), Some(Duration::from_millis(10)));
        store.put("long", b"v".to_vec(), Some(Duration::from_secs(60)));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(store.cleanup_expired(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_or_load_caches_result() {
        let store = LocalStore::with_defaults();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = store
                .get_or_load("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(Loaded {
                        value: b"loaded".to_vec(),
                        ttl: None,
                    }))
                })
                .await
                .unwrap();
            assert_eq!(value, Some(b"loaded".to_vec()));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_load_none_is_not_cached() {
        let store = LocalStore::with_defaults();
        let value = store.get_or_load("k", || async { Ok(None) }).await.unwrap();

        assert_eq!(value, None);
        assert!(!store.contains("k"));
    }

    #[tokio::test]
    async fn test_load_missing_counts_one_miss() {
        let store = LocalStore::with_defaults();
        assert_eq!(store.get("k"), None);

        let value = store
            .load_missing("k", || async {
                Ok(Some(Loaded {
                    value: b"v".to_vec(),
                    ttl: None,
                }))
            })
            .await
            .unwrap();

        assert_eq!(value, Some(b"v".to_vec()));
        let stats = store.stats();
        assert_eq!((stats.hits, stats.misses, stats.writes), (0, 1, 1));
    }

    #[test]
    fn test_list_snapshot_is_detached() {
        let store = LocalStore::with_defaults();
        store
            .list_push("l", vec![b"a".to_vec(), b"b".to_vec()])
            .unwrap();

        let mut snapshot = store.list_items("l").unwrap();
        snapshot.push(b"c".to_vec());

        assert_eq!(store.list_items("l").unwrap().len(), 2);
        assert_eq!(store.collection_len("l"), 2);
    }

    #[test]
    fn test_list_remove_all_occurrences() {
        let store = LocalStore::with_defaults();
        store
            .list_push("l", vec![b"a".to_vec(), b"b".to_vec(), b"a".to_vec()])
            .unwrap();

        assert_eq!(store.list_remove("l", b"a").unwrap(), 2);
        assert_eq!(store.list_items("l").unwrap(), vec![b"b".to_vec()]);
    }

    #[test]
    fn test_set_members() {
        let store = LocalStore::with_defaults();
        assert_eq!(
            store
                .set_add("s", vec![b"x".to_vec(), b"y".to_vec(), b"x".to_vec()])
                .unwrap(),
            2
        );
        assert!(store.set_contains("s", b"x").unwrap());
        assert!(store.set_remove("s", b"x").unwrap());
        assert!(!store.set_contains("s", b"x").unwrap());
        assert_eq!(store.set_members("s").unwrap(), vec![b"y".to_vec()]);
    }

    #[test]
    fn test_collection_wrong_type() {
        let store = LocalStore::with_defaults();
        store.set_add("names", vec![b"x".to_vec()]).unwrap();

        assert!(matches!(
            store.list_push("names", vec![b"y".to_vec()]),
            Err(CacheError::WrongType(_))
        ));
        assert!(matches!(
            store.list_items("names"),
            Err(CacheError::WrongType(_))
        ));
    }

    #[test]
    fn test_keys_include_collections() {
        let store = LocalStore::with_defaults();
        store.put("value", b"v".to_vec(), None);
        store.list_push("list", vec![b"a".to_vec()]).unwrap();

        let mut keys = store.keys();
        keys.sort();
        assert_eq!(keys, vec!["list".to_string(), "value".to_string()]);

        store.purge();
        assert!(store.keys().is_empty());
    }
}

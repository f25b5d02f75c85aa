//! In-process stand-in for the remote tier

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tiercache_core::{AggregateStore, CacheError, RemoteCursor, RemoteStore, Result};

use super::glob::glob_match;

#[derive(Debug, Clone)]
enum Value {
    Bytes(Vec<u8>),
    List(Vec<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Inner {
    data: Mutex<BTreeMap<String, Slot>>,
    unavailable: AtomicBool,
    pipeline_delay: Mutex<Option<Duration>>,
    calls: Mutex<HashMap<&'static str, u64>>,
}

/// A remote store that lives in this process
///
/// Behaves like a single Redis node: per-key TTLs, `SET NX`, glob `MATCH`,
/// wrong-type errors and a resumable scan cursor. Keys are kept ordered and
/// the cursor is the last key examined, so keys that stay put during a scan
/// are returned exactly once.
///
/// It records how many times each command ran and can be switched off to
/// simulate an outage, which makes it the backend of choice for tests and
/// local development. Cloning creates a new handle to the SAME store.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Inner>,
}

fn wrong_type(key: &str) -> CacheError {
    CacheError::WrongType(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
        key
    ))
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the server going away (`false`) or coming back (`true`)
    pub fn set_available(&self, available: bool) {
        self.inner.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Delay applied to pipelined writes before they are applied
    pub fn set_pipeline_delay(&self, delay: Option<Duration>) {
        *self.inner.pipeline_delay.lock() = delay;
    }

    /// How many times `command` was issued (e.g. `"exists"`, `"set_nx"`)
    pub fn calls(&self, command: &str) -> u64 {
        self.inner.calls.lock().get(command).copied().unwrap_or(0)
    }

    /// Total number of commands issued
    pub fn total_calls(&self) -> u64 {
        self.inner.calls.lock().values().sum()
    }

    pub fn reset_calls(&self) {
        self.inner.calls.lock().clear();
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.inner
            .data
            .lock()
            .values()
            .filter(|slot| slot.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining TTL of a live key; `None` when absent or persistent
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.inner
            .data
            .lock()
            .get(key)
            .filter(|slot| slot.is_live(now))
            .and_then(|slot| slot.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    fn command(&self, name: &'static str) -> Result<()> {
        *self.inner.calls.lock().entry(name).or_insert(0) += 1;
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::RemoteUnavailable(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }

    /// Run `f` against the map after dropping expired keys it might touch
    fn with_data<R>(&self, key: &str, f: impl FnOnce(&mut BTreeMap<String, Slot>) -> R) -> R {
        let mut data = self.inner.data.lock();
        let now = Instant::now();
        if data.get(key).is_some_and(|slot| !slot.is_live(now)) {
            data.remove(key);
        }
        f(&mut data)
    }

    fn write(data: &mut BTreeMap<String, Slot>, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        data.insert(
            key.to_string(),
            Slot {
                value: Value::Bytes(value),
                expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
            },
        );
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn exists(&self, key: &str) -> Result<bool> {
        self.command("exists")?;
        Ok(self.with_data(key, |data| data.contains_key(key)))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.command("get")?;
        self.with_data(key, |data| match data.get(key) {
            Some(Slot {
                value: Value::Bytes(bytes),
                ..
            }) => Ok(Some(bytes.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        })
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        self.command("set")?;
        self.with_data(key, |data| Self::write(data, key, value, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<bool> {
        self.command("set_nx")?;
        Ok(self.with_data(key, |data| {
            if data.contains_key(key) {
                false
            } else {
                Self::write(data, key, value, ttl);
                true
            }
        }))
    }

    async fn delete(&self, keys: &[String]) -> Result<u64> {
        self.command("del")?;
        let now = Instant::now();
        let mut data = self.inner.data.lock();
        let removed = keys
            .iter()
            .filter_map(|key| data.remove(key))
            .filter(|slot| slot.is_live(now))
            .count();
        Ok(removed as u64)
    }

    async fn scan(
        &self,
        cursor: &RemoteCursor,
        pattern: &str,
        limit: usize,
    ) -> Result<(RemoteCursor, Vec<String>)> {
        self.command("scan")?;
        if cursor.is_finished() {
            return Ok((RemoteCursor::finished(), Vec::new()));
        }

        let now = Instant::now();
        let data = self.inner.data.lock();
        let lower = match cursor.token() {
            "" => Bound::Unbounded,
            token => Bound::Excluded(token.to_string()),
        };

        let mut examined = 0;
        let mut last = None;
        let mut keys = Vec::new();
        for (key, slot) in data.range::<String, _>((lower, Bound::Unbounded)) {
            if examined == limit.max(1) {
                break;
            }
            examined += 1;
            last = Some(key);
            if slot.is_live(now) && glob_match(pattern, key) {
                keys.push(key.clone());
            }
        }

        let more = match last {
            Some(last) => data
                .range::<String, _>((Bound::Excluded(last), Bound::Unbounded))
                .next()
                .is_some(),
            None => false,
        };
        let next = match (more, last) {
            (true, Some(last)) => RemoteCursor::at(0, last.clone()),
            _ => RemoteCursor::finished(),
        };
        Ok((next, keys))
    }

    async fn flush_all(&self) -> Result<()> {
        self.command("flushall")?;
        self.inner.data.lock().clear();
        Ok(())
    }

    async fn set_pipelined(
        &self,
        entries: Vec<(String, Vec<u8>)>,
        ttl: Option<Duration>,
        timeout: Duration,
    ) -> Result<bool> {
        self.command("pipeline")?;
        let delay = *self.inner.pipeline_delay.lock();

        let apply = async {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let mut data = self.inner.data.lock();
            for (key, value) in entries {
                Self::write(&mut data, &key, value, ttl);
            }
        };

        Ok(tokio::time::timeout(timeout, apply).await.is_ok())
    }
}

#[async_trait]
impl AggregateStore for MemoryRemote {
    async fn counter_incr(&self, key: &str, delta: i64) -> Result<i64> {
        self.command("incrby")?;
        self.with_data(key, |data| {
            let current = match data.get(key) {
                Some(Slot {
                    value: Value::Bytes(bytes),
                    ..
                }) => parse_counter(key, bytes)?,
                Some(_) => return Err(wrong_type(key)),
                None => 0,
            };
            let next = current.checked_add(delta).ok_or_else(|| {
                CacheError::Backend("increment or decrement would overflow".to_string())
            })?;
            let expires_at = data.get(key).and_then(|slot| slot.expires_at);
            data.insert(
                key.to_string(),
                Slot {
                    value: Value::Bytes(next.to_string().into_bytes()),
                    expires_at,
                },
            );
            Ok(next)
        })
    }

    async fn counter_get(&self, key: &str) -> Result<i64> {
        self.command("get")?;
        self.with_data(key, |data| match data.get(key) {
            Some(Slot {
                value: Value::Bytes(bytes),
                ..
            }) => parse_counter(key, bytes),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        })
    }

    async fn counter_set(&self, key: &str, value: i64) -> Result<()> {
        self.command("set")?;
        self.with_data(key, |data| {
            Self::write(data, key, value.to_string().into_bytes(), None)
        });
        Ok(())
    }

    async fn list_push(&self, key: &str, items: Vec<Vec<u8>>) -> Result<u64> {
        self.command("rpush")?;
        self.with_data(key, |data| {
            let slot = data.entry(key.to_string()).or_insert_with(|| Slot {
                value: Value::List(Vec::new()),
                expires_at: None,
            });
            match &mut slot.value {
                Value::List(list) => {
                    list.extend(items);
                    Ok(list.len() as u64)
                }
                _ => Err(wrong_type(key)),
            }
        })
    }

    async fn list_items(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.command("lrange")?;
        self.with_data(key, |data| match data.get(key).map(|slot| &slot.value) {
            Some(Value::List(list)) => Ok(list.clone()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        })
    }

    async fn list_remove(&self, key: &str, item: &[u8]) -> Result<u64> {
        self.command("lrem")?;
        self.with_data(key, |data| {
            let removed = match data.get_mut(key).map(|slot| &mut slot.value) {
                Some(Value::List(list)) => {
                    let before = list.len();
                    list.retain(|existing| existing.as_slice() != item);
                    (before - list.len()) as u64
                }
                Some(_) => return Err(wrong_type(key)),
                None => 0,
            };
            // Redis drops emptied lists
            if matches!(data.get(key).map(|s| &s.value), Some(Value::List(l)) if l.is_empty()) {
                data.remove(key);
            }
            Ok(removed)
        })
    }

    async fn list_len(&self, key: &str) -> Result<u64> {
        self.command("llen")?;
        self.with_data(key, |data| match data.get(key).map(|slot| &slot.value) {
            Some(Value::List(list)) => Ok(list.len() as u64),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        })
    }

    async fn set_add(&self, key: &str, members: Vec<Vec<u8>>) -> Result<u64> {
        self.command("sadd")?;
        self.with_data(key, |data| {
            let slot = data.entry(key.to_string()).or_insert_with(|| Slot {
                value: Value::Set(BTreeSet::new()),
                expires_at: None,
            });
            match &mut slot.value {
                Value::Set(set) => {
                    let added = members.into_iter().filter(|m| set.insert(m.clone())).count();
                    Ok(added as u64)
                }
                _ => Err(wrong_type(key)),
            }
        })
    }

    async fn set_remove(&self, key: &str, member: &[u8]) -> Result<bool> {
        self.command("srem")?;
        self.with_data(key, |data| {
            let removed = match data.get_mut(key).map(|slot| &mut slot.value) {
                Some(Value::Set(set)) => set.remove(member),
                Some(_) => return Err(wrong_type(key)),
                None => false,
            };
            if matches!(data.get(key).map(|s| &s.value), Some(Value::Set(s)) if s.is_empty()) {
                data.remove(key);
            }
            Ok(removed)
        })
    }

    async fn set_members(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.command("smembers")?;
        self.with_data(key, |data| match data.get(key).map(|slot| &slot.value) {
            Some(Value::Set(set)) => Ok(set.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        })
    }

    async fn set_contains(&self, key: &str, member: &[u8]) -> Result<bool> {
        self.command("sismember")?;
        self.with_data(key, |data| match data.get(key).map(|slot| &slot.value) {
            Some(Value::Set(set)) => Ok(set.contains(member)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(false),
        })
    }

    async fn set_len(&self, key: &str) -> Result<u64> {
        self.command("scard")?;
        self.with_data(key, |data| match data.get(key).map(|slot| &slot.value) {
            Some(Value::Set(set)) => Ok(set.len() as u64),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        })
    }
}

fn parse_counter(key: &str, bytes: &[u8]) -> Result<i64> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CacheError::Backend(format!("value at {} is not an integer", key)))
}

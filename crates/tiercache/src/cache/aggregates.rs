//! Named counters, lists and sets shared by every instance of a namespace

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tiercache_core::{CacheMetrics, JsonSerializer, RemoteBackend, Result, Serializer};
use tiercache_storage::LocalStore;

use super::{Lifecycle, TieredCache, Tiers};

/// Where a shared collection lives
///
/// Remote modes keep collections in the remote tier only; local-only mode
/// keeps them in the local store's collection map.
enum Backing {
    Remote {
        remote: Arc<dyn RemoteBackend>,
        key: String,
    },
    Local {
        local: LocalStore,
        name: String,
    },
}

/// Atomic 64-bit counter in the remote tier
pub struct AtomicCounter {
    remote: Arc<dyn RemoteBackend>,
    key: String,
    name: String,
    lifecycle: Arc<Lifecycle>,
}

impl AtomicCounter {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value; 0 if never written
    pub async fn get(&self) -> Result<i64> {
        self.lifecycle.ensure_open()?;
        self.remote.counter_get(&self.key).await
    }

    pub async fn set(&self, value: i64) -> Result<()> {
        self.lifecycle.ensure_open()?;
        self.remote.counter_set(&self.key, value).await
    }

    /// Add `delta` and return the new value
    pub async fn add_and_get(&self, delta: i64) -> Result<i64> {
        self.lifecycle.ensure_open()?;
        self.remote.counter_incr(&self.key, delta).await
    }

    pub async fn increment_and_get(&self) -> Result<i64> {
        self.add_and_get(1).await
    }

    pub async fn decrement_and_get(&self) -> Result<i64> {
        self.add_and_get(-1).await
    }

    /// Add one and return the previous value
    pub async fn get_and_increment(&self) -> Result<i64> {
        Ok(self.add_and_get(1).await? - 1)
    }
}

/// Ordered list of encoded items
///
/// Reads return decoded snapshots; changing a snapshot never changes the
/// shared list.
pub struct SharedList<T, S = JsonSerializer> {
    backing: Backing,
    serializer: Arc<S>,
    lifecycle: Arc<Lifecycle>,
    _item: PhantomData<fn() -> T>,
}

impl<T, S> SharedList<T, S>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    S: Serializer,
{
    pub fn name(&self) -> &str {
        backing_name(&self.backing)
    }

    /// Append one item; returns the new length
    pub async fn push(&self, item: &T) -> Result<u64> {
        self.extend(std::slice::from_ref(item)).await
    }

    /// Append items in order; returns the new length
    pub async fn extend(&self, items: &[T]) -> Result<u64> {
        self.lifecycle.ensure_open()?;
        let encoded = encode_all(&*self.serializer, items)?;
        match &self.backing {
            Backing::Remote { remote, key } => remote.list_push(key, encoded).await,
            Backing::Local { local, name } => local.list_push(name, encoded),
        }
    }

    /// Snapshot of every item, in order
    pub async fn items(&self) -> Result<Vec<T>> {
        self.lifecycle.ensure_open()?;
        let raw = match &self.backing {
            Backing::Remote { remote, key } => remote.list_items(key).await?,
            Backing::Local { local, name } => local.list_items(name)?,
        };
        decode_all(&*self.serializer, raw)
    }

    /// Remove every occurrence of `item`; returns how many were removed
    pub async fn remove(&self, item: &T) -> Result<u64> {
        self.lifecycle.ensure_open()?;
        let encoded = self.serializer.serialize(item)?;
        match &self.backing {
            Backing::Remote { remote, key } => remote.list_remove(key, &encoded).await,
            Backing::Local { local, name } => local.list_remove(name, &encoded),
        }
    }

    pub async fn len(&self) -> Result<u64> {
        self.lifecycle.ensure_open()?;
        match &self.backing {
            Backing::Remote { remote, key } => remote.list_len(key).await,
            Backing::Local { local, name } => Ok(local.collection_len(name) as u64),
        }
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Drop the whole list; returns true if it existed
    pub async fn clear(&self) -> Result<bool> {
        self.lifecycle.ensure_open()?;
        clear_backing(&self.backing).await
    }
}

/// Unordered set of encoded members
///
/// Membership is decided on the encoded bytes.
pub struct SharedSet<T, S = JsonSerializer> {
    backing: Backing,
    serializer: Arc<S>,
    lifecycle: Arc<Lifecycle>,
    _item: PhantomData<fn() -> T>,
}

impl<T, S> SharedSet<T, S>
where
    T: Serialize + DeserializeOwned + Send + Sync,
    S: Serializer,
{
    pub fn name(&self) -> &str {
        backing_name(&self.backing)
    }

    /// Add a member; returns false if it was already present
    pub async fn add(&self, member: &T) -> Result<bool> {
        Ok(self.add_all(std::slice::from_ref(member)).await? > 0)
    }

    /// Add members; returns how many were new
    pub async fn add_all(&self, members: &[T]) -> Result<u64> {
        self.lifecycle.ensure_open()?;
        let encoded = encode_all(&*self.serializer, members)?;
        match &self.backing {
            Backing::Remote { remote, key } => remote.set_add(key, encoded).await,
            Backing::Local { local, name } => local.set_add(name, encoded),
        }
    }

    /// Remove a member; returns true if it was present
    pub async fn remove(&self, member: &T) -> Result<bool> {
        self.lifecycle.ensure_open()?;
        let encoded = self.serializer.serialize(member)?;
        match &self.backing {
            Backing::Remote { remote, key } => remote.set_remove(key, &encoded).await,
            Backing::Local { local, name } => local.set_remove(name, &encoded),
        }
    }

    pub async fn contains(&self, member: &T) -> Result<bool> {
        self.lifecycle.ensure_open()?;
        let encoded = self.serializer.serialize(member)?;
        match &self.backing {
            Backing::Remote { remote, key } => remote.set_contains(key, &encoded).await,
            Backing::Local { local, name } => local.set_contains(name, &encoded),
        }
    }

    /// Snapshot of every member, in no particular order
    pub async fn members(&self) -> Result<Vec<T>> {
        self.lifecycle.ensure_open()?;
        let raw = match &self.backing {
            Backing::Remote { remote, key } => remote.set_members(key).await?,
            Backing::Local { local, name } => local.set_members(name)?,
        };
        decode_all(&*self.serializer, raw)
    }

    pub async fn len(&self) -> Result<u64> {
        self.lifecycle.ensure_open()?;
        match &self.backing {
            Backing::Remote { remote, key } => remote.set_len(key).await,
            Backing::Local { local, name } => Ok(local.collection_len(name) as u64),
        }
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Drop the whole set; returns true if it existed
    pub async fn clear(&self) -> Result<bool> {
        self.lifecycle.ensure_open()?;
        clear_backing(&self.backing).await
    }
}

fn backing_name(backing: &Backing) -> &str {
    match backing {
        Backing::Remote { key, .. } => key.split_once(':').map_or(key.as_str(), |(_, name)| name),
        Backing::Local { name, .. } => name,
    }
}

async fn clear_backing(backing: &Backing) -> Result<bool> {
    match backing {
        Backing::Remote { remote, key } => Ok(remote.delete(std::slice::from_ref(key)).await? > 0),
        Backing::Local { local, name } => Ok(local.remove_collection(name)),
    }
}

fn encode_all<S: Serializer, T: Serialize>(serializer: &S, items: &[T]) -> Result<Vec<Vec<u8>>> {
    items.iter().map(|item| serializer.serialize(item)).collect()
}

fn decode_all<S: Serializer, T: DeserializeOwned>(serializer: &S, raw: Vec<Vec<u8>>) -> Result<Vec<T>> {
    raw.iter().map(|bytes| serializer.deserialize(bytes)).collect()
}

impl<V, S, M> TieredCache<V, S, M>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: Serializer,
    M: CacheMetrics,
{
    /// Counter `name` in this namespace
    ///
    /// Counters need a remote tier; local-only caches get
    /// `UnsupportedCapability`.
    pub fn shared_counter(&self, name: &str) -> Result<AtomicCounter> {
        self.ensure_open()?;
        let remote = self.require_remote("shared counters")?.clone();
        Ok(AtomicCounter {
            remote,
            key: self.namespace.counter_key(name),
            name: name.to_string(),
            lifecycle: self.lifecycle.clone(),
        })
    }

    /// List `name` in this namespace, encoded with this cache's serializer
    pub fn shared_list<T>(&self, name: &str) -> Result<SharedList<T, S>> {
        self.ensure_open()?;
        Ok(SharedList {
            backing: self.backing(name, self.namespace.list_key(name)),
            serializer: self.serializer.clone(),
            lifecycle: self.lifecycle.clone(),
            _item: PhantomData,
        })
    }

    /// Set `name` in this namespace, encoded with this cache's serializer
    pub fn shared_set<T>(&self, name: &str) -> Result<SharedSet<T, S>> {
        self.ensure_open()?;
        Ok(SharedSet {
            backing: self.backing(name, self.namespace.set_key(name)),
            serializer: self.serializer.clone(),
            lifecycle: self.lifecycle.clone(),
            _item: PhantomData,
        })
    }

    fn backing(&self, name: &str, remote_key: String) -> Backing {
        match &*self.tiers {
            Tiers::Local(local) => Backing::Local {
                local: local.clone(),
                name: name.to_string(),
            },
            Tiers::Remote { remote, .. } => Backing::Remote {
                remote: remote.clone(),
                key: remote_key,
            },
        }
    }
}

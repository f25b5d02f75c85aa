//! Caller-owned registry of local tiers keyed by cache id

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::store::{LocalConfig, LocalStore};

struct Slot {
    store: LocalStore,
    holders: usize,
}

/// Maps cache ids to local stores so caches built with the same id share
/// one local tier
///
/// Cloning creates a new handle to the SAME registry. Register and release
/// are the only operations that take the registry lock.
#[derive(Clone, Default)]
pub struct LocalRegistry {
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl LocalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the local store registered under `id`, creating it on first use
    pub fn acquire(&self, id: &str, config: &LocalConfig) -> Registration {
        let store = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(id.to_string()).or_insert_with(|| Slot {
                store: LocalStore::new(config.clone()),
                holders: 0,
            });
            slot.holders += 1;
            slot.store.clone()
        };

        debug!(target: "tiercache", cache_id = %id, "local store registered");
        Registration {
            registry: self.clone(),
            id: id.to_string(),
            store,
            released: AtomicBool::new(false),
        }
    }

    /// The store registered under `id`, if any
    pub fn get(&self, id: &str) -> Option<LocalStore> {
        self.slots.lock().get(id).map(|slot| slot.store.clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.slots.lock().contains_key(id)
    }

    /// Number of registered ids
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.lock().is_empty()
    }

    fn release(&self, id: &str) {
        let last = {
            let mut slots = self.slots.lock();
            match slots.get(id).map(|slot| slot.holders) {
                Some(holders) if holders > 1 => {
                    if let Some(slot) = slots.get_mut(id) {
                        slot.holders -= 1;
                    }
                    None
                }
                Some(_) => slots.remove(id),
                None => None,
            }
        };

        if let Some(slot) = last {
            slot.store.purge();
            debug!(target: "tiercache", cache_id = %id, "local store deregistered");
        }
    }
}

/// A held share of a registered local store
///
/// Released explicitly with [`release`](Self::release) or on drop; the store
/// is deregistered and emptied when its last holder lets go.
pub struct Registration {
    registry: LocalRegistry,
    id: String,
    store: LocalStore,
    released: AtomicBool,
}

impl Registration {
    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Give up this share; later calls are no-ops
    pub fn release(&self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            self.registry.release(&self.id);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_id_shares_store() {
        let registry = LocalRegistry::new();
        let config = LocalConfig::default();

        let first = registry.acquire("orders", &config);
        let second = registry.acquire("orders", &config);

        first.store().put("k", b"v".to_vec(), None);
        assert_eq!(second.store().get("k"), Some(b"v".to_vec()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_ids_are_isolated() {
        let registry = LocalRegistry::new();
        let config = LocalConfig::default();

        let a = registry.acquire("a", &config);
        let b = registry.acquire("b", &config);

        a.store().put("k", b"v".to_vec(), None);
        assert_eq!(b.store().get("k"), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_last_release_deregisters() {
        let registry = LocalRegistry::new();
        let config = LocalConfig::default();

        let first = registry.acquire("orders", &config);
        let second = registry.acquire("orders", &config);
        first.store().put("k", b"v".to_vec(), None);

        first.release();
        first.release();
        assert!(registry.contains("orders"));

        drop(second);
        assert!(!registry.contains("orders"));
        assert!(first.store().is_empty());
    }
}

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;

use tiercache_core::{CacheError, Result};

/// Single-flight execution per key
///
/// The first caller for a key becomes the leader and runs the request; every
/// caller arriving while it is in flight waits for the leader's result.
#[derive(Clone)]
pub struct Coalescer<T: Clone> {
    inflight: Arc<DashMap<String, broadcast::Sender<Result<T>>>>,
}

impl<T: Clone> Default for Coalescer<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::new(DashMap::new()),
        }
    }
}

/// Clears the in-flight slot even when the leader's future is dropped
struct InflightGuard<'a, T: Clone> {
    inflight: &'a DashMap<String, broadcast::Sender<Result<T>>>,
    key: &'a str,
}

impl<T: Clone> Drop for InflightGuard<'_, T> {
    fn drop(&mut self) {
        self.inflight.remove(self.key);
    }
}

impl<T: Clone> Coalescer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` for `key`, or join the run already in flight
    pub async fn run<F, Fut>(&self, key: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // Scope the entry lock so it is released before awaiting
        let action = {
            match self.inflight.entry(key.to_string()) {
                dashmap::mapref::entry::Entry::Occupied(o) => Ok(o.get().subscribe()),
                dashmap::mapref::entry::Entry::Vacant(v) => {
                    let (tx, _rx) = broadcast::channel(1);
                    v.insert(tx.clone());
                    Err(tx)
                }
            }
        };

        match action {
            Ok(mut rx) => match rx.recv().await {
                Ok(res) => res,
                // Leader was cancelled before publishing
                Err(_) => Err(CacheError::Internal(format!(
                    "in-flight load for {} was abandoned",
                    key
                ))),
            },
            Err(tx) => {
                let guard = InflightGuard {
                    inflight: &self.inflight,
                    key,
                };
                let result = f().await;
                drop(guard);

                if tx.receiver_count() > 0 {
                    let _ = tx.send(result.clone());
                }
                result
            }
        }
    }

    /// Number of keys currently being computed
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }
}

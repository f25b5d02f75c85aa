//! Value loaders run on a miss in every tier

use std::marker::PhantomData;

use async_trait::async_trait;
use tiercache_core::Result;

/// Source of values for keys that are in neither tier
#[async_trait]
pub trait Loader<V>: Send + Sync + 'static {
    /// Load the value for `key`, `None` if the source has none
    async fn load(&self, key: &str) -> Result<Option<V>>;
}

/// [`Loader`] backed by a synchronous closure
pub struct LoaderFn<F, V> {
    f: F,
    _value: PhantomData<fn() -> V>,
}

/// Adapt a closure into a [`Loader`]
pub fn loader_fn<F, V>(f: F) -> LoaderFn<F, V>
where
    F: Fn(&str) -> Option<V> + Send + Sync + 'static,
    V: Send + 'static,
{
    LoaderFn {
        f,
        _value: PhantomData,
    }
}

#[async_trait]
impl<F, V> Loader<V> for LoaderFn<F, V>
where
    F: Fn(&str) -> Option<V> + Send + Sync + 'static,
    V: Send + 'static,
{
    async fn load(&self, key: &str) -> Result<Option<V>> {
        Ok((self.f)(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loader_fn() {
        let loader = loader_fn(|key: &str| key.strip_prefix("user:").map(str::len));
        assert_eq!(loader.load("user:alice").await.unwrap(), Some(5));
        assert_eq!(loader.load("order:1").await.unwrap(), None);
    }
}

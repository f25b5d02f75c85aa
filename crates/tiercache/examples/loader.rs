//! Read-through loading: misses are filled from a slow source exactly once

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tiercache::prelude::*;
use tiercache::MemoryRemote;

struct PriceService {
    lookups: Arc<AtomicUsize>,
}

#[async_trait]
impl Loader<u64> for PriceService {
    async fn load(&self, key: &str) -> Result<Option<u64>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        // Simulate a slow upstream call
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(key.strip_prefix("sku:").map(|sku| sku.len() as u64 * 100))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let config = CacheConfig::builder()
        .mode(CacheMode::SingleRemote)
        .endpoint(ServerAddress::new("127.0.0.1", 6379))
        .local_cache(1_000)
        .namespace_id("prices")
        .build()?;

    let remote = MemoryRemote::new();
    let lookups = Arc::new(AtomicUsize::new(0));
    let cache: TieredCache<u64> = TieredCache::builder(config.clone())
        .loader(PriceService {
            lookups: lookups.clone(),
        })
        .remote_store(remote.clone())
        .build()
        .await?;

    println!("Spawning 10 concurrent reads for sku:ABC...");
    let mut handles = Vec::new();
    for _ in 0..10 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move { cache.get("sku:ABC").await }));
    }
    for handle in handles {
        println!("  price = {:?}", handle.await??);
    }
    println!("Upstream lookups: {}", lookups.load(Ordering::SeqCst));

    // A second node without a loader sees the written-through value
    let peer: TieredCache<u64> = TieredCache::builder(config)
        .remote_store(remote)
        .build()
        .await?;
    println!("Peer reads sku:ABC = {:?}", peer.get("sku:ABC").await?);

    // Closures work too
    let local: TieredCache<usize> = TieredCache::builder(CacheConfig::local())
        .loader(loader_fn(|key: &str| Some(key.len())))
        .build()
        .await?;
    println!("Length of 'hello' = {:?}", local.get("hello").await?);

    Ok(())
}

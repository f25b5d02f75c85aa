//! Talk to a real Redis server; run with `--features redis`

use std::time::Duration;
use tiercache::prelude::*;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let host = std::env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = std::env::var("REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(6379);
    let address = ServerAddress::new(host, port);

    println!("Connecting to Redis at {}", address);

    let config = CacheConfig::builder()
        .mode(CacheMode::SingleRemote)
        .endpoint(address)
        .local_cache(500)
        .default_ttl(Duration::from_secs(300))
        .namespace_id("example")
        .pool_size(5)
        .build()?;

    let cache: TieredCache<String> = match TieredCache::builder(config).build().await {
        Ok(cache) => cache,
        Err(e) => {
            println!("Could not connect to Redis: {}", e);
            return Ok(());
        }
    };

    cache.replace("hello", "world".to_string()).await?;
    println!("hello = {:?}", cache.get("hello").await?);

    let written = cache
        .store_batch(
            vec![("key", "v0".to_string()), ("key1", "v1".to_string())],
            Duration::from_secs(5),
        )
        .await?;
    println!("Batch written: {}", written);

    let mut page = cache.scan_all_keys(100).await?;
    loop {
        for key in page.keys.drain(..) {
            println!("  key: {}", key);
        }
        match page.next.take() {
            Some(cursor) => page = cache.advance(&cursor).await?,
            None => break,
        }
    }

    let removed = cache.delete_by_pattern_async("key").await??;
    println!("Removed {} keys", removed);

    cache.close();
    Ok(())
}

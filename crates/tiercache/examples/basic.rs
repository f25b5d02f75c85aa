//! Basic example: a local tier in front of an in-process remote store

use std::time::Duration;
use tiercache::prelude::*;
use tiercache::MemoryRemote;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct User {
    id: u64,
    name: String,
    email: String,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("=== tiercache Basic Example ===\n");

    let config = CacheConfig::builder()
        .mode(CacheMode::SingleRemote)
        .endpoint(ServerAddress::new("127.0.0.1", 6379))
        .local_cache(500)
        .default_ttl(Duration::from_secs(300))
        .namespace_id("users")
        .build()?;

    // MemoryRemote stands in for Redis so the example runs anywhere
    let remote = MemoryRemote::new();
    let cache: TieredCache<User> = TieredCache::builder(config)
        .remote_store(remote.clone())
        .build()
        .await?;

    let user = User {
        id: 123,
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
    };

    println!("Storing user in cache...");
    cache.store("user:123", user.clone()).await?;

    match cache.store("user:123", user).await {
        Err(CacheError::DuplicateKey(key)) => println!("Second store rejected for {}", key),
        other => println!("Unexpected: {:?}", other.map(|u| u.id)),
    }

    println!("Reading it back...");
    if let Some(user) = cache.get("user:123").await? {
        println!("Found: {} <{}>", user.name, user.email);
    }

    let page = cache.scan_keys("user:", 100).await?;
    println!("Keys under user: {:?}", page.keys);

    let visits = cache.shared_counter("visits")?;
    println!("Visit #{}", visits.increment_and_get().await?);

    if let Some(stats) = cache.local_stats() {
        println!("Local tier: {}", stats);
    }

    cache.close();
    println!("\nDone!");
    Ok(())
}

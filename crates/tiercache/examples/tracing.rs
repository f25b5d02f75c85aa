use tiercache::prelude::*;
use tiercache::{MemoryRemote, RemoteStore, TracingMetrics};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize tracing subscriber
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::TRACE)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 2. Build a hybrid cache that reports through tracing
    let config = CacheConfig::builder()
        .mode(CacheMode::SingleRemote)
        .endpoint(ServerAddress::new("127.0.0.1", 6379))
        .local_cache(100)
        .namespace_id("traced")
        .build()?;
    let remote = MemoryRemote::new();
    let cache: TieredCache<String, JsonSerializer, TracingMetrics> = TieredCache::builder(config)
        .metrics(TracingMetrics::for_service("example-service"))
        .remote_store(remote.clone())
        .build()
        .await?;

    println!("\nStoring value...");
    cache.store("user:1", "Alice".to_string()).await?;

    println!("\nGetting value (local hit, validated)...");
    println!("   Got: {:?}", cache.get("user:1").await?);

    println!("\nDeleting behind the cache's back, then reading (stale)...");
    remote.flush_all().await?;
    println!("   Got: {:?}", cache.get("user:1").await?);

    println!("\nCheck the console output for structured logs");
    Ok(())
}

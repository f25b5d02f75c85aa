//! tiercache: two-tier object cache for Rust
//!
//! # Features
//!
//! - **Local-only, single-node or clustered** remote tier (Redis)
//! - **Optional in-process tier** in front of the remote one, re-validated
//!   against the remote store on every hit
//! - **Namespaces** that isolate instances sharing one server
//! - **Insert-once stores**, idempotent replaces, pipelined batch writes
//! - **Cursor scans** and pattern deletes within a namespace
//! - **Shared counters, lists and sets**
//! - **Pluggable serialization** (JSON, MessagePack, Bincode) and metrics
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tiercache::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = CacheConfig::builder()
//!         .mode(CacheMode::SingleRemote)
//!         .endpoint(ServerAddress::new("127.0.0.1", 6379))
//!         .local_cache(500)
//!         .namespace_id("orders")
//!         .build()?;
//!     let cache = TieredCache::<u64>::builder(config).build().await?;
//!
//!     cache.store("order:1", 42).await?;
//!     assert_eq!(cache.get("order:1").await?, Some(42));
//!
//!     Ok(())
//! }
//! ```

mod cache;
mod client;
mod config;
mod namespace;

// Re-export core
pub use tiercache_core::*;

// Re-export storage
pub use tiercache_storage::{LocalConfig, LocalRegistry, LocalStore, MemoryRemote, Registration};

#[cfg(feature = "redis")]
pub use tiercache_storage::{RedisConfig, RedisStore};

pub use cache::{
    loader_fn, AtomicCounter, CacheBuilder, Loader, LoaderFn, ScanCursor, ScanPage, SharedList,
    SharedSet, TieredCache, DEFAULT_SCAN_LIMIT,
};
pub use client::CacheClient;
pub use config::{CacheConfig, CacheConfigBuilder, CacheMode, ServerAddress};
pub use namespace::Namespace;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        loader_fn, CacheBuilder, CacheClient, CacheConfig, CacheError, CacheKey, CacheMode,
        Loader, LocalRegistry, Result, ScanPage, Serializer, ServerAddress, TieredCache,
        JsonSerializer,
    };

    #[cfg(feature = "msgpack")]
    pub use crate::MsgPackSerializer;

    #[cfg(feature = "bincode")]
    pub use crate::BincodeSerializer;
}

//! tiercache-storage: the storage tiers behind tiercache
//!
//! - [`LocalStore`]: the in-process tier, with expiry, capacity bounds and a
//!   single-flight miss path
//! - [`LocalRegistry`]: caller-owned map from cache id to local store
//! - [`MemoryRemote`]: an in-process remote store with Redis semantics
//! - `RedisStore` (feature `redis`): the Redis remote tier, single node or
//!   cluster

pub mod local;
pub mod memory;

#[cfg(feature = "redis")]
pub mod redis;

pub use local::{LocalConfig, LocalRegistry, LocalStore, Loaded, Registration};
pub use memory::MemoryRemote;

#[cfg(feature = "redis")]
pub use self::redis::{RedisConfig, RedisStore};

//! Core types for cache operations

mod cursor;
mod entry;
mod stats;

pub use cursor::RemoteCursor;
pub use entry::CacheEntry;
pub use stats::LocalStats;

//! In-process (L1) cache tier

mod coalescer;
mod expiry;
mod registry;
mod store;

pub use coalescer::Coalescer;
pub use registry::{LocalRegistry, Registration};
pub use store::{LocalConfig, LocalStore, Loaded};

//! tiercache-core: Core traits and types for the tiercache library
//!
//! This crate holds the pieces shared by every tier: the error taxonomy,
//! the pluggable serializer, the remote-store traits and the metrics hooks.

mod error;
mod traits;
mod types;

pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;

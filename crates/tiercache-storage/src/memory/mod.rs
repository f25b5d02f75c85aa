//! In-process remote tier

mod glob;
mod remote;

pub use glob::glob_match;
pub use remote::MemoryRemote;

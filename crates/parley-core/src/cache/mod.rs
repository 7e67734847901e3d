//! Response cache
//!
//! Memoizes the complete fragment sequence of a completion call on disk, keyed
//! by a hash of the call's inputs.

mod key;
mod layer;
mod storage;

pub use key::CacheKey;
pub use layer::CachedCompletion;
pub use storage::{CacheStatistics, DiskCache};

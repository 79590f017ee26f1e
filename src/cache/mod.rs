//! Persistent cache for ClickUp data.
//!
//! One JSON snapshot holds the last-fetched collections and a single expiry
//! instant:
//! - Reads clear the whole cache once the expiry has passed
//! - Writes invalidate only the collection they touched
//! - Every change is persisted as a full snapshot

mod layer;
mod storage;
mod store;
mod traits;

pub use layer::CacheLayer;
pub use storage::JsonFileStorage;
pub use store::Collection;
#[cfg(test)]
pub use store::ClickupCache;
pub use traits::CacheStorage;

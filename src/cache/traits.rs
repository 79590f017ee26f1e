//! Core traits and types for the caching system.

use crate::clickup::error::Result;

use super::store::ClickupCache;

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  /// Read the persisted snapshot. Never fails: anything unreadable is an
  /// empty cache.
  fn load(&self) -> ClickupCache;

  /// Replace the persisted snapshot.
  fn save(&self, cache: &ClickupCache) -> Result<()>;
}

/// Result from a cache operation, including data and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  Network,
  Cache,
}

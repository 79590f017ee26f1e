//! Cache storage backends.

use std::path::{Path, PathBuf};

use crate::clickup::error::Result;

use super::store::ClickupCache;
use super::traits::CacheStorage;

pub const CACHE_FILE: &str = "cache.json";

/// JSON file storage at `${config-dir}/cache.json`.
pub struct JsonFileStorage {
  path: PathBuf,
}

impl JsonFileStorage {
  /// Store the cache inside `config_dir`. The directory is created on the
  /// first save, not here.
  pub fn in_dir(config_dir: &Path) -> Self {
    Self {
      path: config_dir.join(CACHE_FILE),
    }
  }

  #[cfg(test)]
  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl CacheStorage for JsonFileStorage {
  fn load(&self) -> ClickupCache {
    ClickupCache::load(&self.path)
  }

  fn save(&self, cache: &ClickupCache) -> Result<()> {
    cache.save(&self.path)
  }
}

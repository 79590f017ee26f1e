//! Cache layer that orchestrates caching logic with network fetching.

use std::future::Future;
use tracing::{debug, warn};

use crate::clickup::error::Result;

use super::store::{ClickupCache, Collection};
use super::traits::{CacheResult, CacheStorage};

/// Owns the in-memory cache and its storage backend.
///
/// There is one active driver at a time: every method takes `&mut self`,
/// so a multi-threaded host has to put the owner behind a mutex.
pub struct CacheLayer<S: CacheStorage> {
  storage: S,
  cache: ClickupCache,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a cache layer, loading whatever the backend has persisted.
  pub fn new(storage: S) -> Self {
    let cache = storage.load();
    Self { storage, cache }
  }

  #[cfg(test)]
  pub fn cache(&self) -> &ClickupCache {
    &self.cache
  }

  /// Clear everything if the expiry instant has passed. Every read goes
  /// through here first.
  pub fn ensure_fresh(&mut self) {
    if self.cache.is_expired() {
      debug!(expired_at = self.cache.expired_at(), "cache expired, clearing");
      self.cache.clear();
    }
  }

  /// Read-through fetch.
  ///
  /// 1. Clear the cache if expired
  /// 2. Return the cached value if `read` finds one
  /// 3. Otherwise run `fetcher`, store with `write`, re-arm the expiry and persist
  ///
  /// Fetch errors propagate and leave the cache untouched.
  pub async fn fetch<T, R, W, F, Fut>(
    &mut self,
    label: &str,
    read: R,
    write: W,
    fetcher: F,
  ) -> Result<CacheResult<T>>
  where
    T: Clone,
    R: FnOnce(&ClickupCache) -> Option<T>,
    W: FnOnce(&mut ClickupCache, T),
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    self.ensure_fresh();

    if let Some(cached) = read(&self.cache) {
      debug!(collection = label, "cache hit");
      return Ok(CacheResult::from_cache(cached));
    }

    debug!(collection = label, "cache miss");
    let data = fetcher().await?;
    write(&mut self.cache, data.clone());
    self.cache.bump_expiry();
    self.persist();

    Ok(CacheResult::from_network(data))
  }

  /// Drop one collection and persist. The expiry is left alone.
  pub fn invalidate(&mut self, collection: Collection) {
    debug!(?collection, "invalidating");
    self.cache.invalidate(collection);
    self.persist();
  }

  pub fn clear(&mut self) {
    self.cache.clear();
    self.persist();
  }

  /// Save the snapshot. Failures are logged; the in-memory cache stays
  /// authoritative for this process.
  pub fn persist(&self) {
    if let Err(e) = self.storage.save(&self.cache) {
      warn!(error = %e, "failed to persist cache");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::storage::JsonFileStorage;
  use crate::cache::traits::CacheSource;
  use crate::clickup::error::ClickupError;
  use crate::clickup::types::Task;
  use std::sync::atomic::{AtomicU32, Ordering};
  use tempfile::TempDir;

  /// Backend that always fails to save.
  struct BrokenStorage;

  impl CacheStorage for BrokenStorage {
    fn load(&self) -> ClickupCache {
      ClickupCache::default()
    }

    fn save(&self, _cache: &ClickupCache) -> Result<()> {
      Err(ClickupError::persistence(
        "/nope/cache.json",
        std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
      ))
    }
  }

  fn tasks() -> Vec<Task> {
    vec![Task {
      id: "a".into(),
      ..Default::default()
    }]
  }

  async fn fetch_view(
    layer: &mut CacheLayer<impl CacheStorage>,
    calls: &AtomicU32,
  ) -> Result<CacheResult<Vec<Task>>> {
    layer
      .fetch(
        "view_tasks",
        |c| c.view_tasks().map(<[Task]>::to_vec),
        |c, v| c.set_view_tasks(v),
        || async {
          calls.fetch_add(1, Ordering::SeqCst);
          Ok(tasks())
        },
      )
      .await
  }

  #[tokio::test]
  async fn test_second_read_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let mut layer = CacheLayer::new(JsonFileStorage::in_dir(dir.path()));
    let calls = AtomicU32::new(0);

    let first = fetch_view(&mut layer, &calls).await.unwrap();
    let second = fetch_view(&mut layer, &calls).await.unwrap();

    assert_eq!(first.source, CacheSource::Network);
    assert_eq!(second.source, CacheSource::Cache);
    assert_eq!(second.data, first.data);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fetch_failure_leaves_cache_empty() {
    let dir = TempDir::new().unwrap();
    let mut layer = CacheLayer::new(JsonFileStorage::in_dir(dir.path()));

    let result: Result<CacheResult<Vec<Task>>> = layer
      .fetch(
        "view_tasks",
        |c| c.view_tasks().map(<[Task]>::to_vec),
        |c, v| c.set_view_tasks(v),
        || async { Err(ClickupError::protocol("get tasks", 500)) },
      )
      .await;

    assert!(result.is_err());
    assert!(layer.cache().view_tasks().is_none());
    assert!(!dir.path().join("cache.json").exists());
  }

  #[tokio::test]
  async fn test_persist_failure_is_not_fatal() {
    let mut layer = CacheLayer::new(BrokenStorage);
    let calls = AtomicU32::new(0);

    let result = fetch_view(&mut layer, &calls).await.unwrap();
    assert_eq!(result.data.len(), 1);
    assert!(layer.cache().view_tasks().is_some());

    layer.invalidate(Collection::ViewTasks);
    assert!(layer.cache().view_tasks().is_none());
  }

  #[tokio::test]
  async fn test_state_survives_reload() {
    let dir = TempDir::new().unwrap();
    let calls = AtomicU32::new(0);
    {
      let mut layer = CacheLayer::new(JsonFileStorage::in_dir(dir.path()));
      fetch_view(&mut layer, &calls).await.unwrap();
    }

    let mut layer = CacheLayer::new(JsonFileStorage::in_dir(dir.path()));
    let result = fetch_view(&mut layer, &calls).await.unwrap();
    assert_eq!(result.source, CacheSource::Cache);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }
}

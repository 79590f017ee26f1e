//! Cached ClickUp client that wraps ClickupClient with read-through caching.

use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::cache::{CacheLayer, CacheStorage, Collection, JsonFileStorage};
use crate::config::Config;
use crate::timesheet::reconcile::{self, TrackingOp};
use crate::timesheet::zone::DayZone;

use super::client::ClickupClient;
use super::error::Result;
use super::transport::{ReqwestTransport, Transport, DEFAULT_BASE_URL};
use super::types::{Comment, Task, Team, TimeEntry, User};

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "CLICKUP_API_URL";

/// ClickUp client with transparent caching.
///
/// Reads go through the cache; writes go straight to the API and invalidate
/// the collection they affect. Owns the cache, so it is the single driver of
/// it: every operation takes `&mut self`.
pub struct CachedClickupClient<T: Transport = ReqwestTransport, S: CacheStorage = JsonFileStorage>
{
  inner: ClickupClient<T>,
  cache: CacheLayer<S>,
  zone: DayZone,
}

impl CachedClickupClient {
  /// Client for the stored credentials, caching under `config_dir`.
  pub fn new(config: &Config, config_dir: &Path) -> Result<Self> {
    let base_url = std::env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let transport = ReqwestTransport::new(&base_url)?;
    let inner = ClickupClient::new(transport, &config.clickup_token, &config.team_id);

    Ok(Self::with_parts(
      inner,
      JsonFileStorage::in_dir(config_dir),
      config.zone()?,
    ))
  }
}

impl<T: Transport, S: CacheStorage> CachedClickupClient<T, S> {
  pub fn with_parts(inner: ClickupClient<T>, storage: S, zone: DayZone) -> Self {
    Self {
      inner,
      cache: CacheLayer::new(storage),
      zone,
    }
  }

  #[cfg(test)]
  pub fn cache(&self) -> &crate::cache::ClickupCache {
    self.cache.cache()
  }

  pub fn zone(&self) -> DayZone {
    self.zone
  }

  // ==========================================================================
  // Setup (never cached)
  // ==========================================================================

  pub async fn current_user(&self, token: &str) -> Result<User> {
    self.inner.get_current_user(token).await
  }

  pub async fn teams(&self, token: &str) -> Result<Vec<Team>> {
    self.inner.get_teams(token).await
  }

  // ==========================================================================
  // Cached reads
  // ==========================================================================

  /// Get a single task, with its markdown description.
  pub async fn get_task(&mut self, task_id: &str) -> Result<Task> {
    let inner = &self.inner;
    let result = self
      .cache
      .fetch(
        "task_by_id",
        |c| c.task(task_id).cloned(),
        |c, task| c.insert_task(task_id, task),
        || inner.get_task(task_id),
      )
      .await?;

    debug!(task_id, source = ?result.source, "task");
    Ok(result.data)
  }

  pub async fn get_task_comments(&mut self, task_id: &str) -> Result<Vec<Comment>> {
    let inner = &self.inner;
    let result = self
      .cache
      .fetch(
        "comments_by_task_id",
        |c| c.comments(task_id).map(<[Comment]>::to_vec),
        |c, comments| c.insert_comments(task_id, comments),
        || inner.get_task_comments(task_id),
      )
      .await?;

    debug!(task_id, source = ?result.source, count = result.data.len(), "comments");
    Ok(result.data)
  }

  /// Tasks matching the timesheet filter, across every page.
  pub async fn get_timesheet_tasks(&mut self, filter: &str) -> Result<Vec<Task>> {
    let inner = &self.inner;
    let result = self
      .cache
      .fetch(
        "timesheet_tasks",
        |c| c.timesheet_tasks().map(<[Task]>::to_vec),
        |c, tasks| c.set_timesheet_tasks(tasks),
        || inner.get_timesheet_tasks(filter),
      )
      .await?;

    debug!(source = ?result.source, count = result.data.len(), "timesheet tasks");
    Ok(result.data)
  }

  /// Tasks of a saved view, across every page.
  pub async fn get_view_tasks(&mut self, view_id: &str) -> Result<Vec<Task>> {
    let inner = &self.inner;
    let result = self
      .cache
      .fetch(
        "view_tasks",
        |c| c.view_tasks().map(<[Task]>::to_vec),
        |c, tasks| c.set_view_tasks(tasks),
        || inner.get_view_tasks(view_id),
      )
      .await?;

    debug!(view_id, source = ?result.source, count = result.data.len(), "view tasks");
    Ok(result.data)
  }

  pub async fn get_timesheet_entries(&mut self, user_id: &str) -> Result<Vec<TimeEntry>> {
    let inner = &self.inner;
    let result = self
      .cache
      .fetch(
        "time_entries",
        |c| c.time_entries().map(<[TimeEntry]>::to_vec),
        |c, entries| c.set_time_entries(entries),
        || inner.get_time_entries(user_id),
      )
      .await?;

    debug!(source = ?result.source, count = result.data.len(), "time entries");
    Ok(result.data)
  }

  // ==========================================================================
  // Writes
  // ==========================================================================

  /// Make `task_id` total `hours` on `day` for `user_id`.
  ///
  /// Deletes every entry the task has on that day, then creates one entry
  /// of the target duration unless it is zero. Delete failures are logged
  /// and skipped; a create failure is returned. Time entries are
  /// invalidated either way.
  pub async fn update_tracking(
    &mut self,
    user_id: &str,
    task_id: &str,
    day: NaiveDate,
    hours: f64,
  ) -> Result<()> {
    reconcile::validate_hours(hours)?;

    let entries = self.get_timesheet_entries(user_id).await?;
    let ops = reconcile::plan(&entries, task_id, day, hours, self.zone)?;
    info!(task_id, %day, hours, ops = ops.len(), "updating tracking");

    let mut outcome = Ok(());
    for op in ops {
      match op {
        TrackingOp::Delete { entry_id } => {
          if let Err(e) = self.inner.delete_time_entry(task_id, &entry_id).await {
            warn!(task_id, entry_id = %entry_id, error = %e, "failed to delete time entry, continuing");
          }
        }
        TrackingOp::Create { start, duration_ms } => {
          outcome = self
            .inner
            .create_time_entry(task_id, start, duration_ms, user_id)
            .await;
        }
      }
    }

    self.cache.invalidate(Collection::TimeEntries);
    outcome
  }

  // ==========================================================================
  // Invalidation
  // ==========================================================================

  pub fn invalidate_time_entries(&mut self) {
    self.cache.invalidate(Collection::TimeEntries);
  }

  pub fn invalidate_timesheet_tasks(&mut self) {
    self.cache.invalidate(Collection::TimesheetTasks);
  }

  pub fn invalidate_view_tasks(&mut self) {
    self.cache.invalidate(Collection::ViewTasks);
  }

  pub fn clear_cache(&mut self) {
    self.cache.clear();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ClickupCache;
  use crate::clickup::error::ClickupError;
  use crate::clickup::transport::testing::FakeTransport;
  use crate::clickup::transport::Method;
  use chrono::{Duration, Utc};
  use serde_json::{json, Value};
  use tempfile::TempDir;

  type TestClient = CachedClickupClient<FakeTransport, JsonFileStorage>;

  fn client(dir: &TempDir, transport: FakeTransport) -> TestClient {
    CachedClickupClient::with_parts(
      ClickupClient::new(transport, "pk_token", "team1"),
      JsonFileStorage::in_dir(dir.path()),
      DayZone::parse_offset("+02:00").unwrap(),
    )
  }

  fn page(ids: &[&str], last: bool) -> Value {
    let tasks: Vec<Value> = ids
      .iter()
      .map(|id| json!({"id": id, "name": format!("Task {}", id), "status": {"status": "open", "orderindex": 0}}))
      .collect();
    json!({"tasks": tasks, "last_page": last})
  }

  fn view_routes(transport: FakeTransport) -> FakeTransport {
    transport
      .route(Method::Get, "/api/v2/view/V1/task?page=0", 200, page(&["a", "b"], true))
      .route(Method::Get, "/api/v2/view/V1/task?page=1", 200, page(&[], true))
      .route(Method::Get, "/api/v2/view/V1/task?page=2", 200, page(&[], true))
  }

  fn cache_path(dir: &TempDir) -> std::path::PathBuf {
    JsonFileStorage::in_dir(dir.path()).path().to_path_buf()
  }

  fn persisted(dir: &TempDir) -> ClickupCache {
    ClickupCache::load(&cache_path(dir))
  }

  fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
  }

  // 2024-06-03T06:00+02:00
  const ANCHOR_MS: i64 = 1_717_387_200_000;
  const ENTRIES_PATH: &str = "/api/v2/team/team1/time_entries?assignee=U";

  fn entries_body() -> Value {
    json!({"data": [{
      "id": "e1",
      "task": {"id": "T", "name": "Task T"},
      "start": ANCHOR_MS.to_string(),
      "duration": "3600000",
      "end": (ANCHOR_MS + 3_600_000).to_string()
    }]})
  }

  fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
  }

  #[tokio::test]
  async fn test_fresh_read_fetches_one_batch_and_persists() {
    let dir = TempDir::new().unwrap();
    let mut client = client(&dir, view_routes(FakeTransport::new()));

    let before = Utc::now().timestamp();
    let tasks = client.get_view_tasks("V1").await.unwrap();

    assert_eq!(ids(&tasks), vec!["a", "b"]);
    let mut paths = client.inner.transport().paths();
    paths.sort();
    assert_eq!(
      paths,
      vec![
        "/api/v2/view/V1/task?page=0",
        "/api/v2/view/V1/task?page=1",
        "/api/v2/view/V1/task?page=2",
      ]
    );

    let on_disk = persisted(&dir);
    assert_eq!(on_disk.view_tasks().map(|t| t.len()), Some(2));
    let ttl = on_disk.expired_at() - before;
    assert!((3599..=3601).contains(&ttl), "ttl was {ttl}");
  }

  #[tokio::test]
  async fn test_second_read_issues_no_requests() {
    let dir = TempDir::new().unwrap();
    let mut client = client(&dir, view_routes(FakeTransport::new()));

    let first = client.get_view_tasks("V1").await.unwrap();
    client.inner.transport().clear_requests();
    let second = client.get_view_tasks("V1").await.unwrap();

    assert_eq!(first, second);
    assert!(client.inner.transport().requests().is_empty());
  }

  #[tokio::test]
  async fn test_expiry_clears_everything_before_fetch() {
    let dir = TempDir::new().unwrap();
    {
      let mut client = client(&dir, view_routes(FakeTransport::new()));
      client.get_view_tasks("V1").await.unwrap();
    }

    // An hour and a second later.
    let mut snapshot = persisted(&dir);
    snapshot.bump_expiry_from(Utc::now() - Duration::seconds(3601));
    snapshot.save(&cache_path(&dir)).unwrap();

    let transport = FakeTransport::new().route(
      Method::Get,
      "/api/v2/task/T9?include_markdown_description=true",
      200,
      json!({"id": "T9", "name": "Nine", "markdown_description": "# hi"}),
    );
    let mut client = client(&dir, transport);
    let task = client.get_task("T9").await.unwrap();

    assert_eq!(task.description, "# hi");
    assert!(client.cache().view_tasks().is_none());
    assert!(client.cache().task("T9").is_some());

    let on_disk = persisted(&dir);
    assert!(on_disk.view_tasks().is_none());
    assert!(on_disk.timesheet_tasks().is_none());
    assert!(on_disk.task("T9").is_some());
    assert!(!on_disk.is_expired());
  }

  #[tokio::test]
  async fn test_update_tracking_increase() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new()
      .route(Method::Get, ENTRIES_PATH, 200, entries_body())
      .route(Method::Delete, "/api/v2/task/T/time/e1", 200, json!({}))
      .route(Method::Post, "/api/v2/task/T/time", 200, json!({}));
    let mut client = client(&dir, transport);

    client.update_tracking("U", "T", day(), 2.5).await.unwrap();

    let requests = client.inner.transport().requests();
    let calls: Vec<(Method, &str)> = requests
      .iter()
      .map(|r| (r.method, r.path.as_str()))
      .collect();
    assert_eq!(
      calls,
      vec![
        (Method::Get, ENTRIES_PATH),
        (Method::Delete, "/api/v2/task/T/time/e1"),
        (Method::Post, "/api/v2/task/T/time"),
      ]
    );
    assert_eq!(
      requests[2].body,
      Some(json!({"start": ANCHOR_MS, "time": 9_000_000}))
    );
    assert!(client.cache().time_entries().is_none());
    assert!(persisted(&dir).time_entries().is_none());
  }

  #[tokio::test]
  async fn test_update_tracking_to_zero_only_deletes() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new()
      .route(Method::Get, ENTRIES_PATH, 200, entries_body())
      .route(Method::Delete, "/api/v2/task/T/time/e1", 200, json!({}));
    let mut client = client(&dir, transport);

    client.update_tracking("U", "T", day(), 0.0).await.unwrap();

    let methods: Vec<Method> = client
      .inner
      .transport()
      .requests()
      .iter()
      .map(|r| r.method)
      .collect();
    assert_eq!(methods, vec![Method::Get, Method::Delete]);
    assert!(client.cache().time_entries().is_none());
  }

  #[tokio::test]
  async fn test_failed_delete_does_not_stop_create() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new()
      .route(Method::Get, ENTRIES_PATH, 200, entries_body())
      .route(Method::Delete, "/api/v2/task/T/time/e1", 500, json!({}))
      .route(Method::Post, "/api/v2/task/T/time", 200, json!({}));
    let mut client = client(&dir, transport);

    client.update_tracking("U", "T", day(), 1.0).await.unwrap();

    let last = client.inner.transport().requests().pop().unwrap();
    assert_eq!(last.method, Method::Post);
  }

  #[tokio::test]
  async fn test_failed_create_still_invalidates() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new()
      .route(Method::Get, ENTRIES_PATH, 200, entries_body())
      .route(Method::Delete, "/api/v2/task/T/time/e1", 200, json!({}))
      .route(Method::Post, "/api/v2/task/T/time", 400, json!({}));
    let mut client = client(&dir, transport);

    let err = client.update_tracking("U", "T", day(), 1.0).await.unwrap_err();
    assert!(matches!(err, ClickupError::Protocol { status: 400, .. }));
    assert!(client.cache().time_entries().is_none());
  }

  #[tokio::test]
  async fn test_negative_hours_rejected_before_any_request() {
    let dir = TempDir::new().unwrap();
    let mut client = client(&dir, FakeTransport::new());

    let err = client.update_tracking("U", "T", day(), -1.0).await.unwrap_err();
    assert!(matches!(err, ClickupError::InvalidInput(_)));
    assert!(client.inner.transport().requests().is_empty());
  }

  #[tokio::test]
  async fn test_invalidation_is_selective_and_keeps_expiry() {
    let dir = TempDir::new().unwrap();
    let transport = view_routes(FakeTransport::new()).route(
      Method::Get,
      ENTRIES_PATH,
      200,
      entries_body(),
    );
    let mut client = client(&dir, transport);
    client.get_view_tasks("V1").await.unwrap();
    client.get_timesheet_entries("U").await.unwrap();
    let expiry = client.cache().expired_at();

    client.invalidate_time_entries();

    assert!(client.cache().time_entries().is_none());
    assert!(client.cache().view_tasks().is_some());
    assert_eq!(client.cache().expired_at(), expiry);

    client.inner.transport().clear_requests();
    client.get_view_tasks("V1").await.unwrap();
    client.get_timesheet_entries("U").await.unwrap();
    assert_eq!(client.inner.transport().paths(), vec![ENTRIES_PATH]);
  }

  #[tokio::test]
  async fn test_task_and_comments_reads_are_cached_per_id() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new()
      .route(
        Method::Get,
        "/api/v2/task/T1?include_markdown_description=true",
        200,
        json!({"id": "T1", "name": "One"}),
      )
      .route(
        Method::Get,
        "/api/v2/task/T1/comment",
        200,
        json!({"comments": [{"id": "c1", "comment_text": "hi", "date": "1717394400000"}]}),
      );
    let mut client = client(&dir, transport);

    let task = client.get_task("T1").await.unwrap();
    let comments = client.get_task_comments("T1").await.unwrap();
    client.inner.transport().clear_requests();

    assert_eq!(client.get_task("T1").await.unwrap(), task);
    assert_eq!(client.get_task_comments("T1").await.unwrap(), comments);
    assert!(client.inner.transport().requests().is_empty());

    // Another id is a miss of its own.
    assert!(client.get_task("T2").await.is_err());
    assert_eq!(
      client.inner.transport().paths(),
      vec!["/api/v2/task/T2?include_markdown_description=true"]
    );
  }

  fn timesheet_routes(transport: FakeTransport) -> FakeTransport {
    let base = "/api/v2/team/team1/task?tags[]=timesheet&page=";
    transport
      .route(Method::Get, &format!("{base}0"), 200, page(&["t"], true))
      .route(Method::Get, &format!("{base}1"), 200, page(&[], true))
      .route(Method::Get, &format!("{base}2"), 200, page(&[], true))
  }

  async fn fill_all(client: &mut TestClient) {
    client.get_view_tasks("V1").await.unwrap();
    client.get_timesheet_tasks("tags[]=timesheet").await.unwrap();
    client.get_timesheet_entries("U").await.unwrap();
  }

  fn all_routes() -> FakeTransport {
    timesheet_routes(view_routes(FakeTransport::new())).route(
      Method::Get,
      ENTRIES_PATH,
      200,
      entries_body(),
    )
  }

  #[tokio::test]
  async fn test_invalidate_view_tasks_is_selective() {
    let dir = TempDir::new().unwrap();
    let mut client = client(&dir, all_routes());
    fill_all(&mut client).await;
    let expiry = client.cache().expired_at();

    client.invalidate_view_tasks();

    assert!(client.cache().view_tasks().is_none());
    assert!(client.cache().timesheet_tasks().is_some());
    assert!(client.cache().time_entries().is_some());
    assert_eq!(client.cache().expired_at(), expiry);
    assert!(persisted(&dir).view_tasks().is_none());

    client.inner.transport().clear_requests();
    fill_all(&mut client).await;
    let mut paths = client.inner.transport().paths();
    paths.sort();
    assert_eq!(
      paths,
      vec![
        "/api/v2/view/V1/task?page=0",
        "/api/v2/view/V1/task?page=1",
        "/api/v2/view/V1/task?page=2",
      ]
    );
  }

  #[tokio::test]
  async fn test_invalidate_timesheet_tasks_is_selective() {
    let dir = TempDir::new().unwrap();
    let mut client = client(&dir, all_routes());
    fill_all(&mut client).await;
    let expiry = client.cache().expired_at();

    client.invalidate_timesheet_tasks();

    assert!(client.cache().timesheet_tasks().is_none());
    assert!(client.cache().view_tasks().is_some());
    assert!(client.cache().time_entries().is_some());
    assert_eq!(client.cache().expired_at(), expiry);
    assert!(persisted(&dir).timesheet_tasks().is_none());

    client.inner.transport().clear_requests();
    fill_all(&mut client).await;
    let mut paths = client.inner.transport().paths();
    paths.sort();
    assert_eq!(
      paths,
      vec![
        "/api/v2/team/team1/task?tags[]=timesheet&page=0",
        "/api/v2/team/team1/task?tags[]=timesheet&page=1",
        "/api/v2/team/team1/task?tags[]=timesheet&page=2",
      ]
    );
  }

  #[tokio::test]
  async fn test_read_error_leaves_cache_unpopulated() {
    let dir = TempDir::new().unwrap();
    let transport = FakeTransport::new().route(
      Method::Get,
      "/api/v2/task/T1/comment",
      503,
      json!({}),
    );
    let mut client = client(&dir, transport);

    assert!(client.get_task_comments("T1").await.is_err());
    assert!(client.cache().comments("T1").is_none());
  }

  #[tokio::test]
  async fn test_clear_cache_expires_everything() {
    let dir = TempDir::new().unwrap();
    let mut client = client(&dir, view_routes(FakeTransport::new()));
    client.get_view_tasks("V1").await.unwrap();

    client.clear_cache();

    assert!(client.cache().is_expired());
    assert!(client.cache().view_tasks().is_none());
    assert!(persisted(&dir).is_expired());
  }
}

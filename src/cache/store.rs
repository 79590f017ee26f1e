//! The cache record: last-fetched collections plus one expiry instant.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use tracing::warn;

use crate::clickup::api_types::null_as_default;
use crate::clickup::error::{ClickupError, Result};
use crate::clickup::types::{Comment, Task, TimeEntry};

/// How long a fetch keeps the whole cache alive, in seconds.
pub const CACHE_TTL_SECS: i64 = 3600;

/// Collections that can be invalidated on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
  TimesheetTasks,
  ViewTasks,
  TimeEntries,
}

/// Snapshot persisted as `cache.json`.
///
/// `None` means "not fetched"; `Some(vec![])` is a fetched, empty result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickupCache {
  #[serde(default)]
  timesheet_tasks: Option<Vec<Task>>,
  #[serde(default)]
  time_entries: Option<Vec<TimeEntry>>,
  #[serde(default)]
  view_tasks: Option<Vec<Task>>,
  #[serde(default, deserialize_with = "null_as_default")]
  task_by_id: HashMap<String, Task>,
  #[serde(default, deserialize_with = "null_as_default")]
  comments_by_task_id: HashMap<String, Vec<Comment>>,
  /// Unix seconds; 0 means never armed.
  #[serde(default, deserialize_with = "null_as_default")]
  expired_at: i64,
}

impl ClickupCache {
  /// Read a snapshot. A missing or unreadable file yields an empty,
  /// expired cache.
  pub fn load(path: &Path) -> Self {
    let contents = match std::fs::read_to_string(path) {
      Ok(c) => c,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::default(),
      Err(e) => {
        warn!(path = %path.display(), error = %e, "cache file unreadable, starting empty");
        return Self::default();
      }
    };

    match serde_json::from_str(&contents) {
      Ok(cache) => cache,
      Err(e) => {
        warn!(path = %path.display(), error = %e, "cache file malformed, starting empty");
        Self::default()
      }
    }
  }

  /// Write the full snapshot through a temp file in the same directory,
  /// creating the directory if needed.
  pub fn save(&self, path: &Path) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| ClickupError::persistence(dir, e))?;

    let data = serde_json::to_vec_pretty(self).map_err(|e| encode_failure(path, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| ClickupError::persistence(dir, e))?;
    tmp
      .write_all(&data)
      .and_then(|_| tmp.flush())
      .map_err(|e| ClickupError::persistence(path, e))?;
    tmp
      .persist(path)
      .map_err(|e| ClickupError::persistence(path, e.error))?;

    Ok(())
  }

  pub fn is_expired(&self) -> bool {
    self.is_expired_at(Utc::now())
  }

  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    self.expired_at == 0 || self.expired_at < now.timestamp()
  }

  pub fn bump_expiry(&mut self) {
    self.bump_expiry_from(Utc::now());
  }

  pub fn bump_expiry_from(&mut self, now: DateTime<Utc>) {
    self.expired_at = (now + Duration::seconds(CACHE_TTL_SECS)).timestamp();
  }

  pub fn expired_at(&self) -> i64 {
    self.expired_at
  }

  /// Drop every collection and disarm the expiry.
  pub fn clear(&mut self) {
    self.timesheet_tasks = None;
    self.time_entries = None;
    self.view_tasks = None;
    self.task_by_id = HashMap::new();
    self.comments_by_task_id = HashMap::new();
    self.expired_at = 0;
  }

  pub fn invalidate(&mut self, collection: Collection) {
    match collection {
      Collection::TimesheetTasks => self.timesheet_tasks = None,
      Collection::ViewTasks => self.view_tasks = None,
      Collection::TimeEntries => self.time_entries = None,
    }
  }

  pub fn timesheet_tasks(&self) -> Option<&[Task]> {
    self.timesheet_tasks.as_deref()
  }

  pub fn set_timesheet_tasks(&mut self, tasks: Vec<Task>) {
    self.timesheet_tasks = Some(tasks);
  }

  pub fn view_tasks(&self) -> Option<&[Task]> {
    self.view_tasks.as_deref()
  }

  pub fn set_view_tasks(&mut self, tasks: Vec<Task>) {
    self.view_tasks = Some(tasks);
  }

  pub fn time_entries(&self) -> Option<&[TimeEntry]> {
    self.time_entries.as_deref()
  }

  pub fn set_time_entries(&mut self, entries: Vec<TimeEntry>) {
    self.time_entries = Some(entries);
  }

  pub fn task(&self, id: &str) -> Option<&Task> {
    self.task_by_id.get(id)
  }

  pub fn insert_task(&mut self, id: &str, task: Task) {
    self.task_by_id.insert(id.to_string(), task);
  }

  pub fn comments(&self, task_id: &str) -> Option<&[Comment]> {
    self.comments_by_task_id.get(task_id).map(Vec::as_slice)
  }

  pub fn insert_comments(&mut self, task_id: &str, comments: Vec<Comment>) {
    self.comments_by_task_id.insert(task_id.to_string(), comments);
  }
}

/// A snapshot that cannot be serialized is a failure to write `path`.
fn encode_failure(path: &Path, e: serde_json::Error) -> ClickupError {
  ClickupError::persistence(path, std::io::Error::from(e))
}

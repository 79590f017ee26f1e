use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::api_types::{lenient_i64, lenient_string, null_as_default, user_id_string, TaskRef};

/// Task as returned by the list and detail endpoints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Task {
  pub id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default)]
  pub custom_id: Option<String>,
  /// Only populated by the detail endpoint.
  #[serde(
    rename = "markdown_description",
    default,
    deserialize_with = "null_as_default"
  )]
  pub description: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub status: Status,
  #[serde(default, deserialize_with = "null_as_default")]
  pub assignees: Vec<User>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub list: TaskList,
  #[serde(default, deserialize_with = "null_as_default")]
  pub tags: Vec<Tag>,
  #[serde(rename = "subtasks_count", default, deserialize_with = "lenient_i64")]
  pub subtask_count: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Status {
  #[serde(rename = "status", default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub color: String,
  #[serde(rename = "orderindex", default, deserialize_with = "lenient_i64")]
  pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct User {
  #[serde(default, deserialize_with = "user_id_string")]
  pub id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub username: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub initials: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub color: String,
  #[serde(rename = "profilePicture", default)]
  pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Team {
  #[serde(deserialize_with = "lenient_string")]
  pub id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(default)]
  pub color: Option<String>,
}

/// The list a task lives in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskList {
  #[serde(default, deserialize_with = "lenient_string")]
  pub id: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tag {
  #[serde(default, deserialize_with = "null_as_default")]
  pub name: String,
  #[serde(rename = "tag_bg", default, deserialize_with = "null_as_default")]
  pub background: String,
  #[serde(rename = "tag_fg", default, deserialize_with = "null_as_default")]
  pub foreground: String,
}

/// A tracked time interval. Immutable on the server: edits are a delete
/// followed by a create.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimeEntry {
  #[serde(deserialize_with = "lenient_string")]
  pub id: String,
  #[serde(default)]
  pub task: TaskRef,
  /// Unix milliseconds, as a string.
  #[serde(default, deserialize_with = "lenient_string")]
  pub start: String,
  /// Milliseconds, as a string.
  #[serde(default, deserialize_with = "lenient_string")]
  pub duration: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub end: String,
}

impl TimeEntry {
  pub fn task_id(&self) -> Option<&str> {
    self.task.id()
  }

  pub fn start_ms(&self) -> Option<i64> {
    self.start.trim().parse().ok()
  }

  /// Unparseable durations count as zero.
  pub fn duration_ms(&self) -> i64 {
    self.duration.trim().parse().unwrap_or(0)
  }

  pub fn hours(&self) -> f64 {
    self.duration_ms() as f64 / MS_PER_HOUR as f64
  }
}

pub const MS_PER_HOUR: i64 = 3_600_000;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Comment {
  #[serde(deserialize_with = "lenient_string")]
  pub id: String,
  #[serde(rename = "comment", default, deserialize_with = "null_as_default")]
  pub parts: Vec<CommentPart>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub comment_text: String,
  #[serde(default, deserialize_with = "null_as_default")]
  pub user: User,
  /// Unix milliseconds, as a string.
  #[serde(default, deserialize_with = "lenient_string")]
  pub date: String,
}

/// One fragment of a rich-text comment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommentPart {
  #[serde(default, deserialize_with = "null_as_default")]
  pub text: String,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub bookmark: Option<Map<String, Value>>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub attributes: Map<String, Value>,
}

//! Serde types matching ClickUp API envelopes, plus lenient decoders for
//! the loosely-typed fields the API returns.
//!
//! Domain types in `types.rs` deserialize straight from the wire; the
//! envelopes here only exist to unwrap them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::types::{Comment, Task, Team, TimeEntry, User};

// ============================================================================
// Response envelopes
// ============================================================================

/// One page of `/team/{id}/task` or `/view/{id}/task`.
#[derive(Debug, Deserialize)]
pub struct ApiTasksPage {
  #[serde(default, deserialize_with = "null_as_default")]
  pub tasks: Vec<Task>,
  #[serde(default, deserialize_with = "null_as_default")]
  pub last_page: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiUserResponse {
  pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct ApiTeamsResponse {
  #[serde(default, deserialize_with = "null_as_default")]
  pub teams: Vec<Team>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCommentsResponse {
  #[serde(default, deserialize_with = "null_as_default")]
  pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTimeEntriesResponse {
  #[serde(default, deserialize_with = "null_as_default")]
  pub data: Vec<TimeEntry>,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /task/{id}/time`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiCreateTimeEntry {
  /// Unix milliseconds.
  pub start: i64,
  /// Duration in milliseconds.
  pub time: i64,
}

// ============================================================================
// Polymorphic fields
// ============================================================================

/// A user identifier as it appears on the wire: ClickUp sends numbers,
/// older payloads and our own cache file carry strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UserId {
  Numeric(serde_json::Number),
  Text(String),
}

impl UserId {
  /// Decimal string with no fractional part.
  pub fn normalize(&self) -> String {
    match self {
      UserId::Text(s) => s.clone(),
      UserId::Numeric(n) => {
        if let Some(i) = n.as_i64() {
          i.to_string()
        } else if let Some(u) = n.as_u64() {
          u.to_string()
        } else {
          format!("{:.0}", n.as_f64().unwrap_or_default())
        }
      }
    }
  }
}

/// The `task` field of a time entry.
///
/// Usually `{"id": "...", "name": "..."}`, but entries for deleted tasks or
/// odd integrations carry other shapes; those decode as `Unknown` rather than
/// failing the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TaskRef {
  Task {
    id: String,
    name: Option<String>,
  },
  #[default]
  Unknown,
}

impl TaskRef {
  pub fn id(&self) -> Option<&str> {
    match self {
      TaskRef::Task { id, .. } => Some(id),
      TaskRef::Unknown => None,
    }
  }

  fn from_value(value: &Value) -> Self {
    let Some(obj) = value.as_object() else {
      return TaskRef::Unknown;
    };
    match obj.get("id").and_then(|v| v.as_str()) {
      Some(id) => TaskRef::Task {
        id: id.to_string(),
        name: obj.get("name").and_then(|v| v.as_str()).map(String::from),
      },
      None => TaskRef::Unknown,
    }
  }
}

impl<'de> Deserialize<'de> for TaskRef {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let value = Value::deserialize(deserializer)?;
    Ok(TaskRef::from_value(&value))
  }
}

impl Serialize for TaskRef {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    match self {
      TaskRef::Task { id, name } => {
        serde_json::json!({ "id": id, "name": name }).serialize(serializer)
      }
      TaskRef::Unknown => serializer.serialize_none(),
    }
  }
}

// ============================================================================
// Helpers
// ============================================================================

/// Treat an explicit `null` like a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: Default + Deserialize<'de>,
{
  Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept a string or a number and keep it as a string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::String(s)) => s,
    Some(Value::Number(n)) => n.to_string(),
    Some(Value::Bool(b)) => b.to_string(),
    _ => String::new(),
  })
}

/// Accept an integer, a float or a numeric string.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Option::<Value>::deserialize(deserializer)?;
  Ok(match value {
    Some(Value::Number(n)) => n
      .as_i64()
      .or_else(|| n.as_f64().map(|f| f as i64))
      .unwrap_or_default(),
    Some(Value::String(s)) => s
      .trim()
      .parse::<f64>()
      .map(|f| f as i64)
      .unwrap_or_default(),
    _ => 0,
  })
}

/// Decode a polymorphic user id and normalize it to a string.
pub fn user_id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(
    Option::<UserId>::deserialize(deserializer)?
      .map(|id| id.normalize())
      .unwrap_or_default(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_numeric_user_id_has_no_fraction() {
    let id: UserId = serde_json::from_str("12345678").unwrap();
    assert_eq!(id.normalize(), "12345678");

    let id: UserId = serde_json::from_str("12345678.0").unwrap();
    assert_eq!(id.normalize(), "12345678");
  }

  #[test]
  fn test_string_user_id_kept() {
    let id: UserId = serde_json::from_str("\"u-42\"").unwrap();
    assert_eq!(id.normalize(), "u-42");
  }

  #[test]
  fn test_task_ref_object() {
    let r: TaskRef = serde_json::from_str(r#"{"id":"abc","name":"Write docs","status":{}}"#).unwrap();
    assert_eq!(r.id(), Some("abc"));
  }

  #[test]
  fn test_task_ref_odd_shapes_are_unknown() {
    for raw in ["null", "\"abc\"", "42", r#"{"id":7}"#, r#"{"name":"x"}"#, "[]"] {
      let r: TaskRef = serde_json::from_str(raw).unwrap();
      assert_eq!(r, TaskRef::Unknown, "input {raw}");
    }
  }

  #[test]
  fn test_tasks_page_tolerates_nulls() {
    let page: ApiTasksPage = serde_json::from_str(r#"{"tasks":null,"last_page":null}"#).unwrap();
    assert!(page.tasks.is_empty());
    assert!(!page.last_page);
  }

  #[test]
  fn test_create_body_shape() {
    let body = serde_json::to_value(ApiCreateTimeEntry {
      start: 1_717_394_400_000,
      time: 9_000_000,
    })
    .unwrap();
    assert_eq!(
      body,
      serde_json::json!({"start": 1_717_394_400_000_i64, "time": 9_000_000})
    );
  }
}

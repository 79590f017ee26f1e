use chrono::{DateTime, FixedOffset};
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use std::future::Future;
use tracing::{debug, info};

use crate::clickup::api_types::{
  ApiCommentsResponse, ApiCreateTimeEntry, ApiTasksPage, ApiTeamsResponse, ApiTimeEntriesResponse,
  ApiUserResponse,
};
use crate::clickup::error::{ClickupError, Result};
use crate::clickup::transport::{ApiRequest, ReqwestTransport, Transport};
use crate::clickup::types::{Comment, Task, Team, TimeEntry, User};

/// Pages requested concurrently per round of a paged fetch.
pub const PAGE_BATCH: u32 = 3;

/// ClickUp API client bound to one token and team. No caching here; see
/// `CachedClickupClient`.
pub struct ClickupClient<T: Transport = ReqwestTransport> {
  transport: T,
  token: String,
  team_id: String,
}

impl<T: Transport> ClickupClient<T> {
  pub fn new(transport: T, token: impl Into<String>, team_id: impl Into<String>) -> Self {
    Self {
      transport,
      token: token.into(),
      team_id: team_id.into(),
    }
  }

  #[cfg(test)]
  pub(crate) fn transport(&self) -> &T {
    &self.transport
  }

  async fn send(&self, operation: &str, request: ApiRequest) -> Result<Vec<u8>> {
    let response = self.transport.send(request).await?;
    if !response.is_success() {
      return Err(ClickupError::protocol(operation, response.status));
    }
    Ok(response.body)
  }

  async fn get_json<R: DeserializeOwned>(&self, operation: &str, request: ApiRequest) -> Result<R> {
    let body = self.send(operation, request).await?;
    serde_json::from_slice(&body).map_err(|e| ClickupError::decode(operation, e))
  }

  /// Get the user owning `token`. Used during setup, before a token is stored.
  pub async fn get_current_user(&self, token: &str) -> Result<User> {
    let response: ApiUserResponse = self
      .get_json("get current user", ApiRequest::get("/api/v2/user", token))
      .await?;
    Ok(response.user)
  }

  /// Get the teams (workspaces) visible to `token`.
  pub async fn get_teams(&self, token: &str) -> Result<Vec<Team>> {
    let response: ApiTeamsResponse = self
      .get_json("get teams", ApiRequest::get("/api/v2/team", token))
      .await?;
    Ok(response.teams)
  }

  /// Get a single task with its markdown description
  pub async fn get_task(&self, task_id: &str) -> Result<Task> {
    let path = format!("/api/v2/task/{}?include_markdown_description=true", task_id);
    self
      .get_json(&format!("get task {}", task_id), ApiRequest::get(path, &self.token))
      .await
  }

  pub async fn get_task_comments(&self, task_id: &str) -> Result<Vec<Comment>> {
    let path = format!("/api/v2/task/{}/comment", task_id);
    let response: ApiCommentsResponse = self
      .get_json("get comments", ApiRequest::get(path, &self.token))
      .await?;
    Ok(response.comments)
  }

  /// One page of the team-wide task search. `filter` is a raw query string.
  pub async fn get_tasks_page(&self, filter: &str, page: u32) -> Result<ApiTasksPage> {
    let path = if filter.is_empty() {
      format!("/api/v2/team/{}/task?page={}", self.team_id, page)
    } else {
      format!("/api/v2/team/{}/task?{}&page={}", self.team_id, filter, page)
    };
    self
      .get_json("get tasks", ApiRequest::get(path, &self.token))
      .await
  }

  pub async fn get_view_page(&self, view_id: &str, page: u32) -> Result<ApiTasksPage> {
    let path = format!("/api/v2/view/{}/task?page={}", view_id, page);
    self
      .get_json("get view tasks", ApiRequest::get(path, &self.token))
      .await
  }

  /// Get every task matching `filter` across all pages.
  pub async fn get_timesheet_tasks(&self, filter: &str) -> Result<Vec<Task>> {
    fetch_pages(|page| self.get_tasks_page(filter, page)).await
  }

  /// Get every task in a saved view across all pages.
  pub async fn get_view_tasks(&self, view_id: &str) -> Result<Vec<Task>> {
    fetch_pages(|page| self.get_view_page(view_id, page)).await
  }

  /// Get all time entries of one user in the bound team.
  pub async fn get_time_entries(&self, user_id: &str) -> Result<Vec<TimeEntry>> {
    let path = format!(
      "/api/v2/team/{}/time_entries?assignee={}",
      self.team_id, user_id
    );
    let response: ApiTimeEntriesResponse = self
      .get_json("get time entries", ApiRequest::get(path, &self.token))
      .await?;
    Ok(response.data)
  }

  /// Log `duration_ms` on a task starting at `start`. The entry is
  /// attributed to the token's owner, which is `user_id` in practice.
  pub async fn create_time_entry(
    &self,
    task_id: &str,
    start: DateTime<FixedOffset>,
    duration_ms: i64,
    user_id: &str,
  ) -> Result<()> {
    let body = ApiCreateTimeEntry {
      start: start.timestamp_millis(),
      time: duration_ms,
    };
    let body = serde_json::to_value(&body).map_err(|e| ClickupError::decode("encode body", e))?;
    let path = format!("/api/v2/task/{}/time", task_id);

    info!(task_id, user_id, %start, duration_ms, "creating time entry");
    self
      .send("create time entry", ApiRequest::post(path, &self.token, body))
      .await?;
    Ok(())
  }

  pub async fn delete_time_entry(&self, task_id: &str, entry_id: &str) -> Result<()> {
    let path = format!("/api/v2/task/{}/time/{}", task_id, entry_id);

    info!(task_id, entry_id, "deleting time entry");
    self
      .send(
        &format!("delete time entry {}", entry_id),
        ApiRequest::delete(path, &self.token),
      )
      .await?;
    Ok(())
  }
}

/// Fetch pages in rounds of `PAGE_BATCH` concurrent requests.
///
/// Results are appended in page order. A round that contains a `last_page`
/// ends the loop after appending up to and including that page; so does a
/// round where every page came back empty. The first failing request fails
/// the whole fetch and the rest of its round is dropped.
pub async fn fetch_pages<F, Fut>(fetch_page: F) -> Result<Vec<Task>>
where
  F: Fn(u32) -> Fut,
  Fut: Future<Output = Result<ApiTasksPage>>,
{
  let mut tasks = Vec::new();
  let mut first = 0u32;

  loop {
    debug!(first_page = first, batch = PAGE_BATCH, "fetching page batch");
    let batch = try_join_all((first..first + PAGE_BATCH).map(&fetch_page)).await?;

    let mut done = batch.iter().all(|page| page.tasks.is_empty());
    for page in batch {
      let is_last = page.last_page;
      tasks.extend(page.tasks);
      if is_last {
        done = true;
        break;
      }
    }

    if done {
      break;
    }
    first += PAGE_BATCH;
  }

  Ok(tasks)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::clickup::transport::testing::FakeTransport;
  use crate::clickup::transport::Method;
  use chrono::TimeZone;
  use serde_json::{json, Value};
  use std::time::Duration;

  fn page(ids: &[&str], last: bool) -> Value {
    let tasks: Vec<Value> = ids
      .iter()
      .map(|id| json!({"id": id, "name": format!("Task {}", id)}))
      .collect();
    json!({"tasks": tasks, "last_page": last})
  }

  fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
  }

  fn client(transport: FakeTransport) -> ClickupClient<FakeTransport> {
    ClickupClient::new(transport, "pk_token", "team1")
  }

  #[tokio::test]
  async fn test_pages_keep_order_regardless_of_completion() {
    let base = "/api/v2/team/team1/task?tags[]=timesheet&page=";
    let transport = FakeTransport::new()
      .route_delayed(
        Method::Get,
        &format!("{}0", base),
        200,
        page(&["A", "B"], false),
        Duration::from_millis(60),
      )
      .route_delayed(
        Method::Get,
        &format!("{}1", base),
        200,
        page(&["C"], false),
        Duration::from_millis(30),
      )
      .route(Method::Get, &format!("{}2", base), 200, page(&["D", "E"], true));
    let client = client(transport);

    let tasks = client.get_timesheet_tasks("tags[]=timesheet").await.unwrap();

    assert_eq!(ids(&tasks), vec!["A", "B", "C", "D", "E"]);
    assert_eq!(client.transport.requests().len(), 3);
  }

  #[tokio::test]
  async fn test_last_page_inside_batch_stops_there() {
    let transport = FakeTransport::new()
      .route(Method::Get, "/api/v2/view/V1/task?page=0", 200, page(&["A"], false))
      .route(Method::Get, "/api/v2/view/V1/task?page=1", 200, page(&["B"], true))
      .route(Method::Get, "/api/v2/view/V1/task?page=2", 200, page(&["Z"], true));
    let client = client(transport);

    let tasks = client.get_view_tasks("V1").await.unwrap();

    assert_eq!(ids(&tasks), vec!["A", "B"]);
    assert_eq!(client.transport.requests().len(), 3);
  }

  #[tokio::test]
  async fn test_continues_with_next_batch() {
    let mut transport = FakeTransport::new();
    for (n, id) in ["A", "B", "C", "D"].iter().enumerate() {
      transport = transport.route(
        Method::Get,
        &format!("/api/v2/view/V1/task?page={}", n),
        200,
        page(&[id], n == 3),
      );
    }
    transport = transport
      .route(Method::Get, "/api/v2/view/V1/task?page=4", 200, page(&[], true))
      .route(Method::Get, "/api/v2/view/V1/task?page=5", 200, page(&[], true));
    let client = client(transport);

    let tasks = client.get_view_tasks("V1").await.unwrap();

    assert_eq!(ids(&tasks), vec!["A", "B", "C", "D"]);
    assert_eq!(client.transport.requests().len(), 6);
  }

  #[tokio::test]
  async fn test_empty_batch_without_last_page_terminates() {
    let transport = FakeTransport::new()
      .route(Method::Get, "/api/v2/view/V1/task?page=0", 200, page(&[], false))
      .route(Method::Get, "/api/v2/view/V1/task?page=1", 200, page(&[], false))
      .route(Method::Get, "/api/v2/view/V1/task?page=2", 200, page(&[], false));
    let client = client(transport);

    let tasks = client.get_view_tasks("V1").await.unwrap();
    assert!(tasks.is_empty());
  }

  #[tokio::test]
  async fn test_failed_page_fails_whole_fetch() {
    let transport = FakeTransport::new()
      .route(Method::Get, "/api/v2/view/V1/task?page=0", 200, page(&["A"], false))
      .route(Method::Get, "/api/v2/view/V1/task?page=1", 500, json!({"err": "boom"}))
      .route(Method::Get, "/api/v2/view/V1/task?page=2", 200, page(&["C"], true));
    let client = client(transport);

    let err = client.get_view_tasks("V1").await.unwrap_err();
    assert!(matches!(
      err,
      ClickupError::Protocol { ref operation, status: 500 } if operation == "get view tasks"
    ));
  }

  #[tokio::test]
  async fn test_requests_carry_raw_token() {
    let transport = FakeTransport::new().route(
      Method::Get,
      "/api/v2/task/T9?include_markdown_description=true",
      200,
      json!({"id": "T9", "name": "Nine", "markdown_description": "**hi**"}),
    );
    let client = client(transport);

    let task = client.get_task("T9").await.unwrap();

    assert_eq!(task.description, "**hi**");
    assert_eq!(client.transport.requests()[0].token, "pk_token");
  }

  #[tokio::test]
  async fn test_setup_calls_use_override_token() {
    let transport = FakeTransport::new()
      .route(
        Method::Get,
        "/api/v2/user",
        200,
        json!({"user": {"id": 81234567, "username": "ada", "initials": "AL", "color": "#123456"}}),
      )
      .route(
        Method::Get,
        "/api/v2/team",
        200,
        json!({"teams": [{"id": "9001", "name": "Acme"}]}),
      );
    let client = ClickupClient::new(transport, "", "");

    let user = client.get_current_user("pk_new").await.unwrap();
    let teams = client.get_teams("pk_new").await.unwrap();

    assert_eq!(user.id, "81234567");
    assert_eq!(teams[0].name, "Acme");
    assert!(client.transport.requests().iter().all(|r| r.token == "pk_new"));
  }

  #[tokio::test]
  async fn test_time_entries_envelope() {
    let transport = FakeTransport::new().route(
      Method::Get,
      "/api/v2/team/team1/time_entries?assignee=U",
      200,
      json!({"data": [{"id": "e1", "task": {"id": "T"}, "start": "1717394400000", "duration": "3600000"}]}),
    );
    let client = client(transport);

    let entries = client.get_time_entries("U").await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].task_id(), Some("T"));
  }

  #[tokio::test]
  async fn test_create_time_entry_body() {
    let transport = FakeTransport::new().route(Method::Post, "/api/v2/task/T/time", 200, json!({}));
    let client = client(transport);
    let start = FixedOffset::east_opt(2 * 3600)
      .unwrap()
      .with_ymd_and_hms(2024, 6, 3, 6, 0, 0)
      .unwrap();

    client
      .create_time_entry("T", start, 9_000_000, "U")
      .await
      .unwrap();

    let requests = client.transport.requests();
    assert_eq!(
      requests[0].body,
      Some(json!({"start": start.timestamp_millis(), "time": 9_000_000}))
    );
  }

  #[tokio::test]
  async fn test_delete_failure_names_entry() {
    let transport =
      FakeTransport::new().route(Method::Delete, "/api/v2/task/T/time/e1", 404, json!({}));
    let client = client(transport);

    let err = client.delete_time_entry("T", "e1").await.unwrap_err();
    assert_eq!(err.to_string(), "failed to delete time entry e1: 404");
  }

  #[tokio::test]
  async fn test_malformed_body_is_decode_error() {
    let transport = FakeTransport::new().route(
      Method::Get,
      "/api/v2/task/T/comment",
      200,
      json!({"comments": "nope"}),
    );
    let client = client(transport);

    let err = client.get_task_comments("T").await.unwrap_err();
    assert!(matches!(err, ClickupError::Decode { .. }));
  }
}

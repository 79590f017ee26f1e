//! Command handlers behind the CLI.

use chrono::{Duration, NaiveDate, Utc};
use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::board::group_by_status;
use crate::cache::CacheStorage;
use crate::clickup::transport::Transport;
use crate::clickup::types::{Comment, Task, Team};
use crate::clickup::{CachedClickupClient, ClickupError};
use crate::comments::{elapsed_since, render_comment};
use crate::config::{Config, InitialView};
use crate::timesheet::reconcile::logged_hours;
use crate::timesheet::{
  build_rows, day_totals, filter_rows, format_hours, parse_hours, sort_rows, week_start, work_days,
  DayLoad, DayZone,
};

const ID_COL: usize = 12;
const TASK_COL: usize = 40;
const DAY_COL: usize = 8;

/// Loaded config plus a client for it.
pub struct Session {
  pub config: Config,
  pub client: CachedClickupClient,
}

impl Session {
  pub fn open(config_dir: &Path) -> Result<Self> {
    let config = Config::load(config_dir)?;
    config.ensure_ready()?;
    let client = CachedClickupClient::new(&config, config_dir)?;
    Ok(Self { config, client })
  }

  fn user_id(&self) -> Result<&str> {
    match self.config.user_id.trim() {
      "" => Err(eyre!("No user id configured. Run `clickup-tui setup` again.")),
      id => Ok(id),
    }
  }
}

#[derive(Debug, Default)]
pub struct SetupOptions {
  pub token: String,
  pub team: Option<String>,
  pub view: Option<String>,
  pub filter: Option<String>,
  pub initial_view: Option<String>,
}

// ============================================================================
// setup
// ============================================================================

pub async fn setup(config_dir: &Path, opts: SetupOptions) -> Result<()> {
  let mut config = Config::load(config_dir)?;
  config.clickup_token = opts.token.trim().to_string();
  if config.clickup_token.is_empty() {
    return Err(eyre!("Token must not be empty"));
  }

  let mut client = CachedClickupClient::new(&config, config_dir)?;

  let teams = client.teams(&config.clickup_token).await?;
  let team = pick_team(&teams, opts.team.as_deref())?;
  if opts.team.is_none() && teams.len() > 1 {
    println!("Token can see {} teams, using the first one:", teams.len());
    for t in &teams {
      println!("  {:<12} {}", t.id, t.name);
    }
    println!("Pass --team to choose another.");
  }

  let user = client.current_user(&config.clickup_token).await?;

  config.team_id = team.id.clone();
  config.user_id = user.id.clone();
  if let Some(view) = opts.view {
    config.view_id = view;
  }
  if let Some(filter) = opts.filter {
    config.timesheet_filter = filter;
  }
  if let Some(view) = opts.initial_view {
    config.initial_view = view.parse()?;
  }

  config.save(config_dir)?;
  // Cached data belongs to the previous account.
  client.clear_cache();

  info!(team_id = %config.team_id, user_id = %config.user_id, "setup complete");
  println!(
    "Configured team {} ({}) for {} (user {}).",
    team.name, team.id, user.username, user.id
  );
  Ok(())
}

fn pick_team<'a>(teams: &'a [Team], wanted: Option<&str>) -> Result<&'a Team> {
  let team = match wanted {
    Some(id) => teams
      .iter()
      .find(|t| t.id == id)
      .ok_or_else(|| ClickupError::NotFound(format!("team {} for this token", id)))?,
    None => teams
      .first()
      .ok_or_else(|| ClickupError::NotFound("any team for this token".to_string()))?,
  };
  Ok(team)
}

// ============================================================================
// board / task
// ============================================================================

pub async fn board(session: &mut Session, view: Option<String>) -> Result<()> {
  let view_id = view.unwrap_or_else(|| session.config.view_id.clone());
  if view_id.trim().is_empty() {
    return Err(eyre!(
      "No view configured. Pass --view or run `clickup-tui setup --view <ID>`."
    ));
  }

  let tasks = session.client.get_view_tasks(&view_id).await?;
  for column in group_by_status(&tasks) {
    println!("{} ({})", column.status.to_uppercase(), column.tasks.len());
    for task in &column.tasks {
      println!("  {:<12} {}{}", display_id(task), task.name, assignee_suffix(task));
    }
    println!();
  }
  Ok(())
}

pub async fn task(session: &mut Session, task_id: &str) -> Result<()> {
  let task = session.client.get_task(task_id).await?;
  let comments = comments_or_empty(&mut session.client, task_id).await;

  println!("{} {}", display_id(&task), task.name);
  println!("Status: {}", task.status.name);
  if !task.list.name.is_empty() {
    println!("List:   {}", task.list.name);
  }
  if !task.tags.is_empty() {
    let tags: Vec<&str> = task.tags.iter().map(|t| t.name.as_str()).collect();
    println!("Tags:   {}", tags.join(", "));
  }
  if task.subtask_count > 0 {
    println!("Subtasks: {}", task.subtask_count);
  }
  if !task.description.trim().is_empty() {
    println!("\n{}", task.description.trim_end());
  }

  if !comments.is_empty() {
    println!("\nComments ({})", comments.len());
    let now = Utc::now();
    for comment in &comments {
      let age = comment
        .date
        .trim()
        .parse::<i64>()
        .map(|ms| elapsed_since(ms, now))
        .unwrap_or_else(|_| "-".to_string());
      println!("\n{} · {}", comment.user.username, age);
      println!("{}", render_comment(comment).trim_end());
    }
  }
  Ok(())
}

/// Comments are secondary: a failed load shows the task without them.
async fn comments_or_empty<T: Transport, S: CacheStorage>(
  client: &mut CachedClickupClient<T, S>,
  task_id: &str,
) -> Vec<Comment> {
  match client.get_task_comments(task_id).await {
    Ok(comments) => comments,
    Err(e) => {
      warn!(task_id, error = %e, "failed to load comments");
      Vec::new()
    }
  }
}

fn display_id(task: &Task) -> &str {
  task.custom_id.as_deref().unwrap_or(&task.id)
}

fn assignee_suffix(task: &Task) -> String {
  if task.assignees.is_empty() {
    return String::new();
  }
  let initials: Vec<&str> = task
    .assignees
    .iter()
    .map(|u| {
      if u.initials.is_empty() {
        u.username.as_str()
      } else {
        u.initials.as_str()
      }
    })
    .collect();
  format!(" [{}]", initials.join(","))
}

// ============================================================================
// timesheet / log
// ============================================================================

pub async fn timesheet(session: &mut Session, week: i64, search: Option<&str>) -> Result<()> {
  let user_id = session.user_id()?.to_string();
  let zone = session.client.zone();
  let filter = session.config.timesheet_filter().to_string();

  let tasks = session.client.get_timesheet_tasks(&filter).await?;
  let entries = session.client.get_timesheet_entries(&user_id).await?;

  let start = week_start(zone.today()) + Duration::weeks(week);
  let mut rows = build_rows(&tasks, &entries, zone);
  sort_rows(&mut rows, start);
  let shown = filter_rows(&rows, search.unwrap_or_default());

  let days = work_days(start);
  let mut header = format!("{:<ID_COL$}{:<TASK_COL$}", "ID", "Task");
  for day in days {
    header.push_str(&format!("{:>DAY_COL$}", day.format("%a %d").to_string()));
  }
  println!("{}", header);

  for row in &shown {
    let mut line = format!(
      "{:<ID_COL$}{:<TASK_COL$}",
      truncate(&row.task_id, ID_COL - 1),
      truncate(&row.task_name, TASK_COL - 1)
    );
    for day in days {
      line.push_str(&format!("{:>DAY_COL$}", format_hours(row.hours_on(day))));
    }
    println!("{}", line);
  }

  let totals = day_totals(shown.iter().copied(), start);
  let mut line = format!("{:<ID_COL$}{:<TASK_COL$}", "", "Total");
  for total in totals {
    let marker = match DayLoad::classify(total) {
      DayLoad::Under => "",
      DayLoad::Full => "*",
      DayLoad::Over => "!",
    };
    line.push_str(&format!("{:>DAY_COL$}", format!("{}{}", format_hours(total), marker)));
  }
  println!("{}", line);
  Ok(())
}

pub async fn log(session: &mut Session, task_id: &str, date: &str, hours: &str) -> Result<()> {
  let user_id = session.user_id()?.to_string();
  let zone = session.client.zone();
  let day = parse_day(date, zone)?;
  let hours = parse_hours(hours)?;

  let entries = session.client.get_timesheet_entries(&user_id).await?;
  let before = logged_hours(&entries, task_id, day, zone);

  session
    .client
    .update_tracking(&user_id, task_id, day, hours)
    .await?;

  let was = format_hours(before);
  if hours > 0.0 {
    println!("Logged {} on {} for {} (was {}).", format_hours(hours), day, task_id, was);
  } else {
    println!("Cleared {} for {} (was {}).", day, task_id, was);
  }
  Ok(())
}

/// `YYYY-MM-DD`, `today` or `yesterday`.
fn parse_day(input: &str, zone: DayZone) -> Result<NaiveDate> {
  match input.trim().to_lowercase().as_str() {
    "today" => Ok(zone.today()),
    "yesterday" => Ok(zone.today() - Duration::days(1)),
    other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
      .map_err(|_| eyre!("Invalid date {:?}, expected YYYY-MM-DD", input)),
  }
}

fn truncate(s: &str, width: usize) -> String {
  if s.chars().count() <= width {
    return s.to_string();
  }
  let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
  out.push('…');
  out
}

// ============================================================================
// refresh / default
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshTargets {
  pub view: bool,
  pub timesheet: bool,
  pub entries: bool,
}

pub fn refresh(session: &mut Session, targets: RefreshTargets) {
  if !(targets.view || targets.timesheet || targets.entries) {
    session.client.clear_cache();
    println!("Cache cleared.");
    return;
  }
  if targets.view {
    session.client.invalidate_view_tasks();
  }
  if targets.timesheet {
    session.client.invalidate_timesheet_tasks();
  }
  if targets.entries {
    session.client.invalidate_time_entries();
  }
  println!("Cache invalidated.");
}

/// Show whichever screen the config starts on.
pub async fn initial(session: &mut Session) -> Result<()> {
  match session.config.initial_view {
    InitialView::Kanban => board(session, None).await,
    InitialView::Timesheet => timesheet(session, 0, None).await,
  }
}

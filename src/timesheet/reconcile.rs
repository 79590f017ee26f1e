//! Turns "task T on day D should total H hours" into delete/create calls.
//!
//! Time entries are immutable on the server, so an edit deletes every entry
//! the task has on that day and creates at most one replacement anchored at
//! [`ANCHOR_HOUR`](super::zone::ANCHOR_HOUR). Planning is pure; executing
//! the plan is the client's job.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::clickup::error::{ClickupError, Result};
use crate::clickup::types::{TimeEntry, MS_PER_HOUR};

use super::zone::DayZone;

/// One remote write, in the order it must be issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackingOp {
  Delete {
    entry_id: String,
  },
  Create {
    start: DateTime<FixedOffset>,
    duration_ms: i64,
  },
}

/// Target hours to whole milliseconds.
pub fn hours_to_ms(hours: f64) -> i64 {
  (hours * MS_PER_HOUR as f64).round() as i64
}

/// Reject hour values no edit can mean.
pub fn validate_hours(hours: f64) -> Result<()> {
  if !hours.is_finite() || hours < 0.0 {
    return Err(ClickupError::InvalidInput(format!(
      "hours must be a non-negative number, got {hours}"
    )));
  }
  Ok(())
}

/// Entries for `task_id` whose start falls on `day` in `zone`.
///
/// Entries with an unknown task reference or an unparseable start never
/// match.
pub fn entries_on_day<'a>(
  entries: &'a [TimeEntry],
  task_id: &'a str,
  day: NaiveDate,
  zone: DayZone,
) -> impl Iterator<Item = &'a TimeEntry> + 'a {
  entries.iter().filter(move |entry| {
    entry.task_id() == Some(task_id)
      && entry
        .start_ms()
        .and_then(|ms| zone.date_of_ms(ms))
        .is_some_and(|d| d == day)
  })
}

/// Logged hours for (`task_id`, `day`).
pub fn logged_hours(entries: &[TimeEntry], task_id: &str, day: NaiveDate, zone: DayZone) -> f64 {
  let ms: i64 = entries_on_day(entries, task_id, day, zone)
    .map(TimeEntry::duration_ms)
    .sum();
  ms as f64 / MS_PER_HOUR as f64
}

/// Plan the writes that bring (`task_id`, `day`) to `target_hours`.
///
/// Every matching entry is deleted first. A single create follows unless the
/// target rounds to zero milliseconds.
pub fn plan(
  entries: &[TimeEntry],
  task_id: &str,
  day: NaiveDate,
  target_hours: f64,
  zone: DayZone,
) -> Result<Vec<TrackingOp>> {
  validate_hours(target_hours)?;

  let mut ops: Vec<TrackingOp> = entries_on_day(entries, task_id, day, zone)
    .map(|entry| TrackingOp::Delete {
      entry_id: entry.id.clone(),
    })
    .collect();

  let duration_ms = hours_to_ms(target_hours);
  if duration_ms > 0 {
    let start = zone
      .anchor(day)
      .ok_or_else(|| ClickupError::InvalidInput(format!("no 06:00 on {day} in this zone")))?;
    ops.push(TrackingOp::Create { start, duration_ms });
  }

  Ok(ops)
}

//! Weekly timesheet grid: one row per timesheet task, one column per
//! working day.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::clickup::types::{Task, TimeEntry};

use super::zone::DayZone;

/// Working days shown per week.
pub const WORK_DAYS: usize = 5;

/// A day's total that counts as a full day.
pub const FULL_DAY_HOURS: f64 = 8.0;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimesheetRow {
  pub task_id: String,
  pub task_name: String,
  pub hours: BTreeMap<NaiveDate, f64>,
}

impl TimesheetRow {
  pub fn hours_on(&self, day: NaiveDate) -> f64 {
    self.hours.get(&day).copied().unwrap_or(0.0)
  }

  /// Hours logged in the 7 days starting at `week_start`.
  pub fn week_hours(&self, week_start: NaiveDate) -> f64 {
    let week_end = week_start + Duration::days(7);
    self.hours.range(week_start..week_end).map(|(_, h)| h).sum()
  }
}

/// One row per task, summing entry hours per calendar day in `zone`.
pub fn build_rows(tasks: &[Task], entries: &[TimeEntry], zone: DayZone) -> Vec<TimesheetRow> {
  tasks
    .iter()
    .map(|task| {
      let mut row = TimesheetRow {
        task_id: task.id.clone(),
        task_name: task.name.clone(),
        hours: BTreeMap::new(),
      };
      for entry in entries.iter().filter(|e| e.task_id() == Some(task.id.as_str())) {
        let Some(day) = entry.start_ms().and_then(|ms| zone.date_of_ms(ms)) else {
          continue;
        };
        *row.hours.entry(day).or_default() += entry.hours();
      }
      row
    })
    .collect()
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
  date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Monday to Friday of the week starting at `week_start`.
pub fn work_days(week_start: NaiveDate) -> [NaiveDate; WORK_DAYS] {
  std::array::from_fn(|i| week_start + Duration::days(i as i64))
}

/// Rows with hours in the displayed week first, then by task name.
pub fn sort_rows(rows: &mut [TimesheetRow], week_start: NaiveDate) {
  rows.sort_by(|a, b| {
    let a_active = a.week_hours(week_start) > 0.0;
    let b_active = b.week_hours(week_start) > 0.0;
    b_active
      .cmp(&a_active)
      .then_with(|| a.task_name.cmp(&b.task_name))
  });
}

/// Case-insensitive substring match on the task name.
pub fn filter_rows<'a>(rows: &'a [TimesheetRow], query: &str) -> Vec<&'a TimesheetRow> {
  let query = query.trim().to_lowercase();
  rows
    .iter()
    .filter(|row| query.is_empty() || row.task_name.to_lowercase().contains(&query))
    .collect()
}

pub fn day_totals<'a>(
  rows: impl IntoIterator<Item = &'a TimesheetRow>,
  week_start: NaiveDate,
) -> [f64; WORK_DAYS] {
  let days = work_days(week_start);
  let mut totals = [0.0; WORK_DAYS];
  for row in rows {
    for (total, day) in totals.iter_mut().zip(days) {
      *total += row.hours_on(day);
    }
  }
  totals
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayLoad {
  Under,
  Full,
  Over,
}

impl DayLoad {
  pub fn classify(total_hours: f64) -> Self {
    // Totals are sums of millisecond-rounded floats.
    const EPS: f64 = 1e-6;
    if (total_hours - FULL_DAY_HOURS).abs() < EPS {
      DayLoad::Full
    } else if total_hours > FULL_DAY_HOURS {
      DayLoad::Over
    } else {
      DayLoad::Under
    }
  }
}

//! Timesheet logic: weekly grid, hours input, and reconciling edits into
//! time-entry writes.

pub mod grid;
pub mod hours;
pub mod reconcile;
pub mod zone;

pub use grid::{build_rows, day_totals, filter_rows, sort_rows, week_start, work_days, DayLoad};
pub use hours::{format_hours, parse_hours};
pub use zone::DayZone;

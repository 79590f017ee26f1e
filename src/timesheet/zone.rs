use chrono::format::{self, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::clickup::error::{ClickupError, Result};

/// Hour of day new time entries start at. Any in-business-hours value
/// keeps the entry on the right calendar day for every viewer.
pub const ANCHOR_HOUR: u32 = 6;

/// The time zone calendar days are interpreted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayZone {
  /// The process's local time zone.
  #[default]
  Local,
  Fixed(FixedOffset),
}

impl DayZone {
  /// Parse `Z`, `UTC`, `+02:00`, `-0530` or `+9`.
  pub fn parse_offset(s: &str) -> Result<Self> {
    let s = s.trim();
    let bad = || ClickupError::InvalidInput(format!("bad UTC offset {:?}", s));
    if s.eq_ignore_ascii_case("z") || s.eq_ignore_ascii_case("utc") {
      return FixedOffset::east_opt(0).map(DayZone::Fixed).ok_or_else(bad);
    }

    // `%z` needs minutes; bare hours get `:00`.
    let padded;
    let offset = match (s.get(..1), s.get(1..)) {
      (Some(sign @ ("+" | "-")), Some(hours))
        if (1..=2).contains(&hours.len()) && hours.bytes().all(|b| b.is_ascii_digit()) =>
      {
        padded = format!("{sign}{hours:0>2}:00");
        padded.as_str()
      }
      _ => s,
    };

    let mut parsed = Parsed::new();
    format::parse(&mut parsed, offset, StrftimeItems::new("%z")).map_err(|_| bad())?;
    parsed.to_fixed_offset().map(DayZone::Fixed).map_err(|_| bad())
  }

  /// Calendar date of a unix-millisecond instant.
  pub fn date_of_ms(&self, ms: i64) -> Option<NaiveDate> {
    let instant = Utc.timestamp_millis_opt(ms).single()?;
    Some(match self {
      DayZone::Local => instant.with_timezone(&Local).date_naive(),
      DayZone::Fixed(offset) => instant.with_timezone(offset).date_naive(),
    })
  }

  /// `day` at `hour`:00 in this zone.
  pub fn at_hour(&self, day: NaiveDate, hour: u32) -> Option<DateTime<FixedOffset>> {
    let naive = day.and_time(NaiveTime::from_hms_opt(hour, 0, 0)?);
    match self {
      DayZone::Local => Local
        .from_local_datetime(&naive)
        .earliest()
        .map(DateTime::<FixedOffset>::from),
      DayZone::Fixed(offset) => offset.from_local_datetime(&naive).single(),
    }
  }

  /// Start instant for entries created on `day`.
  pub fn anchor(&self, day: NaiveDate) -> Option<DateTime<FixedOffset>> {
    self.at_hour(day, ANCHOR_HOUR)
  }

  pub fn today(&self) -> NaiveDate {
    match self {
      DayZone::Local => Local::now().date_naive(),
      DayZone::Fixed(offset) => Utc::now().with_timezone(offset).date_naive(),
    }
  }
}

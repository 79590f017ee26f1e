use crate::clickup::error::{ClickupError, Result};

/// Parse an hours cell: `1.5`, `2h`, `45m`, `1h30m` or `1h 30m`.
pub fn parse_hours(input: &str) -> Result<f64> {
  let input = input.trim().to_lowercase();
  let bad = || ClickupError::InvalidInput(format!("can't read {input:?} as hours"));

  if input.is_empty() {
    return Err(bad());
  }

  if !input.contains('h') && !input.contains('m') {
    let hours: f64 = input.parse().map_err(|_| bad())?;
    return if hours.is_finite() && hours >= 0.0 {
      Ok(hours)
    } else {
      Err(bad())
    };
  }

  let mut hours = 0.0;
  let mut minutes = 0.0;
  let mut number = String::new();
  for c in input.chars() {
    match c {
      'h' | 'm' => {
        let value: f64 = number.trim().parse().map_err(|_| bad())?;
        if !value.is_finite() || value < 0.0 {
          return Err(bad());
        }
        if c == 'h' {
          hours = value;
        } else {
          minutes = value;
        }
        number.clear();
      }
      c if c.is_whitespace() => {}
      c => number.push(c),
    }
  }
  // Trailing digits without a unit.
  if !number.is_empty() {
    return Err(bad());
  }

  Ok(hours + minutes / 60.0)
}

/// Render hours for a grid cell. Zero renders as `-`.
pub fn format_hours(hours: f64) -> String {
  let total_minutes = (hours * 60.0).round() as i64;
  if total_minutes <= 0 {
    return "-".to_string();
  }
  let (h, m) = (total_minutes / 60, total_minutes % 60);
  match (h, m) {
    (0, m) => format!("{m}m"),
    (h, 0) => format!("{h}h"),
    (h, m) => format!("{h}h {m}m"),
  }
}

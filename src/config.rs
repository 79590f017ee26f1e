use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::clickup::error::Result as ClickupResult;
use crate::timesheet::zone::DayZone;

pub const CONFIG_FILE: &str = "config.json";

/// Used when `timesheet_filter` is empty.
pub const DEFAULT_TIMESHEET_FILTER: &str = "tags[]=timesheet";

const APP_DIR: &str = "clickup-tui";
const CONFIG_DIR_ENV: &str = "CLICKUP_TUI_CONFIG_DIR";
const TOKEN_ENV: &str = "CLICKUP_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub clickup_token: String,
  #[serde(default)]
  pub team_id: String,
  #[serde(default)]
  pub user_id: String,
  #[serde(default)]
  pub view_id: String,
  #[serde(default)]
  pub initial_view: InitialView,
  /// Raw query string appended to the team task search.
  #[serde(default)]
  pub timesheet_filter: String,
  /// Fixed UTC offset for calendar days, e.g. `+02:00`. Local time if unset.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub utc_offset: Option<String>,
}

/// Screen shown on start.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitialView {
  #[default]
  Kanban,
  Timesheet,
}

/// Anything but `timesheet` means the board.
impl<'de> Deserialize<'de> for InitialView {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(match raw.as_deref().map(str::trim) {
      Some(v) if v.eq_ignore_ascii_case("timesheet") => InitialView::Timesheet,
      _ => InitialView::Kanban,
    })
  }
}

impl std::str::FromStr for InitialView {
  type Err = color_eyre::Report;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "kanban" => Ok(InitialView::Kanban),
      "timesheet" => Ok(InitialView::Timesheet),
      other => Err(eyre!("Unknown view {:?}, expected kanban or timesheet", other)),
    }
  }
}

impl Config {
  /// Resolve the config directory.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. $CLICKUP_TUI_CONFIG_DIR
  /// 3. $XDG_CONFIG_HOME/clickup-tui (platform config dir elsewhere)
  pub fn resolve_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
      return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|v| !v.is_empty()) {
      return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
      .map(|d| d.join(APP_DIR))
      .ok_or_else(|| eyre!("Could not determine a config directory; pass --config-dir"))
  }

  /// Load `config.json` from `dir` and apply environment overrides.
  pub fn load(dir: &Path) -> Result<Self> {
    let token = std::env::var(TOKEN_ENV).ok();
    Ok(Self::load_from_path(&dir.join(CONFIG_FILE))?.with_token_override(token))
  }

  /// A missing file is an empty config; a malformed one is an error.
  fn load_from_path(path: &Path) -> Result<Self> {
    if !path.exists() {
      return Ok(Self::default());
    }

    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_json::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  fn with_token_override(self, token: Option<String>) -> Self {
    match token.filter(|t| !t.trim().is_empty()) {
      Some(clickup_token) => Self {
        clickup_token,
        ..self
      },
      None => self,
    }
  }

  pub fn save(&self, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
      .map_err(|e| eyre!("Failed to create config dir {}: {}", dir.display(), e))?;

    let path = dir.join(CONFIG_FILE);
    let contents = serde_json::to_string_pretty(self)?;
    std::fs::write(&path, contents)
      .map_err(|e| eyre!("Failed to write config file {}: {}", path.display(), e))?;

    Ok(())
  }

  /// Fail unless setup has stored a token and a team.
  pub fn ensure_ready(&self) -> Result<()> {
    if self.clickup_token.trim().is_empty() {
      return Err(eyre!(
        "No ClickUp token configured. Run `clickup-tui setup --token <TOKEN>` or set {}.",
        TOKEN_ENV
      ));
    }
    if self.team_id.trim().is_empty() {
      return Err(eyre!(
        "No team configured. Run `clickup-tui setup --token <TOKEN>` first."
      ));
    }
    Ok(())
  }

  pub fn timesheet_filter(&self) -> &str {
    match self.timesheet_filter.trim() {
      "" => DEFAULT_TIMESHEET_FILTER,
      filter => filter,
    }
  }

  pub fn zone(&self) -> ClickupResult<DayZone> {
    match self.utc_offset.as_deref().map(str::trim) {
      None | Some("") => Ok(DayZone::Local),
      Some(offset) => DayZone::parse_offset(offset),
    }
  }
}

mod board;
mod cache;
mod clickup;
mod commands;
mod comments;
mod config;
mod logging;
mod timesheet;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;

use commands::{RefreshTargets, Session, SetupOptions};

#[derive(Parser, Debug)]
#[command(name = "clickup-tui")]
#[command(about = "A terminal client for ClickUp boards and timesheets")]
#[command(version)]
struct Args {
  /// Config and cache directory (default: $XDG_CONFIG_HOME/clickup-tui)
  #[arg(long, global = true)]
  config_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Store a token and discover the team and user it belongs to
  Setup {
    #[arg(long)]
    token: String,
    /// Team id; defaults to the first team the token can see
    #[arg(long)]
    team: Option<String>,
    /// View shown on the board
    #[arg(long)]
    view: Option<String>,
    /// Query string selecting timesheet tasks, e.g. "tags[]=timesheet"
    #[arg(long)]
    filter: Option<String>,
    /// kanban or timesheet
    #[arg(long)]
    initial_view: Option<String>,
  },
  /// Show view tasks grouped by status
  Board {
    #[arg(long)]
    view: Option<String>,
  },
  /// Show a task with its comments
  Task { id: String },
  /// Show the weekly timesheet grid
  Timesheet {
    /// Weeks relative to the current one
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    week: i64,
    /// Only show tasks whose name contains this
    #[arg(long)]
    search: Option<String>,
  },
  /// Set the hours logged on a task for one day (0 clears it)
  Log {
    task: String,
    /// YYYY-MM-DD, today or yesterday
    date: String,
    /// 1.5, 2h, 45m or 1h30m
    hours: String,
  },
  /// Drop cached data; everything when no flag is given
  Refresh {
    #[arg(long)]
    view: bool,
    #[arg(long)]
    timesheet: bool,
    #[arg(long)]
    entries: bool,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config_dir = config::Config::resolve_dir(args.config_dir.as_deref())?;
  let _log_guard = logging::init(&config_dir)?;

  let dir = config_dir.as_path();
  match args.command {
    Some(Command::Setup {
      token,
      team,
      view,
      filter,
      initial_view,
    }) => {
      let opts = SetupOptions {
        token,
        team,
        view,
        filter,
        initial_view,
      };
      commands::setup(dir, opts).await
    }
    None => commands::initial(&mut Session::open(dir)?).await,
    Some(Command::Board { view }) => commands::board(&mut Session::open(dir)?, view).await,
    Some(Command::Task { id }) => commands::task(&mut Session::open(dir)?, &id).await,
    Some(Command::Timesheet { week, search }) => {
      commands::timesheet(&mut Session::open(dir)?, week, search.as_deref()).await
    }
    Some(Command::Log { task, date, hours }) => {
      commands::log(&mut Session::open(dir)?, &task, &date, &hours).await
    }
    Some(Command::Refresh {
      view,
      timesheet,
      entries,
    }) => {
      let targets = RefreshTargets {
        view,
        timesheet,
        entries,
      };
      commands::refresh(&mut Session::open(dir)?, targets);
      Ok(())
    }
  }
}

//! Process configuration for the dashboard shell.
//!
//! Flags and environment variables are parsed with clap. Role and reporting
//! period live in the persisted settings; `--role` only overrides the role for
//! one invocation.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "involve-dashboard")]
#[command(about = "Local KPI dashboard data service")]
pub struct Args {
    /// Directory holding the SQLite state file and logs
    #[arg(long, env = "INVOLVE_DATA_DIR", default_value = ".involve-dashboard")]
    pub data_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Role for this invocation (viewer, editor, admin)
    #[arg(long, env = "INVOLVE_ROLE")]
    pub role: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List entities of a kind, archived ones excluded unless asked for
    List {
        kind: String,
        #[arg(long)]
        include_archived: bool,
    },
    /// Show one entity by id, archived or not
    Get { kind: String, id: String },
    /// Create an entity from a JSON object
    Create { kind: String, json: String },
    /// Merge a JSON object patch into an entity
    Update { kind: String, id: String, json: String },
    Archive { kind: String, id: String },
    Restore { kind: String, id: String },
    /// Audit history, newest first; all entries when no entity is given
    History {
        kind: Option<String>,
        id: Option<String>,
    },
    /// Summary statistics across collections
    Stats,
    UpcomingLaunches,
    /// Launches planned inside the selected reporting period
    PeriodLaunches,
    /// KPI progress for one department
    Department { department: String },
    Roadmap {
        #[arg(long)]
        year: Option<i32>,
    },
    /// Show settings, or merge a JSON patch into them
    Settings { json: Option<String> },
    /// Drop the stored document; the next read re-seeds it
    Reset,
}

#[cfg(test)]
mod tests {
    use super::{Args, Command};
    use clap::Parser;

    #[test]
    fn parses_update_with_role_override() {
        let args = Args::try_parse_from([
            "involve-dashboard",
            "--data-dir",
            "/tmp/dash",
            "--role",
            "editor",
            "update",
            "kpi",
            "kpi-1",
            "{\"value\":3}",
        ])
        .expect("parse");

        assert_eq!(args.data_dir.to_string_lossy(), "/tmp/dash");
        assert_eq!(args.role.as_deref(), Some("editor"));
        match args.command {
            Command::Update { kind, id, json } => {
                assert_eq!(kind, "kpi");
                assert_eq!(id, "kpi-1");
                assert_eq!(json, "{\"value\":3}");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn history_arguments_are_optional() {
        let args = Args::try_parse_from(["involve-dashboard", "history"]).expect("parse");
        assert!(matches!(args.command, Command::History { kind: None, id: None }));
    }
}

//! LeagueDesk CLI Module
//! Command-line interface for LeagueDesk operations

pub mod formatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::roster::OwnerKind;

#[derive(Parser, Debug)]
#[command(name = "leaguedesk")]
#[command(author = "LeagueDesk Team")]
#[command(version)]
#[command(about = "Tournament admin back end: match scheduling and rosters", long_about = None)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Log filter used when RUST_LOG is not set (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "LEAGUEDESK_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new LeagueDesk project in the project directory
    Init {
        /// Project name
        #[arg(short, long)]
        name: String,
    },

    /// Migration commands
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },

    /// Start the REST API server
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short = 'P', long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,
    },

    /// Show project status
    Status,

    /// Match field/time assignments
    Schedule {
        #[command(subcommand)]
        action: ScheduleAction,
    },

    /// Coach assignments and team rosters
    Roster {
        #[command(subcommand)]
        action: RosterAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum MigrateAction {
    /// Create a new project migration
    Create {
        /// Migration name
        name: String,
    },

    /// Apply pending migrations
    Push,

    /// Check migration status
    Check,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleAction {
    /// Report conflicts for a JSON file of proposed assignments
    Check {
        /// File containing a JSON array of {matchId, fieldId, date, startTime, duration?}
        file: PathBuf,
    },

    /// Save the assignments in a JSON file unless they conflict
    Apply {
        /// File containing a JSON array of {matchId, fieldId, date, startTime, duration?}
        file: PathBuf,
    },

    /// List stored assignments
    List {
        /// Only this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        /// Only this field
        #[arg(long)]
        field: Option<String>,
    },

    /// Remove a match from the schedule
    Unassign {
        /// Match identifier
        match_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RosterAction {
    /// Show current members (program/session coaches, team players)
    Show {
        /// program, session or team
        kind: OwnerKind,

        /// Owner identifier
        owner: String,
    },

    /// Replace the members of an owner with the given list
    Set {
        /// program, session or team
        kind: OwnerKind,

        /// Owner identifier
        owner: String,

        /// Desired member identifiers (none clears the membership)
        members: Vec<String>,
    },
}

impl Cli {
    pub fn get_project_dir(&self) -> PathBuf {
        self.project
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roster_set() {
        let cli = Cli::try_parse_from([
            "leaguedesk", "--format", "json", "roster", "set", "session", "session-1", "c2", "c3",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Roster {
                action: RosterAction::Set { kind, owner, members },
            } => {
                assert_eq!(kind, OwnerKind::Session);
                assert_eq!(owner, "session-1");
                assert_eq!(members, vec!["c2", "c3"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_owner_kind() {
        assert!(Cli::try_parse_from(["leaguedesk", "roster", "show", "league", "x"]).is_err());
    }

    #[test]
    fn test_serve_defaults_to_config() {
        let cli = Cli::try_parse_from(["leaguedesk", "-p", "/tmp/cup", "serve"]).unwrap();
        assert_eq!(cli.get_project_dir(), PathBuf::from("/tmp/cup"));
        assert!(matches!(cli.command, Commands::Serve { port: None, host: None }));
    }
}

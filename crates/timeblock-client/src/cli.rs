//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use timeblock_core::SchedulingRequest;

/// timeblock - Fill free calendar time with focus blocks
#[derive(Debug, Parser)]
#[command(name = "timeblock")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "TIMEBLOCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authentication commands
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Create one event per free slot in a date range
    Schedule(ScheduleArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authentication actions.
#[derive(Debug, Subcommand)]
pub enum AuthAction {
    /// Authorize access to Google Calendar
    Connect {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long)]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long)]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// This is the JSON file downloaded from the Google Cloud Console
        /// OAuth 2.0 credentials page. Alternative to providing client_id
        /// and client_secret separately.
        #[arg(long, conflicts_with_all = ["client_id", "client_secret"])]
        credentials_file: Option<PathBuf>,

        /// Print the consent URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },

    /// Show whether a usable credential is stored
    Status,

    /// Remove the stored credential
    Logout,
}

/// Scheduling request, as flags or as a JSON document.
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Title of every created event
    #[arg(long)]
    pub event_name: Option<String>,

    /// Calendar color id for created events
    #[arg(long)]
    pub event_color: Option<String>,

    /// First day (YYYY-MM-DD)
    #[arg(long)]
    pub date_start: Option<String>,

    /// Last day, inclusive (YYYY-MM-DD)
    #[arg(long)]
    pub date_end: Option<String>,

    /// Start of the working day (HH:MM)
    #[arg(long)]
    pub workday_start: Option<String>,

    /// End of the working day (HH:MM)
    #[arg(long)]
    pub workday_end: Option<String>,

    /// Time the task starts on the first day (HH:MM)
    #[arg(long)]
    pub task_start: Option<String>,

    /// Time the task ends on the last day (HH:MM)
    #[arg(long)]
    pub task_end: Option<String>,

    /// Read the request from a JSON file (`-` for stdin); flags override its fields
    #[arg(long, value_name = "FILE")]
    pub request: Option<PathBuf>,

    /// Query and filter, but do not create events
    #[arg(long)]
    pub dry_run: bool,
}

impl ScheduleArgs {
    /// Overlays the flags that were given on top of `base`.
    pub fn apply_to(&self, base: SchedulingRequest) -> SchedulingRequest {
        fn pick(flag: &Option<String>, fallback: Option<String>) -> Option<String> {
            flag.clone().or(fallback)
        }

        SchedulingRequest {
            event_name: pick(&self.event_name, base.event_name),
            event_color: pick(&self.event_color, base.event_color),
            date_start: pick(&self.date_start, base.date_start),
            date_end: pick(&self.date_end, base.date_end),
            workday_start: pick(&self.workday_start, base.workday_start),
            workday_end: pick(&self.workday_end, base.workday_end),
            task_start: pick(&self.task_start, base.task_start),
            task_end: pick(&self.task_end, base.task_end),
        }
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration and credential file paths
    Path,
}

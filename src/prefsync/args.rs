use clap::{Parser, Subcommand};
use prefsync::model::{GridKey, TeamId, Theme};

#[derive(Parser, Debug)]
#[command(name = "prefsync", version)]
#[command(about = "Inspect and edit synced display preferences", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the full preference document
    Show {
        /// Print the document as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or set the theme (light, dark, system)
    Theme { value: Option<Theme> },

    /// Manage per-team color overrides
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },

    /// Show or edit the visible columns of a grid
    #[command(alias = "cols")]
    Columns {
        /// Grid key (roster, rosterAll, rosterOffense, rosterDefense,
        /// rosterSpecialTeams, depthChart, standings)
        grid: GridKey,

        #[command(subcommand)]
        action: Option<ColumnAction>,
    },

    /// Work with numeric filter expressions (e.g. ">=25", "<5", "10")
    Filter {
        #[command(subcommand)]
        action: FilterAction,
    },

    /// Restore every preference to its default
    Reset,

    /// Get or set configuration
    Config {
        /// Configuration key (debounce-ms, user, poll-system-theme-ms)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum TeamAction {
    /// Set a team's colors (#rgb or #rrggbb)
    Set {
        team: TeamId,
        primary: String,
        secondary: String,
        #[arg(long)]
        accent: Option<String>,
    },

    /// Remove a team's colors
    #[command(alias = "remove")]
    Rm { team: TeamId },

    /// Print a team's colors
    Get { team: TeamId },
}

#[derive(Subcommand, Debug)]
pub enum ColumnAction {
    /// List columns, visible first
    #[command(alias = "ls")]
    List,

    /// Show a hidden column or hide a visible one
    Toggle { column: String },

    /// Move a visible column one place towards the start
    Up { column: String },

    /// Move a visible column one place towards the end
    Down { column: String },

    /// Move a column to the position another column occupies
    Move { from: String, to: String },

    /// Restore the default visible columns
    Reset,

    /// Set a column's width in pixels
    Width { column: String, width: u32 },
}

#[derive(Subcommand, Debug)]
pub enum FilterAction {
    /// Parse an expression and print its normalized form
    Parse {
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },

    /// Check a value against an expression
    Eval {
        #[arg(allow_hyphen_values = true)]
        expression: String,

        /// Value to test; omit for a missing value
        #[arg(allow_hyphen_values = true)]
        value: Option<f64>,
    },

    /// Store a filter for a grid column
    Set {
        grid: GridKey,
        column: String,
        #[arg(allow_hyphen_values = true)]
        expression: String,
    },

    /// Remove a grid column's filter
    Clear { grid: GridKey, column: String },
}

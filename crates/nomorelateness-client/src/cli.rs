//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// no-more-lateness - join your online meetings on time
#[derive(Debug, Parser)]
#[command(name = "no-more-lateness")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "NO_MORE_LATENESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The command to run; `view` when none was given.
    pub fn command_or_default(self) -> Command {
        self.command.unwrap_or(Command::View {
            attendee_address: None,
            limit: None,
        })
    }
}

/// Available commands.
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Display a list of upcoming online meetings
    View {
        /// Your attendee email address, used for the GOING column
        #[arg(long, short = 'a')]
        attendee_address: Option<String>,

        /// Maximum number of events to fetch
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Join every meeting within 5 minutes of its start time
    Join {
        /// Print the meetings that would be joined without opening them
        #[arg(long)]
        dry_run: bool,
    },

    /// Authentication commands
    Auth {
        #[command(subcommand)]
        provider: AuthProvider,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Authentication providers.
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum AuthProvider {
    /// Authenticate with Google Calendar
    #[cfg(feature = "google")]
    Google {
        /// OAuth client ID (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_ID")]
        client_id: Option<String>,

        /// OAuth client secret (from Google Cloud Console)
        #[arg(long, env = "GOOGLE_CLIENT_SECRET")]
        client_secret: Option<String>,

        /// Path to Google Cloud Console credentials JSON file
        ///
        /// Alternative to providing client_id and client_secret separately.
        #[arg(long, env = "GOOGLE_CREDENTIALS_FILE")]
        credentials_file: Option<PathBuf>,

        /// Force re-authentication even if already authenticated
        #[arg(long, short)]
        force: bool,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

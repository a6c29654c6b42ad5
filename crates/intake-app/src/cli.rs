//! Command-line surface of the import service.
//!
//! # Design
//! - Configuration comes from the environment; the command line only picks the mode.
//! - `run` is the default so the bare binary behaves as the scheduled service.

use clap::{Args, Parser, Subcommand};

/// Parsed command line.
#[derive(Debug, Parser)]
#[command(
    name = "intake",
    version,
    about = "Moves staged per-user uploads into managed storage once they stop growing"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    /// Selected command, defaulting to [`Command::Run`].
    #[must_use]
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

/// Execution modes.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run the import job every configured interval until interrupted.
    Run,
    /// Run a single import job and exit.
    Once(OnceArgs),
}

impl Command {
    /// Label recorded on the application span.
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Run => "daemon",
            Self::Once(_) => "once",
        }
    }
}

/// Options for a single job.
#[derive(Debug, Clone, PartialEq, Eq, Args)]
pub struct OnceArgs {
    /// Import only this user instead of every user in the directory.
    #[arg(long)]
    pub user: Option<String>,
    /// Print the job summary as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

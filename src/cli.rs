use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qmlsync", version, about = "Keep a QML project storage database in sync with the files on disk")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON).
    #[arg(short, long, global = true, value_name = "FILE", env = "QMLSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Raise the log level; repeat for more. `RUST_LOG` takes precedence.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one update pass and exit.
    Update {
        #[command(flatten)]
        scope: ScopeArgs,
        /// Log the synchronization instead of committing it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run an update pass, then keep the storage in sync until interrupted.
    Watch {
        #[command(flatten)]
        scope: ScopeArgs,
    },
    /// Print what the storage currently holds.
    Dump,
}

/// Overrides for the configured project scope.
#[derive(Args, Debug, Default)]
pub struct ScopeArgs {
    /// Directories to sync. Replaces the configured list when given.
    #[arg(value_name = "DIR")]
    pub directories: Vec<PathBuf>,
    /// Explicit qmltypes files. Replaces the configured list when given.
    #[arg(long = "qmltypes", value_name = "FILE")]
    pub qmltypes: Vec<PathBuf>,
    #[arg(long, value_name = "NAME")]
    pub project_part: Option<String>,
}

impl Cli {
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

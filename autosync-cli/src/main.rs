//! git-autosync: keep a set of git working copies in sync with their remotes.
//!
//! # Usage
//!
//! ```text
//! git-autosync [--mode head|headless] [--dry-run] [--force] [--repo <path>] [--config <path>]
//! git-autosync status [--json]
//! git-autosync logs [--lines N]
//! ```
//!
//! Every command accepts `--state-dir <path>` (default `<tmp>/git-auto-sync`).

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use autosync_engine::{logging, paths, RunMode};
use commands::{logs::LogsArgs, run::RunArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "git-autosync",
    version,
    about = "Pull, commit, and push a configured set of git repositories",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    run: RunArgs,

    /// Directory holding git-sync.log, last-sync.json, and lock.pid.
    #[arg(long, global = true, env = "GIT_AUTOSYNC_STATE_DIR")]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the outcome of the most recent repository sync.
    Status(StatusArgs),

    /// Print the tail of the sync log.
    Logs(LogsArgs),
}

// ---------------------------------------------------------------------------
// Shared RunMode argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `RunMode` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModeArg(pub RunMode);

impl FromStr for ModeArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "head" => Ok(Self(RunMode::Head)),
            "headless" => Ok(Self(RunMode::Headless)),
            other => Err(format!("unknown mode '{other}'; expected: head, headless")),
        }
    }
}

impl fmt::Display for ModeArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<ModeArg> for RunMode {
    fn from(m: ModeArg) -> Self {
        m.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    logging::init_tracing();

    let cli = Cli::parse();
    let state_dir = cli.state_dir.unwrap_or_else(paths::default_state_dir);
    match cli.command {
        Some(Commands::Status(args)) => args.run(&state_dir),
        Some(Commands::Logs(args)) => args.run(&state_dir),
        None => cli.run.run(state_dir),
    }
}

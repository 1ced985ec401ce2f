//! Default command: one sync run over the configured repositories.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use autosync_core::config;
use autosync_engine::{Engine, RunReport, RunRequest};
use autosync_sync::GitCli;

use crate::ModeArg;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// `head` echoes the log to stdout and ignores quiet hours; `headless` is for schedulers.
    #[arg(long, default_value = "headless")]
    pub mode: ModeArg,

    /// Validate each repository and log what would happen without touching git.
    #[arg(long)]
    pub dry_run: bool,

    /// Run even inside quiet hours or skip hours.
    #[arg(long)]
    pub force: bool,

    /// Only sync the configured repository at this path.
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Configuration file (default `<config dir>/git-autosync/config.json`).
    #[arg(long, env = "GIT_AUTOSYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

impl RunArgs {
    pub fn run(self, state_dir: PathBuf) -> Result<()> {
        let config_path = match self.config {
            Some(path) => path,
            None => config::default_config_path().context("could not determine config directory")?,
        };

        let git = GitCli::new().context("failed to start git runner")?;
        let engine = Engine::new(config_path, state_dir, git);
        let request = RunRequest {
            mode: self.mode.into(),
            dry_run: self.dry_run,
            force: self.force,
            repo: self.repo,
        };

        let report = engine.run(&request).context("sync run aborted")?;
        if let RunReport::Completed { total, outcomes, .. } = report {
            let failed = outcomes.iter().filter(|o| !o.is_success()).count();
            if failed > 0 {
                eprintln!("{failed} of {total} repositories failed to sync; see `git-autosync logs`");
            }
        }
        Ok(())
    }
}

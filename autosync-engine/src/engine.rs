use std::path::{Path, PathBuf};
use std::time::Duration;

use autosync_core::{config, RepositoryDescriptor, SyncJournal, SyncOutcome};
use autosync_sync::{RepositorySyncer, StatusRecorder, SyncOptions, VersionControl};

use crate::clock::{Clock, SystemClock};
use crate::error::EngineError;
use crate::lock::{ProcessLock, ProcessProbe, SystemProbe};
use crate::paths::{lock_path_at, log_path_at, status_path_at};
use crate::schedule::{should_skip, RunMode, SkipReason};

/// One invocation's parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    pub mode: RunMode,
    pub dry_run: bool,
    /// Bypass the schedule gate.
    pub force: bool,
    /// Restrict the run to the configured repository at this path.
    pub repo: Option<PathBuf>,
}

/// How a run that held the lock ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    NoRepositories,
    Skipped(SkipReason),
    Completed {
        succeeded: usize,
        /// Repositories considered, disabled ones included.
        total: usize,
        outcomes: Vec<SyncOutcome>,
    },
}

/// Lock → config → filter → schedule → sync each repository → summary.
///
/// Everything the run touches is injected, so several engines can run side
/// by side in tests against separate state directories.
pub struct Engine {
    config_path: PathBuf,
    state_dir: PathBuf,
    vcs: Box<dyn VersionControl>,
    probe: Box<dyn ProcessProbe>,
    clock: Box<dyn Clock>,
    options: SyncOptions,
}

impl Engine {
    pub fn new(
        config_path: impl Into<PathBuf>,
        state_dir: impl Into<PathBuf>,
        vcs: impl VersionControl + 'static,
    ) -> Self {
        Self {
            config_path: config_path.into(),
            state_dir: state_dir.into(),
            vcs: Box::new(vcs),
            probe: Box::new(SystemProbe),
            clock: Box::new(SystemClock),
            options: SyncOptions::default(),
        }
    }

    pub fn with_probe(mut self, probe: impl ProcessProbe + 'static) -> Self {
        self.probe = Box::new(probe);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Delay between pipeline stages; zero disables it.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.options.pacing = pacing;
        self
    }

    /// Repository-relative paths never staged.
    pub fn with_exclude(mut self, exclude: Vec<PathBuf>) -> Self {
        self.options.exclude = exclude;
        self
    }

    /// Execute one run. The lock is released on every return path.
    pub fn run(&self, request: &RunRequest) -> Result<RunReport, EngineError> {
        let journal = SyncJournal::new(
            log_path_at(&self.state_dir),
            request.mode.echoes_journal(),
        );
        tracing::info!(
            mode = %request.mode,
            dry_run = request.dry_run,
            force = request.force,
            "starting sync run",
        );

        let lock = ProcessLock::new(lock_path_at(&self.state_dir), self.probe.as_ref());
        let guard = match lock.acquire() {
            Ok(guard) => guard,
            Err(EngineError::LockHeld { pid }) => {
                journal.error(format!("Another sync is running (PID: {pid})"));
                return Err(EngineError::LockHeld { pid });
            }
            Err(err) => return Err(err),
        };

        let result = self.run_locked(request, &journal);
        let released = guard.release();
        let report = result?;
        released?;
        Ok(report)
    }

    fn run_locked(
        &self,
        request: &RunRequest,
        journal: &SyncJournal,
    ) -> Result<RunReport, EngineError> {
        let config = match config::load_at(&self.config_path) {
            Ok(config) => config,
            Err(err) => {
                journal.error(format!("Failed to load config: {err}"));
                return Err(err.into());
            }
        };

        if config.repos.is_empty() {
            journal.warning("No repositories configured");
            return Ok(RunReport::NoRepositories);
        }

        let repos = match &request.repo {
            Some(wanted) => select_repository(config.repos, wanted, journal)?,
            None => config.repos,
        };

        if request.mode.gate_applies(request.force) {
            if let Some(reason) = should_skip(self.clock.hour(), &config.global) {
                journal.skip(reason.to_string());
                return Ok(RunReport::Skipped(reason));
            }
        }

        Ok(self.sync_all(&repos, request.dry_run, journal))
    }

    fn sync_all(
        &self,
        repos: &[RepositoryDescriptor],
        dry_run: bool,
        journal: &SyncJournal,
    ) -> RunReport {
        let recorder = StatusRecorder::new(status_path_at(&self.state_dir));
        let options = SyncOptions {
            dry_run,
            ..self.options.clone()
        };
        let syncer = RepositorySyncer::new(self.vcs.as_ref(), journal, &recorder, &options);

        let mut outcomes = Vec::with_capacity(repos.len());
        for repo in repos {
            if !repo.enabled {
                journal.info(format!("Skipping disabled repo: {}", repo.path.display()));
                continue;
            }
            outcomes.push(syncer.sync(repo));
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let total = repos.len();
        journal.info(format!("Sync completed: {succeeded}/{total} repos successful"));
        tracing::info!(succeeded, total, "sync run finished");

        RunReport::Completed {
            succeeded,
            total,
            outcomes,
        }
    }
}

fn select_repository(
    repos: Vec<RepositoryDescriptor>,
    wanted: &Path,
    journal: &SyncJournal,
) -> Result<Vec<RepositoryDescriptor>, EngineError> {
    let wanted = config::expand_home(wanted);
    let matched: Vec<_> = repos.into_iter().filter(|r| r.path == wanted).collect();
    if matched.is_empty() {
        journal.error(format!("Repository not found: {}", wanted.display()));
        return Err(EngineError::RepositoryNotConfigured { path: wanted });
    }
    Ok(matched)
}

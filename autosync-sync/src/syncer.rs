//! Per-repository sync state machine.
//!
//! ```text
//! Validating ──► Pulling ──► Committing ──► Pushing ──► Succeeded
//!     │             │             │             │
//!     └─────────────┴─────────────┴─────────────┴─────► Failed
//! ```
//!
//! A failed stage halts the remaining stages for that repository only. A
//! pacing delay separates Pulling from Committing and Committing from
//! Pushing. Dry-run stops right after Validating and reports success without
//! touching the working copy. Every terminal state is persisted through the
//! [`StatusRecorder`].

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use autosync_core::{RepositoryDescriptor, SyncJournal, SyncOutcome, SyncStatus};

use crate::error::GitError;
use crate::git::VersionControl;
use crate::status::StatusRecorder;

/// Gap between network/VCS stages.
pub const DEFAULT_PACING: Duration = Duration::from_secs(2);

/// Directory never staged by the commit stage.
pub const LOGS_EXCLUSION: &str = "logs";

pub const COMPLETED_MESSAGE: &str = "Sync completed";
pub const DRY_RUN_MESSAGE: &str = "Dry run - no changes made";

// ---------------------------------------------------------------------------
// Options and states
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub pacing: Duration,
    /// Repository-relative paths excluded from staging.
    pub exclude: Vec<PathBuf>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            pacing: DEFAULT_PACING,
            exclude: vec![PathBuf::from(LOGS_EXCLUSION)],
        }
    }
}

/// Why a repository ended in [`SyncState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncFailure {
    NotFound,
    NotAGitRepo,
    Pull,
    Commit,
    Push,
}

impl SyncFailure {
    /// The message persisted in the status record.
    pub fn message(self) -> &'static str {
        match self {
            SyncFailure::NotFound => "Repository not found",
            SyncFailure::NotAGitRepo => "Not a git repo",
            SyncFailure::Pull => "Pull failed",
            SyncFailure::Commit => "Commit failed",
            SyncFailure::Push => "Push failed",
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Validating,
    Pulling,
    Committing,
    Pushing,
    Succeeded { dry_run: bool },
    Failed(SyncFailure),
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SyncState::Succeeded { .. } | SyncState::Failed(_))
    }

    /// The outcome for a terminal state; `None` while the pipeline is still running.
    pub fn outcome(self, repo: &RepositoryDescriptor) -> Option<SyncOutcome> {
        match self {
            SyncState::Succeeded { dry_run: true } => {
                Some(SyncOutcome::new(repo, SyncStatus::Success, DRY_RUN_MESSAGE))
            }
            SyncState::Succeeded { dry_run: false } => {
                Some(SyncOutcome::new(repo, SyncStatus::Success, COMPLETED_MESSAGE))
            }
            SyncState::Failed(failure) => {
                Some(SyncOutcome::new(repo, SyncStatus::Failed, failure.message()))
            }
            _ => None,
        }
    }
}

/// `Auto-sync: 3 file(s) updated - 2024-05-01 14:05`
pub fn commit_message(changed: usize, now: DateTime<Local>) -> String {
    format!(
        "Auto-sync: {changed} file(s) updated - {}",
        now.format("%Y-%m-%d %H:%M")
    )
}

// ---------------------------------------------------------------------------
// Syncer
// ---------------------------------------------------------------------------

/// Drives one repository at a time through the pipeline.
pub struct RepositorySyncer<'a> {
    vcs: &'a dyn VersionControl,
    journal: &'a SyncJournal,
    recorder: &'a StatusRecorder,
    options: &'a SyncOptions,
}

impl<'a> RepositorySyncer<'a> {
    pub fn new(
        vcs: &'a dyn VersionControl,
        journal: &'a SyncJournal,
        recorder: &'a StatusRecorder,
        options: &'a SyncOptions,
    ) -> Self {
        Self {
            vcs,
            journal,
            recorder,
            options,
        }
    }

    /// Run `repo` to a terminal state and record the outcome.
    pub fn sync(&self, repo: &RepositoryDescriptor) -> SyncOutcome {
        let mut state = SyncState::Validating;
        let outcome = loop {
            if let Some(outcome) = state.outcome(repo) {
                break outcome;
            }
            state = self.step(state, repo);
        };

        if let Err(err) = self.recorder.save(&outcome) {
            self.journal
                .error(format!("Failed to save sync status: {err}"));
        }
        outcome
    }

    /// Advance one state. Terminal states map to themselves.
    pub fn step(&self, state: SyncState, repo: &RepositoryDescriptor) -> SyncState {
        match state {
            SyncState::Validating => match self.validate(repo) {
                Err(failure) => SyncState::Failed(failure),
                Ok(()) if self.options.dry_run => {
                    self.journal.info("DRY RUN - no changes will be made");
                    SyncState::Succeeded { dry_run: true }
                }
                Ok(()) => SyncState::Pulling,
            },
            SyncState::Pulling => {
                if !self.pull(repo) {
                    return SyncState::Failed(SyncFailure::Pull);
                }
                self.pace();
                SyncState::Committing
            }
            SyncState::Committing => {
                if !self.commit(repo) {
                    return SyncState::Failed(SyncFailure::Commit);
                }
                self.pace();
                SyncState::Pushing
            }
            SyncState::Pushing => {
                if !self.push(repo) {
                    return SyncState::Failed(SyncFailure::Push);
                }
                self.journal
                    .info(format!("=== Sync completed: {} ===", repo.path.display()));
                SyncState::Succeeded { dry_run: false }
            }
            terminal => terminal,
        }
    }

    fn validate(&self, repo: &RepositoryDescriptor) -> Result<(), SyncFailure> {
        let path = &repo.path;
        if !path.exists() {
            self.journal
                .error(format!("Repository not found: {}", path.display()));
            return Err(SyncFailure::NotFound);
        }
        if !path.join(".git").exists() {
            self.journal
                .error(format!("Not a git repo: {}", path.display()));
            return Err(SyncFailure::NotAGitRepo);
        }

        self.journal
            .info(format!("=== Syncing: {} ===", path.display()));
        self.journal.info(format!(
            "Branch: {} | Remote: {} | Strategy: {}",
            repo.branch, repo.remote, repo.strategy
        ));
        Ok(())
    }

    fn pull(&self, repo: &RepositoryDescriptor) -> bool {
        let path = repo.path.as_path();
        self.journal.info(format!(
            "Pulling {} ({}/{}, strategy: {})",
            path.display(),
            repo.remote,
            repo.branch,
            repo.strategy
        ));

        if let Err(err) = self.vcs.fetch(path, &repo.remote) {
            self.journal.error(format!("Fetch failed: {err}"));
            return false;
        }

        let behind = match self.vcs.count_behind(path, &repo.remote, &repo.branch) {
            Ok(n) => n,
            Err(GitError::MissingRemoteBranch { reference }) => {
                self.journal.error(format!(
                    "Remote branch missing: {reference} (push the branch once to create it)"
                ));
                return false;
            }
            Err(err) => {
                self.journal
                    .error(format!("Could not count incoming commits: {err}"));
                return false;
            }
        };
        if behind == 0 {
            self.journal.info("Already up-to-date");
            return true;
        }

        self.journal
            .info(format!("Behind by {behind} commit(s), pulling..."));
        match self
            .vcs
            .pull(path, repo.strategy, &repo.remote, &repo.branch)
        {
            Ok(()) => {
                self.journal
                    .success(format!("Pull completed ({behind} commits)"));
                true
            }
            Err(err) => {
                self.journal.error(format!("Pull failed: {err}"));
                false
            }
        }
    }

    fn commit(&self, repo: &RepositoryDescriptor) -> bool {
        let path = repo.path.as_path();
        match self.vcs.has_changes(path) {
            Ok(false) => {
                self.journal.info("No changes to commit");
                return true;
            }
            Ok(true) => {}
            Err(err) => {
                self.journal.error(format!(
                    "Error checking changes in {}: {err}",
                    path.display()
                ));
                return false;
            }
        }

        let changed = match self.vcs.stage_all(path, &self.options.exclude) {
            Ok(n) => n,
            Err(err) => {
                self.journal.error(format!("Staging failed: {err}"));
                return false;
            }
        };
        if changed == 0 {
            self.journal.info("No changes to commit after add");
            return true;
        }

        match self.vcs.commit(path, &commit_message(changed, Local::now())) {
            Ok(()) => {
                self.journal
                    .success(format!("Committed {changed} file(s)"));
                true
            }
            Err(err) => {
                self.journal.error(format!("Commit failed: {err}"));
                false
            }
        }
    }

    fn push(&self, repo: &RepositoryDescriptor) -> bool {
        let path = repo.path.as_path();
        self.journal.info(format!(
            "Pushing {} ({}/{})",
            path.display(),
            repo.remote,
            repo.branch
        ));

        let ahead = match self.vcs.count_ahead(path, &repo.remote, &repo.branch) {
            Ok(n) => n,
            Err(err) => {
                self.journal
                    .error(format!("Could not count outgoing commits: {err}"));
                return false;
            }
        };
        if ahead == 0 {
            self.journal.info("No new commits to push");
            return true;
        }

        self.journal
            .info(format!("Ahead by {ahead} commit(s), pushing..."));
        match self.vcs.push(path, &repo.remote, &repo.branch) {
            Ok(()) => {
                self.journal
                    .success(format!("Push completed ({ahead} commits)"));
                true
            }
            Err(err) => {
                self.journal.error(format!("Push failed: {err}"));
                false
            }
        }
    }

    fn pace(&self) {
        if !self.options.pacing.is_zero() {
            std::thread::sleep(self.options.pacing);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

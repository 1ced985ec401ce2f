//! In-memory [`VersionControl`] for deterministic tests.
//!
//! Each repository path maps to a [`FakeRepo`] holding scripted behind/ahead
//! counts, working-copy changes, and the operations that should fail. Every
//! call is appended to a call log so tests can assert which operations ran.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use autosync_core::MergeStrategy;

use crate::error::GitError;
use crate::git::VersionControl;

/// One [`VersionControl`] operation, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VcsCall {
    Fetch,
    CountBehind,
    Pull,
    CountAhead,
    HasChanges,
    StageAll,
    Commit,
    Push,
    MergeInProgress,
}

impl VcsCall {
    /// Whether the call changes the working copy, the index, history, or the remote.
    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            VcsCall::Fetch | VcsCall::Pull | VcsCall::StageAll | VcsCall::Commit | VcsCall::Push
        )
    }
}

/// Scripted state of one fake working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeRepo {
    pub behind: u32,
    pub ahead: u32,
    /// Modified or untracked paths, relative to the repository root.
    pub changes: Vec<PathBuf>,
    pub staged: Vec<PathBuf>,
    /// Operations that return [`GitError::Failed`].
    pub failing: HashSet<VcsCall>,
    pub merge_in_progress: bool,
    /// `<remote>/<branch>` has never been pushed; both counts fail.
    pub remote_branch_missing: bool,
    /// Merge strategy used by the last successful pull.
    pub last_strategy: Option<MergeStrategy>,
}

impl FakeRepo {
    pub fn behind(mut self, n: u32) -> Self {
        self.behind = n;
        self
    }

    pub fn ahead(mut self, n: u32) -> Self {
        self.ahead = n;
        self
    }

    pub fn changes<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.changes = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn failing(mut self, call: VcsCall) -> Self {
        self.failing.insert(call);
        self
    }

    pub fn without_remote_branch(mut self) -> Self {
        self.remote_branch_missing = true;
        self
    }
}

#[derive(Debug, Default)]
struct FakeState {
    repos: HashMap<PathBuf, FakeRepo>,
    calls: Vec<(PathBuf, VcsCall)>,
}

/// Thread-safe in-memory [`VersionControl`].
#[derive(Debug, Default)]
pub struct FakeVcs {
    state: Mutex<FakeState>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install (or replace) the scripted state for `path`.
    pub fn set_repo(&self, path: impl Into<PathBuf>, repo: FakeRepo) {
        self.lock().repos.insert(path.into(), repo);
    }

    /// Current state for `path` (default if never set).
    pub fn repo(&self, path: &Path) -> FakeRepo {
        self.lock().repos.get(path).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<(PathBuf, VcsCall)> {
        self.lock().calls.clone()
    }

    pub fn calls_for(&self, path: &Path) -> Vec<VcsCall> {
        self.lock()
            .calls
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, call)| *call)
            .collect()
    }

    pub fn mutating_calls(&self) -> Vec<(PathBuf, VcsCall)> {
        self.calls()
            .into_iter()
            .filter(|(_, call)| call.is_mutating())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        // A panicking test thread must not hide the state from the assertions that follow.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Log the call, then run `op` on the repo's state unless the call is scripted to fail.
    fn apply<T>(
        &self,
        path: &Path,
        call: VcsCall,
        op: impl FnOnce(&mut FakeRepo) -> T,
    ) -> Result<T, GitError> {
        let mut state = self.lock();
        state.calls.push((path.to_path_buf(), call));
        let repo = state.repos.entry(path.to_path_buf()).or_default();
        if repo.failing.contains(&call) {
            return Err(GitError::Failed {
                command: format!("{call:?}").to_lowercase(),
                stderr: format!("scripted {call:?} failure"),
            });
        }
        Ok(op(repo))
    }
}

impl VersionControl for FakeVcs {
    fn fetch(&self, repo: &Path, _remote: &str) -> Result<(), GitError> {
        self.apply(repo, VcsCall::Fetch, |_| ())
    }

    fn count_behind(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError> {
        let (behind, missing) =
            self.apply(repo, VcsCall::CountBehind, |r| (r.behind, r.remote_branch_missing))?;
        counted(behind, missing, remote, branch)
    }

    fn pull(
        &self,
        repo: &Path,
        strategy: MergeStrategy,
        _remote: &str,
        _branch: &str,
    ) -> Result<(), GitError> {
        let result = self.apply(repo, VcsCall::Pull, |r| {
            r.behind = 0;
            r.last_strategy = Some(strategy);
        });
        // A failed pull leaves no merge behind, matching the abort in `GitCli::pull`.
        if result.is_err() {
            self.lock()
                .repos
                .entry(repo.to_path_buf())
                .or_default()
                .merge_in_progress = false;
        }
        result
    }

    fn count_ahead(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError> {
        let (ahead, missing) =
            self.apply(repo, VcsCall::CountAhead, |r| (r.ahead, r.remote_branch_missing))?;
        counted(ahead, missing, remote, branch)
    }

    fn has_changes(&self, repo: &Path) -> Result<bool, GitError> {
        self.apply(repo, VcsCall::HasChanges, |r| !r.changes.is_empty())
    }

    fn stage_all(&self, repo: &Path, exclude: &[PathBuf]) -> Result<usize, GitError> {
        self.apply(repo, VcsCall::StageAll, |r| {
            let (excluded, staged): (Vec<_>, Vec<_>) = r
                .changes
                .drain(..)
                .partition(|path| exclude.iter().any(|ex| path.starts_with(ex)));
            r.changes = excluded;
            r.staged.extend(staged);
            r.staged.len()
        })
    }

    fn commit(&self, repo: &Path, _message: &str) -> Result<(), GitError> {
        self.apply(repo, VcsCall::Commit, |r| {
            if !r.staged.is_empty() {
                r.staged.clear();
                r.ahead += 1;
            }
        })
    }

    fn push(&self, repo: &Path, _remote: &str, _branch: &str) -> Result<(), GitError> {
        self.apply(repo, VcsCall::Push, |r| r.ahead = 0)
    }

    fn merge_in_progress(&self, repo: &Path) -> Result<bool, GitError> {
        self.apply(repo, VcsCall::MergeInProgress, |r| r.merge_in_progress)
    }
}

fn counted(n: u32, missing: bool, remote: &str, branch: &str) -> Result<u32, GitError> {
    if missing {
        return Err(GitError::MissingRemoteBranch {
            reference: format!("{remote}/{branch}"),
        });
    }
    Ok(n)
}

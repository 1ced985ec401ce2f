//! Version-control capability and its `git`-binary implementation.
//!
//! Every operation runs with the repository path as working directory and is
//! bounded by a timeout. A timed-out child is killed and reported as
//! [`GitError::TimedOut`], which callers treat like any other failure.

use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::Duration;

use autosync_core::MergeStrategy;
use tokio::process::Command;
use tokio::runtime::Runtime;

use crate::error::{io_err, GitError, SyncError};

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// The version-control operations the sync pipeline needs.
///
/// Each call is independent and independently failable.
pub trait VersionControl {
    /// Download remote history without touching the working copy.
    fn fetch(&self, repo: &Path, remote: &str) -> Result<(), GitError>;

    /// Commits on `<remote>/<branch>` missing from `HEAD`.
    fn count_behind(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError>;

    /// Merge `<remote>/<branch>` resolving conflicting lines with `strategy`.
    ///
    /// On failure the in-progress merge is aborted before returning.
    fn pull(
        &self,
        repo: &Path,
        strategy: MergeStrategy,
        remote: &str,
        branch: &str,
    ) -> Result<(), GitError>;

    /// Commits on `HEAD` missing from `<remote>/<branch>`.
    fn count_ahead(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError>;

    /// Whether the working copy has anything to commit (tracked or untracked).
    fn has_changes(&self, repo: &Path) -> Result<bool, GitError>;

    /// Stage every change except paths under `exclude`; returns the staged path count.
    fn stage_all(&self, repo: &Path, exclude: &[PathBuf]) -> Result<usize, GitError>;

    fn commit(&self, repo: &Path, message: &str) -> Result<(), GitError>;

    /// Push without discarding remote commits the local branch has not incorporated.
    fn push(&self, repo: &Path, remote: &str, branch: &str) -> Result<(), GitError>;

    fn merge_in_progress(&self, repo: &Path) -> Result<bool, GitError>;
}

impl<T: VersionControl + ?Sized> VersionControl for Arc<T> {
    fn fetch(&self, repo: &Path, remote: &str) -> Result<(), GitError> {
        (**self).fetch(repo, remote)
    }

    fn count_behind(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError> {
        (**self).count_behind(repo, remote, branch)
    }

    fn pull(
        &self,
        repo: &Path,
        strategy: MergeStrategy,
        remote: &str,
        branch: &str,
    ) -> Result<(), GitError> {
        (**self).pull(repo, strategy, remote, branch)
    }

    fn count_ahead(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError> {
        (**self).count_ahead(repo, remote, branch)
    }

    fn has_changes(&self, repo: &Path) -> Result<bool, GitError> {
        (**self).has_changes(repo)
    }

    fn stage_all(&self, repo: &Path, exclude: &[PathBuf]) -> Result<usize, GitError> {
        (**self).stage_all(repo, exclude)
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<(), GitError> {
        (**self).commit(repo, message)
    }

    fn push(&self, repo: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
        (**self).push(repo, remote, branch)
    }

    fn merge_in_progress(&self, repo: &Path) -> Result<bool, GitError> {
        (**self).merge_in_progress(repo)
    }
}

// ---------------------------------------------------------------------------
// Timeouts
// ---------------------------------------------------------------------------

/// Per-operation time bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GitTimeouts {
    pub fetch: Duration,
    pub pull: Duration,
    pub push: Duration,
    pub stage: Duration,
    pub commit: Duration,
    /// rev-list, status, diff, rev-parse, merge --abort.
    pub query: Duration,
}

impl Default for GitTimeouts {
    fn default() -> Self {
        Self {
            fetch: Duration::from_secs(30),
            pull: Duration::from_secs(60),
            push: Duration::from_secs(60),
            stage: Duration::from_secs(30),
            commit: Duration::from_secs(30),
            query: Duration::from_secs(30),
        }
    }
}

// ---------------------------------------------------------------------------
// git binary
// ---------------------------------------------------------------------------

/// [`VersionControl`] backed by the `git` executable on `PATH`.
///
/// Owns a current-thread tokio runtime used only to bound child processes.
pub struct GitCli {
    runtime: Runtime,
    timeouts: GitTimeouts,
}

impl GitCli {
    pub fn new() -> Result<Self, SyncError> {
        Self::with_timeouts(GitTimeouts::default())
    }

    pub fn with_timeouts(timeouts: GitTimeouts) -> Result<Self, SyncError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| io_err("tokio-runtime", e))?;
        Ok(Self { runtime, timeouts })
    }

    /// Run `git <args>` in `repo`; any exit status is returned to the caller.
    fn output(&self, repo: &Path, args: &[&str], limit: Duration) -> Result<Output, GitError> {
        let command = args.join(" ");
        tracing::debug!("git {} (in {})", command, repo.display());

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(repo)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let result = self
            .runtime
            .block_on(async { tokio::time::timeout(limit, cmd.output()).await });

        match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(GitError::Spawn { command, source }),
            Err(_) => {
                tracing::warn!(
                    "git {} timed out after {:?} in {}",
                    command,
                    limit,
                    repo.display()
                );
                Err(GitError::TimedOut {
                    command,
                    timeout: limit,
                })
            }
        }
    }

    /// Run `git <args>` in `repo` and require a zero exit status; returns stdout.
    fn run(&self, repo: &Path, args: &[&str], limit: Duration) -> Result<String, GitError> {
        let output = self.output(repo, args, limit)?;
        if !output.status.success() {
            return Err(GitError::Failed {
                command: args.join(" "),
                stderr: diagnostic_text(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// `rev-list --count <range>`, where `range` mentions `remote_ref`.
    fn count(&self, repo: &Path, range: &str, remote_ref: &str) -> Result<u32, GitError> {
        let args = ["rev-list", "--count", range];
        let stdout = match self.run(repo, &args, self.timeouts.query) {
            Ok(stdout) => stdout,
            Err(GitError::Failed { stderr, .. }) if names_unknown_revision(&stderr) => {
                return Err(GitError::MissingRemoteBranch {
                    reference: remote_ref.to_owned(),
                });
            }
            Err(err) => return Err(err),
        };
        stdout.trim().parse().map_err(|_| GitError::Parse {
            command: args.join(" "),
            output: stdout.trim().to_owned(),
        })
    }
}

impl VersionControl for GitCli {
    fn fetch(&self, repo: &Path, remote: &str) -> Result<(), GitError> {
        self.run(repo, &["fetch", remote], self.timeouts.fetch)
            .map(drop)
    }

    fn count_behind(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError> {
        let remote_ref = format!("{remote}/{branch}");
        self.count(repo, &format!("HEAD..{remote_ref}"), &remote_ref)
    }

    fn pull(
        &self,
        repo: &Path,
        strategy: MergeStrategy,
        remote: &str,
        branch: &str,
    ) -> Result<(), GitError> {
        let args = [
            "pull",
            "--no-rebase",
            "--no-edit",
            "-X",
            strategy.as_str(),
            remote,
            branch,
        ];
        match self.run(repo, &args, self.timeouts.pull) {
            Ok(_) => Ok(()),
            Err(err) => {
                self.abort_merge(repo);
                Err(err)
            }
        }
    }

    fn count_ahead(&self, repo: &Path, remote: &str, branch: &str) -> Result<u32, GitError> {
        let remote_ref = format!("{remote}/{branch}");
        self.count(repo, &format!("{remote_ref}..HEAD"), &remote_ref)
    }

    fn has_changes(&self, repo: &Path) -> Result<bool, GitError> {
        let stdout = self.run(repo, &["status", "--porcelain"], self.timeouts.query)?;
        Ok(!stdout.trim().is_empty())
    }

    fn stage_all(&self, repo: &Path, exclude: &[PathBuf]) -> Result<usize, GitError> {
        let excludes: Vec<String> = exclude.iter().map(|p| exclude_pathspec(p)).collect();
        let mut args = vec!["add", "-A", "--", "."];
        args.extend(excludes.iter().map(String::as_str));
        self.run(repo, &args, self.timeouts.stage)?;

        let staged = self.run(
            repo,
            &["diff", "--cached", "--name-only"],
            self.timeouts.query,
        )?;
        Ok(staged.lines().filter(|l| !l.trim().is_empty()).count())
    }

    fn commit(&self, repo: &Path, message: &str) -> Result<(), GitError> {
        self.run(repo, &["commit", "-m", message], self.timeouts.commit)
            .map(drop)
    }

    fn push(&self, repo: &Path, remote: &str, branch: &str) -> Result<(), GitError> {
        let args = [
            "push",
            "--force-with-lease",
            "--force-if-includes",
            remote,
            branch,
        ];
        self.run(repo, &args, self.timeouts.push).map(drop)
    }

    fn merge_in_progress(&self, repo: &Path) -> Result<bool, GitError> {
        let output = self.output(
            repo,
            &["rev-parse", "-q", "--verify", "MERGE_HEAD"],
            self.timeouts.query,
        )?;
        Ok(output.status.success())
    }
}

impl GitCli {
    fn abort_merge(&self, repo: &Path) {
        match self.merge_in_progress(repo) {
            Ok(false) => {}
            Ok(true) | Err(_) => {
                if let Err(err) = self.run(repo, &["merge", "--abort"], self.timeouts.query) {
                    tracing::warn!("merge --abort failed in {}: {}", repo.display(), err);
                }
            }
        }
    }
}

/// `:(exclude)logs/`: directory form so only paths under it are skipped.
fn exclude_pathspec(path: &Path) -> String {
    let raw = path.to_string_lossy();
    format!(":(exclude){}/", raw.trim_end_matches('/'))
}

/// `fatal: ambiguous argument '...': unknown revision or path not in the working tree.`
fn names_unknown_revision(stderr: &str) -> bool {
    stderr.contains("unknown revision") || stderr.contains("bad revision")
}

/// stderr if git wrote any, otherwise stdout (merge conflicts report on stdout).
fn diagnostic_text(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    if !stderr.is_empty() {
        return stderr;
    }
    String::from_utf8_lossy(&output.stdout).trim().to_owned()
}

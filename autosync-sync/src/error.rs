//! Error types for autosync-sync.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Failure of a single version-control call.
///
/// The syncer never propagates these; each one is logged and turned into a
/// failed stage for the repository that produced it.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` process could not be started.
    #[error("failed to run git {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// `git` exited non-zero. `stderr` carries its diagnostic text.
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },

    /// The call exceeded its time bound and the child was killed.
    #[error("git {command} timed out after {}s", timeout.as_secs())]
    TimedOut { command: String, timeout: Duration },

    /// `<remote>/<branch>` is not a known ref: the branch was never pushed
    /// or was deleted upstream.
    #[error("remote branch {reference} does not exist")]
    MissingRemoteBranch { reference: String },

    /// `git` succeeded but printed something we could not interpret.
    #[error("unexpected output from git {command}: {output:?}")]
    Parse { command: String, output: String },
}

/// All errors that can arise from sync bookkeeping (status file, runtime setup).
#[derive(Debug, Error)]
pub enum SyncError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Status record serialization/deserialization error.
    #[error("status record JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

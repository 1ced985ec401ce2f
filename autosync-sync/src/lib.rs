//! # autosync-sync
//!
//! Per-repository pull → commit → push pipeline.
//!
//! [`RepositorySyncer`] drives one repository through the pipeline against a
//! [`VersionControl`] implementation ([`GitCli`] in production, [`FakeVcs`] in
//! tests) and persists the outcome through a [`StatusRecorder`].

pub mod error;
pub mod fake;
pub mod git;
pub mod status;
pub mod syncer;

pub use error::{GitError, SyncError};
pub use fake::{FakeRepo, FakeVcs, VcsCall};
pub use git::{GitCli, GitTimeouts, VersionControl};
pub use status::StatusRecorder;
pub use syncer::{RepositorySyncer, SyncFailure, SyncOptions, SyncState};

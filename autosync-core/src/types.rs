//! Domain types for git-autosync.
//!
//! All path fields use `PathBuf`. Config-facing types deserialize from the
//! camelCase JSON shape of `config.json`; every field except a repository's
//! `path` has a default.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_QUIET_START: u8 = 22;
pub const DEFAULT_QUIET_END: u8 = 9;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Automatic conflict-resolution policy applied during pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Conflicting lines keep the local side.
    #[default]
    Ours,
    /// Conflicting lines take the incoming side.
    Theirs,
}

impl MergeStrategy {
    /// The name git expects after `-X`.
    pub fn as_str(self) -> &'static str {
        match self {
            MergeStrategy::Ours => "ours",
            MergeStrategy::Theirs => "theirs",
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of one repository sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Success,
    Failed,
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStatus::Success => write!(f, "success"),
            SyncStatus::Failed => write!(f, "failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

fn default_branch() -> String {
    DEFAULT_BRANCH.to_owned()
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_owned()
}

fn default_enabled() -> bool {
    true
}

/// One working copy the engine keeps in sync. `path` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDescriptor {
    pub path: PathBuf,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    #[serde(default)]
    pub strategy: MergeStrategy,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl RepositoryDescriptor {
    /// Descriptor for `path` with every other field at its default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            branch: default_branch(),
            remote: default_remote(),
            strategy: MergeStrategy::default(),
            enabled: true,
        }
    }

    pub fn with_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Overnight window in which unattended runs are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHours {
    pub start: u8,
    pub end: u8,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            start: DEFAULT_QUIET_START,
            end: DEFAULT_QUIET_END,
        }
    }
}

/// Time-of-day gating shared by every repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobalSchedule {
    pub quiet_hours: QuietHours,
    pub skip_hours: BTreeSet<u8>,
}

/// Root of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub repos: Vec<RepositoryDescriptor>,
    #[serde(default)]
    pub global: GlobalSchedule,
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a single repository sync attempt, as persisted to `last-sync.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub repo: PathBuf,
    pub branch: String,
    pub remote: String,
    pub status: SyncStatus,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl SyncOutcome {
    pub fn new(repo: &RepositoryDescriptor, status: SyncStatus, message: impl Into<String>) -> Self {
        Self {
            repo: repo.path.clone(),
            branch: repo.branch.clone(),
            remote: repo.remote.clone(),
            status,
            message: message.into(),
            timestamp: Local::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == SyncStatus::Success
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

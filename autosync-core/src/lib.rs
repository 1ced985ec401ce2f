//! git-autosync core library: domain types, config loading, sync journal, errors.
//!
//! Public API surface:
//! - [`types`]: repository descriptors, schedule, sync outcomes
//! - [`config`]: load / validate `config.json`
//! - [`journal`]: the append-only `git-sync.log` stream
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod journal;
pub mod types;

pub use error::ConfigError;
pub use journal::{LogEntry, LogLevel, SyncJournal};
pub use types::{
    Config, GlobalSchedule, MergeStrategy, QuietHours, RepositoryDescriptor, SyncOutcome,
    SyncStatus,
};

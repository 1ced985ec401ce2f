use std::path::PathBuf;

use thiserror::Error;

/// Failures that abort a whole run rather than a single repository.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("another sync is running (PID: {pid})")]
    LockHeld { pid: u32 },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(#[from] autosync_core::ConfigError),

    #[error("repository not found in configuration: {}", path.display())]
    RepositoryNotConfigured { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.into(),
        source,
    }
}

use std::path::{Path, PathBuf};

pub const STATE_DIR_NAME: &str = "git-auto-sync";

pub const LOG_FILE: &str = "git-sync.log";
pub const STATUS_FILE: &str = "last-sync.json";
pub const LOCK_FILE: &str = "lock.pid";

/// `<temp_dir>/git-auto-sync`, shared by every invocation on the host.
pub fn default_state_dir() -> PathBuf {
    std::env::temp_dir().join(STATE_DIR_NAME)
}

pub fn log_path_at(state_dir: &Path) -> PathBuf {
    state_dir.join(LOG_FILE)
}

pub fn status_path_at(state_dir: &Path) -> PathBuf {
    state_dir.join(STATUS_FILE)
}

pub fn lock_path_at(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE)
}

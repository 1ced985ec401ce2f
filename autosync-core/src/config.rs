//! `config.json` loading and validation.
//!
//! # Storage layout
//!
//! ```text
//! <config_dir>/git-autosync/
//!   config.json     ({"repos": [...], "global": {...}})
//! ```
//!
//! # API pattern
//!
//! - `load_at(path)`: explicit path; the CLI resolves it with `default_config_path`
//!   unless `--config` is given, tests pass a `TempDir` path
//!
//! A missing file is not an error: it yields an empty repository list and the
//! default schedule.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::Config;

pub const CONFIG_DIR_NAME: &str = "git-autosync";
pub const CONFIG_FILE_NAME: &str = "config.json";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<config_dir>/git-autosync/config.json`: pure, no I/O.
pub fn config_path_at(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// `config_path_at` using the platform config directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(config_path_at(&dir))
}

/// Expand a leading `~/` against the home directory. Other paths pass through.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `Config::default()` if the file is absent,
/// `ConfigError::Parse` (with path + line context) if malformed JSON, and
/// `ConfigError::Invalid` if a skip hour is out of range or paths repeat.
pub fn load_at(path: &Path) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut config: Config =
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    for repo in &mut config.repos {
        repo.path = expand_home(&repo.path);
    }

    validate(&config).map_err(|reason| ConfigError::Invalid {
        path: path.to_path_buf(),
        reason,
    })?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// 3. Validation
// ---------------------------------------------------------------------------

// Quiet-hour bounds are not range-checked: `start = 24, end = 0` is how a
// config turns quiet hours off.
fn validate(config: &Config) -> Result<(), String> {
    if let Some(hour) = config.global.skip_hours.iter().find(|h| **h > 23) {
        return Err(format!("skipHours must contain hours between 0 and 23, got {hour}"));
    }

    let mut seen = HashSet::new();
    for repo in &config.repos {
        if repo.path.as_os_str().is_empty() {
            return Err("repository path must not be empty".to_owned());
        }
        if !seen.insert(repo.path.as_path()) {
            return Err(format!("repository listed twice: {}", repo.path.display()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn config_path_is_correct() {
        let dir = TempDir::new().expect("tempdir");
        let path = config_path_at(dir.path());
        assert!(path.ends_with("git-autosync/config.json"));
    }

    #[test]
    fn missing_file_yields_empty_config() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_at(&dir.path().join("absent.json")).expect("load");
        assert!(config.repos.is_empty());
        assert_eq!(config.global.quiet_hours.start, 22);
        assert_eq!(config.global.quiet_hours.end, 9);
        assert!(config.global.skip_hours.is_empty());
    }

    #[test]
    fn out_of_range_hour_is_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(&dir, r#"{"global": {"skipHours": [12, 24]}}"#);
        let err = load_at(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }), "got: {err}");
        assert!(err.to_string().contains("skipHours"));
    }

    #[test]
    fn duplicate_paths_are_invalid() {
        let dir = TempDir::new().expect("tempdir");
        let path = write_config(
            &dir,
            r#"{"repos": [{"path": "/code/a"}, {"path": "/code/a", "branch": "dev"}]}"#,
        );
        let err = load_at(&path).unwrap_err();
        assert!(err.to_string().contains("listed twice"), "got: {err}");
    }

    #[test]
    fn tilde_paths_expand_to_home() {
        let Some(home) = dirs::home_dir() else { return };
        assert_eq!(expand_home(Path::new("~/notes")), home.join("notes"));
        assert_eq!(expand_home(Path::new("/abs/notes")), PathBuf::from("/abs/notes"));
    }
}

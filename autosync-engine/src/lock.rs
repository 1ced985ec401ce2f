//! Single-instance PID lock (`lock.pid`).
//!
//! The record holds the decimal PID of the process that owns the run. A
//! record naming a dead process, or one that does not parse, is stale and is
//! replaced. The returned [`LockGuard`] deletes the record when dropped, so
//! every exit path of a run releases the lock.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::{io_err, EngineError};

/// Answers whether a process id still refers to a running process.
pub trait ProcessProbe {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probes the host with a null signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl ProcessProbe for SystemProbe {
    #[cfg(unix)]
    fn is_alive(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        // 0 and negative values address process groups, not a process.
        let raw = match i32::try_from(pid) {
            Ok(raw) if raw > 0 => raw,
            _ => return false,
        };
        matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
    }

    #[cfg(not(unix))]
    fn is_alive(&self, _pid: u32) -> bool {
        false
    }
}

enum LockRecord {
    Absent,
    Pid(u32),
    Garbled(String),
}

/// The lock file plus the probe used to judge whether its owner is alive.
pub struct ProcessLock<'p> {
    path: PathBuf,
    probe: &'p dyn ProcessProbe,
}

impl<'p> ProcessLock<'p> {
    pub fn new(path: impl Into<PathBuf>, probe: &'p dyn ProcessProbe) -> Self {
        Self {
            path: path.into(),
            probe,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Claim the lock for the current process.
    ///
    /// Fails with [`EngineError::LockHeld`] when the record names a live
    /// process. Stale records are removed first.
    pub fn acquire(&self) -> Result<LockGuard, EngineError> {
        match self.read_record()? {
            LockRecord::Absent => {}
            LockRecord::Pid(pid) if self.probe.is_alive(pid) => {
                return Err(EngineError::LockHeld { pid });
            }
            LockRecord::Pid(pid) => {
                tracing::info!(pid, path = %self.path.display(), "removing stale lock record");
                remove_record(&self.path)?;
            }
            LockRecord::Garbled(contents) => {
                tracing::warn!(
                    contents = %contents,
                    path = %self.path.display(),
                    "removing unreadable lock record",
                );
                remove_record(&self.path)?;
            }
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(file) => file,
            // Another instance won the race between our check and create.
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                let pid = match self.read_record()? {
                    LockRecord::Pid(pid) => pid,
                    _ => 0,
                };
                return Err(EngineError::LockHeld { pid });
            }
            Err(err) => return Err(io_err(&self.path, err)),
        };
        write!(file, "{}", std::process::id()).map_err(|e| io_err(&self.path, e))?;

        Ok(LockGuard {
            path: self.path.clone(),
            armed: true,
        })
    }

    /// Delete the record if present. Safe to call any number of times.
    pub fn release(&self) -> Result<(), EngineError> {
        remove_record(&self.path)
    }

    fn read_record(&self) -> Result<LockRecord, EngineError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LockRecord::Absent),
            Err(err) => return Err(io_err(&self.path, err)),
        };
        Ok(match contents.trim().parse::<u32>() {
            Ok(pid) => LockRecord::Pid(pid),
            Err(_) => LockRecord::Garbled(contents.trim().to_owned()),
        })
    }
}

/// Held lock. Dropping it deletes the record unless `release` already did.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    armed: bool,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release now and surface any I/O failure; otherwise `Drop` does it silently.
    pub fn release(mut self) -> Result<(), EngineError> {
        self.armed = false;
        remove_record(&self.path)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = remove_record(&self.path) {
            tracing::warn!(error = %err, "failed to remove lock record");
        }
    }
}

fn remove_record(path: &Path) -> Result<(), EngineError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(path, err)),
    }
}

//! Append-only sync journal (`git-sync.log`).
//!
//! Every entry is one line of the form `<timestamp> | <LEVEL> | <message>`.
//! Entries are never rewritten. A journal constructed with `echo = true`
//! (interactive head mode) also prints `[<timestamp>] <LEVEL>: <message>`
//! to stdout.
//!
//! Write failures are reported through `tracing` and otherwise ignored; a
//! broken log file must not abort a sync.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Severity tag written into each journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Error,
    Success,
    Warning,
    Skip,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Success => write!(f, "SUCCESS"),
            LogLevel::Warning => write!(f, "WARNING"),
            LogLevel::Skip => write!(f, "SKIP"),
        }
    }
}

/// A single journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }

    /// The line appended to the log file (without trailing newline).
    pub fn to_line(&self) -> String {
        format!(
            "{} | {} | {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.message
        )
    }

    /// The line echoed to stdout in head mode.
    pub fn to_console(&self) -> String {
        format!(
            "[{}] {}: {}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.level,
            self.message
        )
    }
}

/// Handle on the journal file. Cheap to construct; opens the file per entry.
#[derive(Debug, Clone)]
pub struct SyncJournal {
    path: PathBuf,
    echo: bool,
}

impl SyncJournal {
    pub fn new(path: impl Into<PathBuf>, echo: bool) -> Self {
        Self {
            path: path.into(),
            echo,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry, creating the parent directory if needed.
    pub fn record(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::new(level, message);
        if let Err(err) = self.append(&entry) {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to append sync journal entry",
            );
        }
        if self.echo {
            println!("{}", entry.to_console());
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(LogLevel::Info, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(LogLevel::Error, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.record(LogLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.record(LogLevel::Warning, message);
    }

    pub fn skip(&self, message: impl Into<String>) {
        self.record(LogLevel::Skip, message);
    }

    fn append(&self, entry: &LogEntry) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry.to_line())
    }
}

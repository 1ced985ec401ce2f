//! `git-autosync status`: the last persisted sync outcome.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use colored::Colorize;

use autosync_core::{SyncOutcome, SyncStatus};
use autosync_engine::paths::status_path_at;
use autosync_sync::StatusRecorder;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit the raw status record as JSON (`null` if nothing was recorded).
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, state_dir: &Path) -> Result<()> {
        let recorder = StatusRecorder::new(status_path_at(state_dir));
        let outcome = recorder
            .load()
            .with_context(|| format!("failed to read {}", recorder.path().display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }

        match outcome {
            Some(outcome) => print_outcome(&outcome, Local::now()),
            None => println!("no sync recorded yet"),
        }
        Ok(())
    }
}

fn print_outcome(outcome: &SyncOutcome, now: DateTime<Local>) {
    let badge = match outcome.status {
        SyncStatus::Success => "✓ success".green().bold(),
        SyncStatus::Failed => "✗ failed".red().bold(),
    };
    println!("{badge}  {}", outcome.repo.display());
    println!("  branch:  {} ({})", outcome.branch, outcome.remote);
    println!("  message: {}", outcome.message);
    println!(
        "  at:      {} ({})",
        outcome.timestamp.format("%Y-%m-%d %H:%M:%S"),
        format_age(outcome.timestamp, now).dimmed()
    );
}

fn format_age(then: DateTime<Local>, now: DateTime<Local>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}

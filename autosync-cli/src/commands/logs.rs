//! `git-autosync logs`: tail of `git-sync.log`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use autosync_engine::paths::log_path_at;

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, short = 'n', default_value_t = 50)]
    pub lines: usize,
}

impl LogsArgs {
    pub fn run(self, state_dir: &Path) -> Result<()> {
        let path = log_path_at(state_dir);
        if !path.exists() {
            println!("log file not found: {}", path.display());
            return Ok(());
        }
        for line in tail(&path, self.lines)? {
            println!("{line}");
        }
        Ok(())
    }
}

fn tail(path: &Path, lines: usize) -> Result<VecDeque<String>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut tail = VecDeque::<String>::with_capacity(lines);
    if lines == 0 {
        return Ok(tail);
    }
    for line in reader.lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Ok(tail)
}

//! Time-of-day gate for unattended runs.

use std::fmt;

use autosync_core::GlobalSchedule;

/// How the run was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Interactive: journal lines are echoed and the schedule is ignored.
    Head,
    /// Unattended (scheduler-launched).
    #[default]
    Headless,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Head => "head",
            RunMode::Headless => "headless",
        }
    }

    pub fn echoes_journal(self) -> bool {
        self == RunMode::Head
    }

    /// Only unattended, non-forced runs consult the schedule.
    pub fn gate_applies(self, force: bool) -> bool {
        self == RunMode::Headless && !force
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a run was skipped; carries the current hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    QuietHours(u8),
    SkipHour(u8),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::QuietHours(hour) => write!(f, "Quiet hours ({hour}:00) - skipping"),
            SkipReason::SkipHour(hour) => write!(f, "Skip hour ({hour}:00) - skipping"),
        }
    }
}

/// Whether a run at `hour` falls inside the schedule's blocked time.
///
/// Quiet hours block `hour >= start || hour < end`. That covers an overnight
/// window such as 22..9; with `start <= end` the same test is applied as is,
/// so `start = 9, end = 17` blocks every hour and `start = 24, end = 0` none.
pub fn should_skip(hour: u8, schedule: &GlobalSchedule) -> Option<SkipReason> {
    let quiet = &schedule.quiet_hours;
    if hour >= quiet.start || hour < quiet.end {
        return Some(SkipReason::QuietHours(hour));
    }
    if schedule.skip_hours.contains(&hour) {
        return Some(SkipReason::SkipHour(hour));
    }
    None
}

use chrono::{DateTime, Local, Timelike};

/// Source of the wall-clock time the schedule gate is evaluated against.
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn hour(&self) -> u8 {
        // `hour()` is always 0..=23.
        self.now().hour() as u8
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl FixedClock {
    /// Today at `hour:00` local time, or `None` if that hour does not exist locally (DST gap).
    pub fn at_hour(hour: u32) -> Option<Self> {
        let today = Local::now().date_naive();
        let naive = today.and_hms_opt(hour, 0, 0)?;
        naive.and_local_timezone(Local).earliest().map(FixedClock)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

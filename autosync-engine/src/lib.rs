//! Run orchestration: process lock, schedule gate, and the batch loop.

pub mod clock;
mod engine;
mod error;
pub mod lock;
pub mod logging;
pub mod paths;
pub mod schedule;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{Engine, RunReport, RunRequest};
pub use error::EngineError;
pub use lock::{LockGuard, ProcessLock, ProcessProbe, SystemProbe};
pub use schedule::{should_skip, RunMode, SkipReason};

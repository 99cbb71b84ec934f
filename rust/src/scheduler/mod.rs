//! Greedy day-by-day scheduler over work blocks.
//!
//! Items are ranked by composite priority and placed into block capacity one
//! segment at a time; an item may be split across blocks and days.

mod block_schedule;
mod core;
mod decision;
mod diagnostics;
mod ready;
mod state;

pub use block_schedule::BlockSchedule;
pub use self::core::Scheduler;
pub use decision::SchedulingDecision;
pub use diagnostics::{BlockUtilization, DebugInfo, ScheduleMetrics, ScheduleResult};
pub use ready::ReadyQueue;
pub use state::{ItemSource, PoolEntry, RunState};

//! Configuration types for a scheduling run.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::ProductivityWindow;

/// Options for one call to `schedule`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleOptions {
    /// First day of the planning horizon.
    pub start_date: NaiveDate,
    /// Last day of the horizon. Defaults to the last dated pattern.
    pub end_date: Option<NaiveDate>,
    /// Nothing is placed before this instant.
    pub current_time: NaiveDateTime,
    /// Keep placements clear of meetings.
    pub respect_meetings: bool,
    /// Allow one item to be spread over several blocks or days.
    pub allow_task_splitting: bool,
    pub include_weekends: bool,
    /// Attach metrics and the decision trace to the result.
    pub debug_mode: bool,
    pub preferences: SchedulingPreferences,
    /// Time-of-day cognitive capacity. Empty means moderate all day.
    pub productivity_pattern: Vec<ProductivityWindow>,
}

impl ScheduleOptions {
    /// Options for a horizon starting at `current_time`'s date.
    pub fn starting_at(current_time: NaiveDateTime) -> Self {
        Self {
            start_date: current_time.date(),
            current_time,
            ..Self::default()
        }
    }
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        let current_time = NaiveDateTime::default();
        Self {
            start_date: current_time.date(),
            end_date: None,
            current_time,
            respect_meetings: true,
            allow_task_splitting: true,
            include_weekends: false,
            debug_mode: false,
            preferences: SchedulingPreferences::default(),
            productivity_pattern: Vec::new(),
        }
    }
}

/// User-level tuning of the priority calculation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingPreferences {
    /// Subtracted from an item's priority when it belongs to a different
    /// workflow or project than the previously placed item.
    pub context_switch_penalty: f64,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
}

impl Default for SchedulingPreferences {
    fn default() -> Self {
        Self {
            context_switch_penalty: 5.0,
            verbosity: 0,
        }
    }
}

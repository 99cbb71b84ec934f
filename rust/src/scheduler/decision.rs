//! Placement trace for explainability.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::priority::PriorityBreakdown;

/// Record of one placement decision, kept when `debug_mode` is on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulingDecision {
    /// Item that was placed
    pub item_id: String,
    /// Block the segment went into
    pub block_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
    /// Priority total at the moment of selection
    pub priority: f64,
    pub breakdown: PriorityBreakdown,
    /// Higher-ranked candidates that had no room anywhere in the day
    pub passed_over: Vec<String>,
    /// Lower-ranked ready candidates this item won against
    pub candidates_beaten: usize,
}

//! Run diagnostics: per-block utilisation, efficiency and debug metrics.
//!
//! | Figure | Definition |
//! |--------|-----------|
//! | schedule_efficiency | scheduled minutes / total capacity minutes |
//! | block utilisation | used / capacity, per block |
//! | utilization_rate | mean block utilisation over blocks with capacity |
//! | average_priority | mean priority of placed segments |
//! | missed_deadlines | items whose last segment ends after their deadline |

use chrono::{NaiveDate, NaiveDateTime};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{ScheduledItem, UnscheduledItem};

use super::block_schedule::BlockSchedule;
use super::decision::SchedulingDecision;

/// Capacity and use of one block in the horizon.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockUtilization {
    pub block_id: String,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub capacity: BTreeMap<String, i64>,
    pub used: BTreeMap<String, i64>,
    /// 0.0..=1.0
    pub utilization: f64,
}

impl BlockUtilization {
    pub fn from_block(block: &BlockSchedule) -> Self {
        Self {
            block_id: block.block_id.clone(),
            date: block.date,
            start: block.start,
            end: block.end,
            capacity: block.capacity_by_type(),
            used: block.used_by_type(),
            utilization: block.utilization(),
        }
    }
}

/// Always-present summary of a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// Distinct items with at least one placed segment. Steps are told apart by workflow.
    pub total_scheduled: usize,
    pub total_unscheduled: usize,
    pub scheduled_minutes: i64,
    pub total_capacity_minutes: i64,
    pub schedule_efficiency: f64,
    pub block_utilization: Vec<BlockUtilization>,
    pub warnings: Vec<String>,
}

impl DebugInfo {
    pub fn calculate(
        scheduled: &[ScheduledItem],
        unscheduled: &[UnscheduledItem],
        blocks: &[BlockSchedule],
        warnings: Vec<String>,
    ) -> Self {
        let total_scheduled = scheduled
            .iter()
            .map(|item| (item.workflow_id.as_deref(), item.id.as_str()))
            .collect::<FxHashSet<_>>()
            .len();
        let scheduled_minutes: i64 = scheduled.iter().map(|item| item.duration_minutes).sum();
        let total_capacity_minutes: i64 = blocks.iter().map(BlockSchedule::total_capacity).sum();
        let schedule_efficiency = if total_capacity_minutes > 0 {
            scheduled_minutes as f64 / total_capacity_minutes as f64
        } else {
            0.0
        };

        Self {
            total_scheduled,
            total_unscheduled: unscheduled.len(),
            scheduled_minutes,
            total_capacity_minutes,
            schedule_efficiency,
            block_utilization: blocks.iter().map(BlockUtilization::from_block).collect(),
            warnings,
        }
    }
}

/// Extra figures attached in debug mode.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleMetrics {
    pub average_priority: f64,
    pub utilization_rate: f64,
    pub missed_deadlines: Vec<String>,
    pub decisions: Vec<SchedulingDecision>,
}

impl ScheduleMetrics {
    /// `deadlines` pairs item ids with their effective deadline.
    pub fn calculate<'a>(
        scheduled: &[ScheduledItem],
        blocks: &[BlockSchedule],
        deadlines: impl IntoIterator<Item = (&'a str, NaiveDateTime)>,
        decisions: Vec<SchedulingDecision>,
    ) -> Self {
        let average_priority = if scheduled.is_empty() {
            0.0
        } else {
            scheduled.iter().map(|item| item.priority).sum::<f64>() / scheduled.len() as f64
        };

        let with_capacity: Vec<f64> = blocks
            .iter()
            .filter(|block| block.total_capacity() > 0)
            .map(BlockSchedule::utilization)
            .collect();
        let utilization_rate = if with_capacity.is_empty() {
            0.0
        } else {
            with_capacity.iter().sum::<f64>() / with_capacity.len() as f64
        };

        let mut last_end: BTreeMap<&str, NaiveDateTime> = BTreeMap::new();
        for item in scheduled {
            let end = last_end.entry(item.id.as_str()).or_insert(item.end);
            *end = (*end).max(item.end);
        }
        let missed_deadlines = deadlines
            .into_iter()
            .filter(|(id, deadline)| last_end.get(id).is_some_and(|end| end > deadline))
            .map(|(id, _)| id.to_string())
            .collect();

        Self {
            average_priority,
            utilization_rate,
            missed_deadlines,
            decisions,
        }
    }
}

/// Output of `schedule`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleResult {
    pub scheduled: Vec<ScheduledItem>,
    pub unscheduled: Vec<UnscheduledItem>,
    pub debug_info: DebugInfo,
    /// Present in debug mode.
    pub metrics: Option<ScheduleMetrics>,
}

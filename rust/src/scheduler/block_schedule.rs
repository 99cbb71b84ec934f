//! Per-block tracking of busy intervals and remaining capacity.

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use crate::capacity::{capacity_for_minutes, CapacityAnomaly, CapacityMap};
use crate::models::BlockType;

/// One work block placed on a concrete date.
///
/// Busy periods are half-open `[start, end)` intervals clipped to the block.
/// Invariant: sorted by start, non-overlapping, non-touching.
#[derive(Clone, Debug)]
pub struct BlockSchedule {
    pub block_id: String,
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub block_type: BlockType,
    pub busy_periods: Vec<(NaiveDateTime, NaiveDateTime)>,
    capacity: CapacityMap,
    remaining: CapacityMap,
}

impl BlockSchedule {
    pub fn new(
        block_id: impl Into<String>,
        date: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
        block_type: BlockType,
    ) -> Self {
        Self {
            block_id: block_id.into(),
            date,
            start,
            end: end.max(start),
            block_type,
            busy_periods: Vec::new(),
            capacity: CapacityMap::default(),
            remaining: CapacityMap::default(),
        }
    }

    /// Wall-clock length of the block.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    pub fn busy_minutes(&self) -> i64 {
        self.busy_periods
            .iter()
            .map(|(start, end)| (*end - *start).num_minutes())
            .sum()
    }

    pub fn free_minutes(&self) -> i64 {
        self.duration_minutes() - self.busy_minutes()
    }

    /// Derive per-type capacity from the minutes not covered by busy periods.
    ///
    /// Call once, after meetings are added and before anything is placed.
    pub fn compute_capacity(&mut self) -> Vec<CapacityAnomaly> {
        let report = capacity_for_minutes(&self.block_type, self.free_minutes());
        self.remaining = report.capacity.clone();
        self.capacity = report.capacity;
        report.anomalies
    }

    /// Mark `[start, end)` busy, merging with any period it overlaps or touches.
    pub fn add_busy_period(&mut self, start: NaiveDateTime, end: NaiveDateTime) {
        let start = start.max(self.start);
        let end = end.min(self.end);
        if start >= end {
            return;
        }

        let idx = self.busy_periods.partition_point(|(s, _)| *s < start);

        let mut new_start = start;
        let mut new_end = end;
        let mut merge_start = idx;
        let mut merge_end = idx;

        if idx > 0 {
            let (prev_start, prev_end) = self.busy_periods[idx - 1];
            if prev_end >= start {
                new_start = prev_start;
                new_end = new_end.max(prev_end);
                merge_start = idx - 1;
            }
        }

        while merge_end < self.busy_periods.len() {
            let (next_start, next_end) = self.busy_periods[merge_end];
            if next_start <= new_end {
                new_end = new_end.max(next_end);
                merge_end += 1;
            } else {
                break;
            }
        }

        self.busy_periods.drain(merge_start..merge_end);
        self.busy_periods.insert(merge_start, (new_start, new_end));
    }

    /// First free instant at or after `from`, or `None` if the block has none left.
    pub fn next_available_time(&self, from: NaiveDateTime) -> Option<NaiveDateTime> {
        let mut candidate = from.max(self.start);

        loop {
            if candidate >= self.end {
                return None;
            }
            match self.find_next_busy_period(candidate) {
                None => return Some(candidate),
                Some((busy_start, busy_end)) => {
                    if candidate < busy_start {
                        return Some(candidate);
                    }
                    candidate = busy_end;
                }
            }
        }
    }

    /// End of the free stretch that contains the free instant `at`.
    pub fn free_until(&self, at: NaiveDateTime) -> NaiveDateTime {
        match self.find_next_busy_period(at) {
            Some((busy_start, _)) if busy_start > at => busy_start.min(self.end),
            _ => self.end,
        }
    }

    /// Start of the first free stretch at or after `from` that is at least `minutes` long.
    pub fn find_gap(&self, from: NaiveDateTime, minutes: i64) -> Option<NaiveDateTime> {
        let mut candidate = self.next_available_time(from)?;
        loop {
            let free_until = self.free_until(candidate);
            if (free_until - candidate).num_minutes() >= minutes {
                return Some(candidate);
            }
            candidate = self.next_available_time(free_until)?;
        }
    }

    /// Leftmost busy period ending after `current`.
    fn find_next_busy_period(&self, current: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let idx = self.busy_periods.partition_point(|(_, end)| *end <= current);
        self.busy_periods.get(idx).copied()
    }

    pub fn capacity_for(&self, work_type: &str) -> i64 {
        self.capacity.get(work_type).copied().unwrap_or(0)
    }

    pub fn remaining_for(&self, work_type: &str) -> i64 {
        self.remaining.get(work_type).copied().unwrap_or(0)
    }

    /// Take `minutes` of `work_type` capacity. Never goes below zero.
    pub fn consume(&mut self, work_type: &str, minutes: i64) {
        if let Some(left) = self.remaining.get_mut(work_type) {
            *left = (*left - minutes.max(0)).max(0);
        }
    }

    pub fn total_capacity(&self) -> i64 {
        self.capacity.values().sum()
    }

    pub fn total_used(&self) -> i64 {
        self.capacity
            .iter()
            .map(|(work_type, cap)| cap - self.remaining_for(work_type))
            .sum()
    }

    /// Used fraction of the block's capacity, 0 for blocks without capacity.
    pub fn utilization(&self) -> f64 {
        let total = self.total_capacity();
        if total == 0 {
            0.0
        } else {
            self.total_used() as f64 / total as f64
        }
    }

    pub fn capacity_by_type(&self) -> BTreeMap<String, i64> {
        self.capacity
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    pub fn used_by_type(&self) -> BTreeMap<String, i64> {
        self.capacity
            .iter()
            .map(|(k, cap)| (k.clone(), cap - self.remaining_for(k)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn make_block(start: NaiveDateTime, end: NaiveDateTime) -> BlockSchedule {
        BlockSchedule::new("b1", start.date(), start, end, BlockType::single("focused"))
    }

    #[test]
    fn test_empty_block() {
        let block = make_block(t(9, 0), t(11, 0));
        assert_eq!(block.next_available_time(t(8, 0)), Some(t(9, 0)));
        assert_eq!(block.next_available_time(t(10, 0)), Some(t(10, 0)));
        assert_eq!(block.next_available_time(t(11, 0)), None);
        assert_eq!(block.free_until(t(9, 30)), t(11, 0));
    }

    #[test]
    fn test_next_available_skips_busy() {
        let mut block = make_block(t(9, 0), t(12, 0));
        block.add_busy_period(t(9, 0), t(9, 30));
        block.add_busy_period(t(10, 0), t(12, 0));
        assert_eq!(block.next_available_time(t(9, 0)), Some(t(9, 30)));
        assert_eq!(block.free_until(t(9, 30)), t(10, 0));
        assert_eq!(block.next_available_time(t(10, 15)), None);
    }

    #[test]
    fn test_add_busy_period_merges_touching() {
        let mut block = make_block(t(9, 0), t(12, 0));
        block.add_busy_period(t(9, 0), t(9, 30));
        block.add_busy_period(t(9, 30), t(10, 0));
        assert_eq!(block.busy_periods, vec![(t(9, 0), t(10, 0))]);
    }

    #[test]
    fn test_add_busy_period_merges_overlap_and_clips() {
        let mut block = make_block(t(9, 0), t(12, 0));
        block.add_busy_period(t(10, 0), t(10, 30));
        block.add_busy_period(t(11, 0), t(11, 30));
        block.add_busy_period(t(10, 15), t(11, 15));
        block.add_busy_period(t(11, 45), t(13, 0));
        assert_eq!(
            block.busy_periods,
            vec![(t(10, 0), t(11, 30)), (t(11, 45), t(12, 0))]
        );
        // Entirely outside the block
        block.add_busy_period(t(7, 0), t(8, 0));
        assert_eq!(block.busy_periods.len(), 2);
    }

    #[test]
    fn test_find_gap() {
        let mut block = make_block(t(9, 0), t(12, 0));
        block.add_busy_period(t(9, 30), t(10, 0));
        block.add_busy_period(t(10, 40), t(11, 0));
        assert_eq!(block.find_gap(t(9, 0), 30), Some(t(9, 0)));
        assert_eq!(block.find_gap(t(9, 0), 45), Some(t(11, 0)));
        assert_eq!(block.find_gap(t(9, 0), 61), None);
    }

    #[test]
    fn test_capacity_excludes_busy_minutes() {
        let mut block = BlockSchedule::new(
            "b1",
            t(9, 0).date(),
            t(9, 0),
            t(12, 0),
            BlockType::combo([("focused", 0.5), ("admin", 0.5)]),
        );
        block.add_busy_period(t(10, 0), t(11, 0));
        assert!(block.compute_capacity().is_empty());
        assert_eq!(block.capacity_for("focused"), 60);
        assert_eq!(block.capacity_for("admin"), 60);

        block.consume("focused", 45);
        block.consume("admin", 500);
        assert_eq!(block.remaining_for("focused"), 15);
        assert_eq!(block.remaining_for("admin"), 0);
        assert_eq!(block.total_used(), 105);
        assert!((block.utilization() - 105.0 / 120.0).abs() < 1e-9);
        assert_eq!(block.used_by_type().get("admin"), Some(&60));
    }

    #[test]
    fn test_unknown_type_has_no_capacity() {
        let mut block = make_block(t(9, 0), t(10, 0));
        block.compute_capacity();
        assert_eq!(block.remaining_for("admin"), 0);
        block.consume("admin", 10);
        assert_eq!(block.total_used(), 0);
    }
}

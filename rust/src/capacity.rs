//! Per-work-type capacity of a work block.

use rustc_hash::FxHashMap;

use crate::models::BlockType;
use crate::time::duration_between;

/// Minutes available per work type.
pub type CapacityMap = FxHashMap<String, i64>;

/// Ratios are considered to sum to 1.0 within this tolerance.
const RATIO_TOLERANCE: f64 = 0.01;

/// Absorbs float error so 0.7 * 180 floors to 126, not 125.
const FLOOR_EPSILON: f64 = 1e-9;

/// Problems found while computing a block's capacity.
///
/// None of these stop the computation; the scheduler turns them into warnings.
#[derive(Clone, Debug, PartialEq)]
pub enum CapacityAnomaly {
    /// Combo ratios did not sum to 1.0 and were rescaled.
    RatioSum(f64),
    /// A combo entry had no work type and was dropped.
    EmptyWorkType,
    /// A combo entry had a negative or non-finite ratio and was dropped.
    InvalidRatio(f64),
}

impl std::fmt::Display for CapacityAnomaly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RatioSum(sum) => write!(f, "combo ratios sum to {sum:.3}, rescaled to 1.0"),
            Self::EmptyWorkType => write!(f, "combo entry without a work type ignored"),
            Self::InvalidRatio(r) => write!(f, "combo entry with ratio {r} ignored"),
        }
    }
}

/// Capacity of a block together with any anomalies found on the way.
#[derive(Clone, Debug, Default)]
pub struct CapacityReport {
    pub capacity: CapacityMap,
    pub anomalies: Vec<CapacityAnomaly>,
}

impl CapacityReport {
    pub fn total(&self) -> i64 {
        self.capacity.values().sum()
    }
}

/// Capacity of a block running from `start` to `end` ("HH:MM").
///
/// Unreadable times count as 00:00. System blocks yield an empty map.
pub fn capacity_of(block_type: &BlockType, start: &str, end: &str) -> CapacityMap {
    capacity_for_minutes(block_type, duration_between(start, end)).capacity
}

/// Split `minutes` between the work types of `block_type`.
///
/// Combo splits are floored and the leftover minutes go to the entry with the
/// largest ratio (the earliest such entry on ties), so the values always add up
/// to `minutes`.
pub fn capacity_for_minutes(block_type: &BlockType, minutes: i64) -> CapacityReport {
    let minutes = minutes.max(0);
    let mut report = CapacityReport::default();

    match block_type {
        BlockType::System { .. } => {}
        BlockType::Single { work_type } => {
            if work_type.is_empty() {
                report.anomalies.push(CapacityAnomaly::EmptyWorkType);
            } else {
                report.capacity.insert(work_type.clone(), minutes);
            }
        }
        BlockType::Combo { splits } => {
            let mut entries: Vec<(&str, f64)> = Vec::with_capacity(splits.len());
            for split in splits {
                if split.work_type.is_empty() {
                    report.anomalies.push(CapacityAnomaly::EmptyWorkType);
                    continue;
                }
                if !split.ratio.is_finite() || split.ratio < 0.0 {
                    report.anomalies.push(CapacityAnomaly::InvalidRatio(split.ratio));
                    continue;
                }
                entries.push((split.work_type.as_str(), split.ratio));
            }

            let ratio_sum: f64 = entries.iter().map(|(_, r)| r).sum();
            if ratio_sum <= 0.0 {
                if !entries.is_empty() {
                    report.anomalies.push(CapacityAnomaly::RatioSum(ratio_sum));
                }
                return report;
            }
            if (ratio_sum - 1.0).abs() > RATIO_TOLERANCE {
                report.anomalies.push(CapacityAnomaly::RatioSum(ratio_sum));
            }

            let mut assigned = 0;
            let mut largest: Option<(usize, f64)> = None;
            let mut shares: Vec<i64> = Vec::with_capacity(entries.len());
            for (idx, (_, ratio)) in entries.iter().enumerate() {
                let normalized = ratio / ratio_sum;
                let share = (minutes as f64 * normalized + FLOOR_EPSILON).floor() as i64;
                shares.push(share);
                assigned += share;
                if largest.map_or(true, |(_, best)| normalized > best) {
                    largest = Some((idx, normalized));
                }
            }
            if let Some((idx, _)) = largest {
                shares[idx] += minutes - assigned;
            }

            for ((work_type, _), share) in entries.into_iter().zip(shares) {
                *report.capacity.entry(work_type.to_string()).or_insert(0) += share;
            }
        }
    }

    report
}

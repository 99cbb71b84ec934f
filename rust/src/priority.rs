//! Composite priority scoring for tasks and workflow steps.
//!
//! The score is a sum: an Eisenhower base (importance x urgency with
//! multipliers), a deadline boost, an async-wait bonus scaled by cognitive
//! match, a context-switch penalty and a workflow-depth bonus. An overdue hard
//! deadline alone adds 1000.
//!
//! Ordering: higher total first, then lower id.

use chrono::NaiveDateTime;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::config::SchedulingPreferences;
use crate::dependency::critical_path;
use crate::models::{
    CognitiveLevel, DeadlineType, ProductivityWindow, Step, Task, Workflow,
    DEFAULT_COGNITIVE_COMPLEXITY, DEFAULT_LEVEL,
};
use crate::time::{minute_of_day, try_parse_time, TimeParseError, MINUTES_PER_DAY};

/// Cap on the async-wait bonus.
pub const MAX_ASYNC_BONUS: f64 = 50.0;

/// Cap on the workflow-depth bonus.
pub const MAX_WORKFLOW_DEPTH_BONUS: f64 = 50.0;

/// Workflow attributes a step needs for scoring.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowFacts {
    pub importance: i32,
    pub urgency: i32,
    pub deadline: Option<NaiveDateTime>,
    pub deadline_type: DeadlineType,
    pub critical_path_minutes: i64,
}

impl WorkflowFacts {
    pub fn from_workflow(workflow: &Workflow) -> Self {
        Self {
            importance: workflow.task.importance,
            urgency: workflow.task.urgency,
            deadline: workflow.task.deadline,
            deadline_type: workflow.task.deadline_type,
            critical_path_minutes: critical_path(&workflow.steps).duration_minutes,
        }
    }
}

/// The most recently placed item, for the context-switch penalty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastScheduled {
    pub id: String,
    /// Workflow id for steps, project id for tasks.
    pub group: Option<String>,
}

/// A productivity window with its times read into minutes after midnight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParsedWindow {
    pub start: i64,
    pub end: i64,
    pub level: CognitiveLevel,
}

impl ParsedWindow {
    pub fn parse(window: &ProductivityWindow) -> Result<Self, TimeParseError> {
        Ok(Self {
            start: try_parse_time(&window.start_time)?,
            end: try_parse_time(&window.end_time)?.min(MINUTES_PER_DAY),
            level: window.level,
        })
    }

    /// Windows ending before they start wrap past midnight.
    pub fn contains(&self, minute: i64) -> bool {
        if self.start <= self.end {
            self.start <= minute && minute < self.end
        } else {
            minute >= self.start || minute < self.end
        }
    }
}

/// Everything the calculator reads besides the item itself.
#[derive(Clone, Debug, Default)]
pub struct SchedulingContext {
    pub current_time: NaiveDateTime,
    pub workflows: FxHashMap<String, WorkflowFacts>,
    pub productivity_windows: Vec<ParsedWindow>,
    pub last_scheduled: Option<LastScheduled>,
    pub preferences: SchedulingPreferences,
}

impl SchedulingContext {
    pub fn new(current_time: NaiveDateTime, workflows: &[Workflow]) -> Self {
        Self {
            current_time,
            workflows: workflows
                .iter()
                .map(|w| (w.id().to_string(), WorkflowFacts::from_workflow(w)))
                .collect(),
            ..Self::default()
        }
    }

    /// Windows with unreadable times are left out.
    pub fn with_productivity_pattern(mut self, pattern: &[ProductivityWindow]) -> Self {
        self.productivity_windows = pattern
            .iter()
            .filter_map(|window| ParsedWindow::parse(window).ok())
            .collect();
        self
    }

    pub fn with_preferences(mut self, preferences: SchedulingPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Cognitive capacity at `time`: the first matching window wins, moderate otherwise.
    pub fn cognitive_capacity_at(&self, time: NaiveDateTime) -> CognitiveLevel {
        let minute = minute_of_day(time);
        self.productivity_windows
            .iter()
            .find(|window| window.contains(minute))
            .map(|window| window.level)
            .unwrap_or_default()
    }

    /// Penalty for leaving the group of the last placed item. Never negative.
    pub fn context_switch_penalty(&self) -> f64 {
        self.preferences.context_switch_penalty.max(0.0)
    }
}

/// A task or step being scored.
#[derive(Clone, Copy, Debug)]
pub enum PriorityItem<'a> {
    Task(&'a Task),
    Step(&'a Step),
}

impl<'a> PriorityItem<'a> {
    pub fn id(&self) -> &'a str {
        match *self {
            Self::Task(task) => &task.id,
            Self::Step(step) => &step.id,
        }
    }

    /// Workflow id for steps, project id for tasks.
    pub fn group(&self) -> Option<&'a str> {
        match *self {
            Self::Task(task) => task.project_id.as_deref(),
            Self::Step(step) => Some(step.workflow_id.as_str()),
        }
    }

    fn async_wait_minutes(&self) -> i64 {
        match self {
            Self::Task(task) => task.async_wait_minutes,
            Self::Step(step) => step.async_wait_minutes,
        }
        .max(0)
    }

    fn cognitive_complexity(&self) -> i32 {
        match self {
            Self::Task(task) => task.cognitive_complexity,
            Self::Step(step) => step.cognitive_complexity,
        }
        .unwrap_or(DEFAULT_COGNITIVE_COMPLEXITY)
        .clamp(1, 5)
    }
}

/// Named terms behind a priority total.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    /// importance x urgency
    pub eisenhower: f64,
    pub importance_multiplier: f64,
    pub urgency_multiplier: f64,
    pub weighted_eisenhower: f64,
    pub deadline_pressure: f64,
    pub deadline_boost: f64,
    pub async_boost: f64,
    pub cognitive_match_factor: f64,
    /// Display term, `weighted_eisenhower * (factor - 1)`. Not part of the total;
    /// the factor reaches the total through the async boost.
    pub cognitive_match: f64,
    /// Zero or negative.
    pub context_switch_penalty: f64,
    pub workflow_depth_bonus: f64,
}

/// A priority total with its breakdown.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub total: f64,
    pub breakdown: PriorityBreakdown,
}

/// Multiplier for an importance or urgency level: >=9 -> 1.5, >=7 -> 1.2, else 1.0.
pub fn level_multiplier(level: i32) -> f64 {
    if level >= 9 {
        1.5
    } else if level >= 7 {
        1.2
    } else {
        1.0
    }
}

/// Deadline pressure at `now`.
///
/// 1.0 means no pressure. Overdue: hard 10, soft 5. Otherwise a step function of
/// the hours left, steeper for hard deadlines.
pub fn deadline_pressure(
    deadline: Option<NaiveDateTime>,
    deadline_type: DeadlineType,
    now: NaiveDateTime,
) -> f64 {
    let Some(deadline) = deadline else {
        return 1.0;
    };

    let hours_left = (deadline - now).num_seconds() as f64 / 3600.0;
    if hours_left < 0.0 {
        return match deadline_type {
            DeadlineType::Hard => 10.0,
            DeadlineType::Soft => 5.0,
        };
    }

    match deadline_type {
        DeadlineType::Hard => {
            if hours_left <= 4.0 {
                8.0
            } else if hours_left <= 8.0 {
                5.0
            } else if hours_left <= 24.0 {
                3.0
            } else if hours_left <= 48.0 {
                2.0
            } else if hours_left <= 72.0 {
                1.5
            } else {
                1.2
            }
        }
        DeadlineType::Soft => {
            if hours_left <= 8.0 {
                3.0
            } else if hours_left <= 24.0 {
                2.0
            } else if hours_left <= 48.0 {
                1.5
            } else if hours_left <= 72.0 {
                1.2
            } else {
                1.0
            }
        }
    }
}

/// Boost added for deadline pressure; only pressure above 1 counts.
pub fn deadline_boost(pressure: f64) -> f64 {
    if pressure > 1.0 {
        pressure * 100.0
    } else {
        0.0
    }
}

/// 10 points per hour of unattended wait, capped.
pub fn async_urgency_bonus(async_wait_minutes: i64) -> f64 {
    if async_wait_minutes <= 0 {
        return 0.0;
    }
    (async_wait_minutes as f64 / 60.0 * 10.0).min(MAX_ASYNC_BONUS)
}

/// How well an item's complexity fits the capacity available now.
pub fn cognitive_match_factor(capacity: CognitiveLevel, complexity: i32) -> f64 {
    match (capacity.value() - complexity).abs() {
        0 => 1.2,
        1 => 1.0,
        2 => 0.9,
        _ => 0.8,
    }
}

/// 5 points per hour of the owning workflow's critical path, capped.
pub fn workflow_depth_bonus(critical_path_minutes: i64) -> f64 {
    (critical_path_minutes.max(0) as f64 / 60.0 * 5.0).min(MAX_WORKFLOW_DEPTH_BONUS)
}

/// Score `item` in `ctx`.
pub fn priority(item: PriorityItem<'_>, ctx: &SchedulingContext) -> Priority {
    let workflow = match item {
        PriorityItem::Step(step) => ctx.workflows.get(&step.workflow_id),
        PriorityItem::Task(_) => None,
    };

    let (importance, urgency, deadline, deadline_type) = match item {
        PriorityItem::Task(task) => (
            task.importance,
            task.urgency,
            task.deadline,
            task.deadline_type,
        ),
        PriorityItem::Step(step) => (
            step.importance
                .or(workflow.map(|w| w.importance))
                .unwrap_or(DEFAULT_LEVEL),
            step.urgency
                .or(workflow.map(|w| w.urgency))
                .unwrap_or(DEFAULT_LEVEL),
            step.deadline.or(workflow.and_then(|w| w.deadline)),
            step.deadline_type
                .or(workflow.map(|w| w.deadline_type))
                .unwrap_or_default(),
        ),
    };
    let importance = importance.clamp(1, 10);
    let urgency = urgency.clamp(1, 10);

    let eisenhower = f64::from(importance * urgency);
    let importance_multiplier = level_multiplier(importance);
    let urgency_multiplier = level_multiplier(urgency);
    let weighted_eisenhower = eisenhower * importance_multiplier * urgency_multiplier;

    let pressure = deadline_pressure(deadline, deadline_type, ctx.current_time);
    let deadline_boost = deadline_boost(pressure);

    let async_boost = async_urgency_bonus(item.async_wait_minutes());

    let capacity = ctx.cognitive_capacity_at(ctx.current_time);
    let factor = cognitive_match_factor(capacity, item.cognitive_complexity());
    let cognitive_match = weighted_eisenhower * (factor - 1.0);

    let context_switch_penalty = match &ctx.last_scheduled {
        Some(last) if last.group.as_deref() != item.group() => {
            -ctx.context_switch_penalty()
        }
        _ => 0.0,
    };

    let workflow_depth_bonus =
        workflow.map_or(0.0, |w| workflow_depth_bonus(w.critical_path_minutes));

    let base = weighted_eisenhower + deadline_boost + async_boost * factor + workflow_depth_bonus;
    let total = base + context_switch_penalty;

    Priority {
        total,
        breakdown: PriorityBreakdown {
            eisenhower,
            importance_multiplier,
            urgency_multiplier,
            weighted_eisenhower,
            deadline_pressure: pressure,
            deadline_boost,
            async_boost,
            cognitive_match_factor: factor,
            cognitive_match,
            context_switch_penalty,
            workflow_depth_bonus,
        },
    }
}

/// Compare f64 values for sorting, treating NaN as equal.
fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Sort key for candidate selection. Lower key = picked first.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityKey {
    pub neg_total: f64,
    pub id: String,
}

impl PriorityKey {
    pub fn new(total: f64, id: impl Into<String>) -> Self {
        Self {
            neg_total: -total,
            id: id.into(),
        }
    }
}

impl Eq for PriorityKey {}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_f64(self.neg_total, other.neg_total).then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

//! Core data types for the scheduling engine.
//!
//! Inputs (tasks, workflows, work patterns) are built by the persistence layer
//! and treated as read-only. Outputs (scheduled and unscheduled items) are new
//! records produced by a run.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Neutral importance/urgency used when nothing better is known.
pub const DEFAULT_LEVEL: i32 = 5;

/// Cognitive complexity assumed for items that do not declare one.
pub const DEFAULT_COGNITIVE_COMPLEXITY: i32 = 3;

fn default_level() -> i32 {
    DEFAULT_LEVEL
}

/// How strictly a deadline must be met.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    #[default]
    Hard,
    Soft,
}

/// A unit of schedulable work with no internal structure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub duration_minutes: i64,
    #[serde(default = "default_level")]
    pub importance: i32,
    #[serde(default = "default_level")]
    pub urgency: i32,
    pub work_type: String,
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub deadline_type: DeadlineType,
    #[serde(default)]
    pub cognitive_complexity: Option<i32>,
    #[serde(default)]
    pub async_wait_minutes: i64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Grouping used for the context-switch penalty.
    #[serde(default)]
    pub project_id: Option<String>,
}

impl Task {
    /// A not-started task with neutral importance and urgency.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        duration_minutes: i64,
        work_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_minutes,
            importance: DEFAULT_LEVEL,
            urgency: DEFAULT_LEVEL,
            work_type: work_type.into(),
            deadline: None,
            deadline_type: DeadlineType::Hard,
            cognitive_complexity: None,
            async_wait_minutes: 0,
            completed: false,
            dependencies: Vec::new(),
            project_id: None,
        }
    }
}

/// Progress of a workflow step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    NotStarted,
    InProgress,
    WaitingAsync,
    Completed,
}

/// One step of a workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub duration_minutes: i64,
    pub work_type: String,
    /// Ids of steps in the same workflow. Unknown ids are ignored.
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub async_wait_minutes: i64,
    /// Overrides the workflow's importance when set.
    #[serde(default)]
    pub importance: Option<i32>,
    /// Overrides the workflow's urgency when set.
    #[serde(default)]
    pub urgency: Option<i32>,
    #[serde(default)]
    pub cognitive_complexity: Option<i32>,
    #[serde(default)]
    pub status: StepStatus,
    #[serde(default)]
    pub percent_complete: i32,
    /// Falls back to the workflow deadline when unset.
    #[serde(default)]
    pub deadline: Option<NaiveDateTime>,
    #[serde(default)]
    pub deadline_type: Option<DeadlineType>,
}

impl Step {
    pub fn new(
        id: impl Into<String>,
        workflow_id: impl Into<String>,
        name: impl Into<String>,
        duration_minutes: i64,
        work_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            workflow_id: workflow_id.into(),
            name: name.into(),
            duration_minutes,
            work_type: work_type.into(),
            depends_on: Vec::new(),
            async_wait_minutes: 0,
            importance: None,
            urgency: None,
            cognitive_complexity: None,
            status: StepStatus::NotStarted,
            percent_complete: 0,
            deadline: None,
            deadline_type: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == StepStatus::Completed
    }
}

/// A task that owns an ordered list of steps.
///
/// The embedded task's duration is not authoritative; the steps are.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(flatten)]
    pub task: Task,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Workflow {
    pub fn new(task: Task, steps: Vec<Step>) -> Self {
        Self { task, steps }
    }

    pub fn id(&self) -> &str {
        &self.task.id
    }

    /// Sum of the active minutes of every step.
    pub fn total_step_minutes(&self) -> i64 {
        self.steps.iter().map(|s| s.duration_minutes.max(0)).sum()
    }
}

/// A work type's share of a combo block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkTypeSplit {
    pub work_type: String,
    pub ratio: f64,
}

/// Purpose of a block that is not available for work.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemBlockKind {
    Sleep,
    Blocked,
}

/// How a block's minutes are divided between work types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockType {
    Single { work_type: String },
    Combo { splits: Vec<WorkTypeSplit> },
    System { kind: SystemBlockKind },
}

impl BlockType {
    pub fn single(work_type: impl Into<String>) -> Self {
        Self::Single {
            work_type: work_type.into(),
        }
    }

    pub fn combo<S: Into<String>>(splits: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self::Combo {
            splits: splits
                .into_iter()
                .map(|(work_type, ratio)| WorkTypeSplit {
                    work_type: work_type.into(),
                    ratio,
                })
                .collect(),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Self::System { .. })
    }
}

/// A contiguous interval of one day with a capacity configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkBlock {
    pub id: String,
    pub start_time: String,
    pub end_time: String,
    pub block_type: BlockType,
}

impl WorkBlock {
    pub fn new(
        id: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        block_type: BlockType,
    ) -> Self {
        Self {
            id: id.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
            block_type,
        }
    }
}

/// A fixed occupied interval that tasks may not be placed over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub start_time: String,
    pub end_time: String,
}

/// One day's blocks and meetings, or a reusable template when `date` is unset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyWorkPattern {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub blocks: Vec<WorkBlock>,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub is_template: bool,
}

impl DailyWorkPattern {
    pub fn for_date(date: NaiveDate, blocks: Vec<WorkBlock>) -> Self {
        Self {
            date: Some(date),
            blocks,
            meetings: Vec::new(),
            is_template: false,
        }
    }

    pub fn template(blocks: Vec<WorkBlock>) -> Self {
        Self {
            date: None,
            blocks,
            meetings: Vec::new(),
            is_template: true,
        }
    }
}

/// Cognitive capacity available at some time of day.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveLevel {
    Low,
    #[default]
    Moderate,
    High,
    Peak,
}

impl CognitiveLevel {
    /// Numeric level compared against an item's cognitive complexity.
    pub fn value(self) -> i32 {
        match self {
            Self::Low => 2,
            Self::Moderate => 3,
            Self::High => 4,
            Self::Peak => 5,
        }
    }
}

/// A time-of-day window of a productivity pattern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductivityWindow {
    pub start_time: String,
    pub end_time: String,
    pub level: CognitiveLevel,
}

/// Whether a placed or rejected item is a plain task or a workflow step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Task,
    Step,
}

/// One placed segment of a task or step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub work_type: String,
    pub workflow_id: Option<String>,
    pub block_id: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub duration_minutes: i64,
    /// Priority total at the moment of placement.
    pub priority: f64,
    /// First segment of an item that was split.
    pub is_start: bool,
    /// Last segment of an item that was split.
    pub is_end: bool,
    /// Work on the item remains after this segment.
    pub is_partial: bool,
    /// Set on the final segment of an item with an async wait.
    pub async_wait_until: Option<NaiveDateTime>,
}

/// Why an item, or the rest of it, could not be placed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscheduledReason {
    NoCapacity,
    BlockedByDependency,
    NoMatchingWorkType,
    DoesNotFitSingleBlock,
    PartiallyScheduled,
}

impl UnscheduledReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::NoCapacity => "no capacity of required type remaining in horizon",
            Self::BlockedByDependency => "blocked by incomplete dependency",
            Self::NoMatchingWorkType => "no block in horizon offers this work type",
            Self::DoesNotFitSingleBlock => "does not fit in any single block and splitting is disabled",
            Self::PartiallyScheduled => "partially scheduled; no capacity for the remainder within horizon",
        }
    }
}

/// An item, or the unplaced remainder of one, left out of the schedule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UnscheduledItem {
    pub id: String,
    pub name: String,
    pub kind: ItemKind,
    pub work_type: String,
    pub workflow_id: Option<String>,
    pub remaining_minutes: i64,
    pub reason: UnscheduledReason,
    pub message: String,
}

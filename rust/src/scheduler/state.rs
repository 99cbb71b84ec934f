//! Working set of one scheduling run.

use chrono::NaiveDateTime;
use rustc_hash::FxHashSet;

use crate::models::{ItemKind, ScheduledItem, Step, Task};
use crate::priority::{LastScheduled, PriorityItem};
use crate::time::add_minutes;

use super::decision::SchedulingDecision;

/// Sanitised copy of the input a pool entry was built from.
#[derive(Clone, Debug)]
pub enum ItemSource {
    Task(Task),
    Step(Step),
}

impl ItemSource {
    pub fn as_priority_item(&self) -> PriorityItem<'_> {
        match self {
            Self::Task(task) => PriorityItem::Task(task),
            Self::Step(step) => PriorityItem::Step(step),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Task(task) => &task.id,
            Self::Step(step) => &step.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Task(task) => &task.name,
            Self::Step(step) => &step.name,
        }
    }

    pub fn work_type(&self) -> &str {
        match self {
            Self::Task(task) => &task.work_type,
            Self::Step(step) => &step.work_type,
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            Self::Task(_) => ItemKind::Task,
            Self::Step(_) => ItemKind::Step,
        }
    }

    pub fn async_wait_minutes(&self) -> i64 {
        match self {
            Self::Task(task) => task.async_wait_minutes,
            Self::Step(step) => step.async_wait_minutes,
        }
    }

    pub fn deadline(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Task(task) => task.deadline,
            Self::Step(step) => step.deadline,
        }
    }
}

/// A task or step still competing for time.
#[derive(Clone, Debug)]
pub struct PoolEntry {
    pub source: ItemSource,
    pub workflow_id: Option<String>,
    /// Minutes of active work not yet placed.
    pub remaining_minutes: i64,
    /// Pool indices of dependencies that are part of this run.
    pub deps: Vec<usize>,
    /// Pool indices of entries listing this one in `deps`.
    pub dependents: Vec<usize>,
    /// Segments placed so far.
    pub segments: usize,
    pub last_end: Option<NaiveDateTime>,
    pub done: bool,
}

impl PoolEntry {
    pub fn new(source: ItemSource, workflow_id: Option<String>, remaining_minutes: i64) -> Self {
        Self {
            source,
            workflow_id,
            remaining_minutes,
            deps: Vec::new(),
            dependents: Vec::new(),
            segments: 0,
            last_end: None,
            done: false,
        }
    }

    pub fn id(&self) -> &str {
        self.source.id()
    }

    /// When dependents may start: end of the last segment plus the async wait.
    pub fn finished_at(&self) -> Option<NaiveDateTime> {
        if !self.done {
            return None;
        }
        self.last_end
            .map(|end| add_minutes(end, self.source.async_wait_minutes()))
    }
}

/// Mutable state of a run: the pool, the simulated clock and what has been placed.
#[derive(Clone, Debug)]
pub struct RunState {
    pub pool: Vec<PoolEntry>,
    pub clock: NaiveDateTime,
    pub last_scheduled: Option<LastScheduled>,
    pub scheduled: Vec<ScheduledItem>,
    pub decisions: Vec<SchedulingDecision>,
    warnings: Vec<String>,
    seen_warnings: FxHashSet<String>,
}

impl RunState {
    pub fn new(clock: NaiveDateTime) -> Self {
        Self {
            pool: Vec::new(),
            clock,
            last_scheduled: None,
            scheduled: Vec::new(),
            decisions: Vec::new(),
            warnings: Vec::new(),
            seen_warnings: FxHashSet::default(),
        }
    }

    /// Record a warning once; repeats of the same text are dropped.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if self.seen_warnings.insert(message.clone()) {
            self.warnings.push(message);
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        self.seen_warnings.clear();
        std::mem::take(&mut self.warnings)
    }

    /// Entries not yet fully placed.
    pub fn open_entries(&self) -> impl Iterator<Item = usize> + '_ {
        self.pool
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.done)
            .map(|(idx, _)| idx)
    }

    pub fn deps_done(&self, idx: usize) -> bool {
        self.pool[idx].deps.iter().all(|&dep| self.pool[dep].done)
    }

    /// Earliest instant the next segment of `idx` may start.
    ///
    /// Only meaningful once `deps_done(idx)` holds.
    pub fn earliest_start(&self, idx: usize, floor: NaiveDateTime) -> NaiveDateTime {
        let entry = &self.pool[idx];
        entry
            .deps
            .iter()
            .filter_map(|&dep| self.pool[dep].finished_at())
            .chain(entry.last_end)
            .fold(floor, std::cmp::max)
    }
}

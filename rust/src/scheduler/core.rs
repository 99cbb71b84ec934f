//! Greedy multi-day scheduler.
//!
//! One `Scheduler` value per run. Each planned day repeats: collect the ready
//! items, rank them by priority, place one segment of the best item that fits
//! somewhere in the day, and go again. A day ends when no ready item fits.
//! Whatever is left after the last day is reported as unscheduled.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::ops::Range;

use crate::config::ScheduleOptions;
use crate::dependency::{level_of, validate_workflow};
use crate::models::{
    DailyWorkPattern, ScheduledItem, Step, StepStatus, Task, UnscheduledItem, UnscheduledReason,
    Workflow,
};
use crate::priority::{priority, LastScheduled, ParsedWindow, Priority, SchedulingContext};
use crate::time::{
    add_minutes, at_minutes, duration_between_minutes, format_duration, try_parse_time,
    MAX_ITEM_MINUTES, MINUTES_PER_DAY,
};
use crate::{log_changes, log_checks, log_debug};

use super::block_schedule::BlockSchedule;
use super::decision::SchedulingDecision;
use super::diagnostics::{DebugInfo, ScheduleMetrics, ScheduleResult};
use super::ready::ReadyQueue;
use super::state::{ItemSource, PoolEntry, RunState};

/// A date in the horizon and the range of its blocks in the block table.
#[derive(Clone, Debug)]
struct PlannedDay {
    date: NaiveDate,
    blocks: Range<usize>,
}

/// Where the next segment of an item goes.
#[derive(Clone, Copy, Debug)]
struct Placement {
    /// Index into the day's blocks
    block: usize,
    start: NaiveDateTime,
    minutes: i64,
}

/// Scheduler for one run over borrowed inputs. Inputs are never modified.
pub struct Scheduler<'a> {
    tasks: &'a [Task],
    workflows: &'a [Workflow],
    patterns: &'a [DailyWorkPattern],
    options: &'a ScheduleOptions,
    verbosity: u8,
}

impl<'a> Scheduler<'a> {
    pub fn new(
        tasks: &'a [Task],
        workflows: &'a [Workflow],
        patterns: &'a [DailyWorkPattern],
        options: &'a ScheduleOptions,
    ) -> Self {
        Self {
            tasks,
            workflows,
            patterns,
            options,
            verbosity: options.preferences.verbosity,
        }
    }

    /// Run the scheduling algorithm. Always returns a result.
    pub fn schedule(&self) -> ScheduleResult {
        let mut state = RunState::new(self.options.current_time);

        let (days, mut blocks) = self.build_horizon(&mut state);
        self.build_pool(&mut state);
        self.check_work_types(&mut state, &blocks);
        self.check_productivity_pattern(&mut state);

        let mut ctx = SchedulingContext::new(self.options.current_time, self.workflows)
            .with_productivity_pattern(&self.options.productivity_pattern)
            .with_preferences(self.options.preferences.clone());

        for day in &days {
            self.schedule_day(day, &mut blocks, &mut state, &mut ctx);
        }

        let unscheduled = self.collect_unscheduled(&state, &blocks);
        for item in &unscheduled {
            log_changes!(
                self.verbosity,
                "Unscheduled {} ({} left): {}",
                item.id,
                format_duration(item.remaining_minutes),
                item.message
            );
        }

        let mut scheduled = std::mem::take(&mut state.scheduled);
        scheduled.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then_with(|| a.end.cmp(&b.end))
                .then_with(|| a.id.cmp(&b.id))
        });

        let metrics = self.options.debug_mode.then(|| {
            ScheduleMetrics::calculate(
                &scheduled,
                &blocks,
                state
                    .pool
                    .iter()
                    .filter_map(|entry| entry.source.deadline().map(|d| (entry.id(), d))),
                std::mem::take(&mut state.decisions),
            )
        });

        let debug_info = DebugInfo::calculate(&scheduled, &unscheduled, &blocks, state.take_warnings());

        ScheduleResult {
            scheduled,
            unscheduled,
            debug_info,
            metrics,
        }
    }

    /// Dates to plan and their blocks, in date order.
    ///
    /// Meetings and system blocks are busy time in every block they overlap,
    /// including blocks of a neighbouring day that cross midnight.
    fn build_horizon(&self, state: &mut RunState) -> (Vec<PlannedDay>, Vec<BlockSchedule>) {
        let mut dated: BTreeMap<NaiveDate, &DailyWorkPattern> = BTreeMap::new();
        let mut template: Option<&DailyWorkPattern> = None;
        for pattern in self.patterns {
            match pattern.date {
                Some(date) if !pattern.is_template => {
                    if dated.contains_key(&date) {
                        state.warn(format!("more than one work pattern for {date}; using the first"));
                    } else {
                        dated.insert(date, pattern);
                    }
                }
                _ => {
                    if template.is_none() {
                        template = Some(pattern);
                    }
                }
            }
        }

        let start = self.options.start_date;
        let end = self
            .options
            .end_date
            .or_else(|| dated.keys().next_back().copied())
            .unwrap_or(start);

        let mut days = Vec::new();
        let mut blocks = Vec::new();
        let mut busy = Vec::new();
        let mut date = start;
        while date <= end {
            let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);
            if !weekend || self.options.include_weekends {
                if let Some(pattern) = dated.get(&date).copied().or(template) {
                    let first = blocks.len();
                    self.plan_day(date, pattern, &mut blocks, &mut busy, state);
                    days.push(PlannedDay {
                        date,
                        blocks: first..blocks.len(),
                    });
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        for &(busy_start, busy_end) in &busy {
            occlude(&mut blocks, busy_start, busy_end);
        }
        for block in &mut blocks {
            for anomaly in block.compute_capacity() {
                state.warn(format!("block {}: {anomaly}", block.block_id));
            }
        }

        if blocks.is_empty() {
            state.warn(format!("no work blocks in planning horizon {start} to {end}"));
        }
        log_debug!(
            self.verbosity,
            "Horizon {} to {}: {} days, {} blocks",
            start,
            end,
            days.len(),
            blocks.len()
        );

        (days, blocks)
    }

    /// Turn one pattern into dated blocks. Meeting and system block intervals go to `busy`.
    fn plan_day(
        &self,
        date: NaiveDate,
        pattern: &DailyWorkPattern,
        blocks: &mut Vec<BlockSchedule>,
        busy: &mut Vec<(NaiveDateTime, NaiveDateTime)>,
        state: &mut RunState,
    ) {
        if self.options.respect_meetings {
            for meeting in &pattern.meetings {
                let label = format!("meeting {}", meeting.id);
                busy.push(self.interval(date, &meeting.start_time, &meeting.end_time, &label, state));
            }
        }

        let first = blocks.len();
        for block in &pattern.blocks {
            let label = format!("block {}", block.id);
            let (start, end) = self.interval(date, &block.start_time, &block.end_time, &label, state);
            if block.block_type.is_system() {
                busy.push((start, end));
            }
            blocks.push(BlockSchedule::new(
                block.id.clone(),
                date,
                start,
                end,
                block.block_type.clone(),
            ));
        }
        blocks[first..].sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.block_id.cmp(&b.block_id)));
    }

    /// Resolve an "HH:MM" pair on `date`. An end before the start crosses midnight.
    fn interval(
        &self,
        date: NaiveDate,
        start: &str,
        end: &str,
        label: &str,
        state: &mut RunState,
    ) -> (NaiveDateTime, NaiveDateTime) {
        let start_minutes = read_time(start, label, state);
        let end_minutes = read_time(end, label, state);
        let start = at_minutes(date, start_minutes);
        (
            start,
            start + Duration::minutes(duration_between_minutes(start_minutes, end_minutes)),
        )
    }

    /// Flatten open tasks and steps into the candidate pool.
    fn build_pool(&self, state: &mut RunState) {
        for task in self.tasks {
            if task.completed {
                continue;
            }
            let task = sanitize_task(task);
            let minutes = task.duration_minutes;
            state
                .pool
                .push(PoolEntry::new(ItemSource::Task(task), None, minutes));
        }

        for workflow in self.workflows {
            if workflow.task.completed {
                continue;
            }
            for issue in validate_workflow(workflow).errors {
                state.warn(format!("workflow {}: {}", workflow.id(), issue.description));
            }

            // None marks a step that is already satisfied for its dependents
            let mut slots: FxHashMap<&str, Option<usize>> = FxHashMap::default();
            let first = state.pool.len();
            for step in &workflow.steps {
                if slots.contains_key(step.id.as_str()) {
                    continue;
                }
                let slot = match step.status {
                    StepStatus::Completed | StepStatus::WaitingAsync => None,
                    StepStatus::NotStarted | StepStatus::InProgress => {
                        let step = sanitize_step(step, workflow);
                        let minutes = remaining_minutes(&step);
                        state.pool.push(PoolEntry::new(
                            ItemSource::Step(step),
                            Some(workflow.id().to_string()),
                            minutes,
                        ));
                        Some(state.pool.len() - 1)
                    }
                };
                slots.insert(step.id.as_str(), slot);
            }

            // Keep only edges that point to a lower level; this cuts cycles
            let levels = level_of(&workflow.steps);
            for idx in first..state.pool.len() {
                let ItemSource::Step(step) = &state.pool[idx].source else {
                    continue;
                };
                let own_level = levels.get(&step.id).copied().unwrap_or(0);
                let mut deps: Vec<usize> = Vec::new();
                for dep_id in &step.depends_on {
                    let dep_level = levels.get(dep_id).copied().unwrap_or(0);
                    if let Some(Some(dep)) = slots.get(dep_id.as_str()) {
                        if dep_level < own_level && !deps.contains(dep) {
                            deps.push(*dep);
                        }
                    }
                }
                for &dep in &deps {
                    state.pool[dep].dependents.push(idx);
                }
                state.pool[idx].deps = deps;
            }
        }

        log_debug!(self.verbosity, "Candidate pool: {} items", state.pool.len());
    }

    fn check_work_types(&self, state: &mut RunState, blocks: &[BlockSchedule]) {
        let missing: Vec<(String, String)> = state
            .pool
            .iter()
            .filter(|entry| entry.remaining_minutes > 0)
            .filter(|entry| !offers(blocks, entry.source.work_type()))
            .map(|entry| (entry.id().to_string(), entry.source.work_type().to_string()))
            .collect();
        for (id, work_type) in missing {
            state.warn(format!(
                "{id}: no block in horizon offers work type {work_type:?}"
            ));
        }
    }

    fn check_productivity_pattern(&self, state: &mut RunState) {
        for window in &self.options.productivity_pattern {
            if let Err(err) = ParsedWindow::parse(window) {
                state.warn(format!(
                    "productivity window {}-{}: {err}, ignored",
                    window.start_time, window.end_time
                ));
            }
        }
    }

    /// Place segments into one day's blocks until no ready item fits.
    ///
    /// Capacity and free time only shrink during a day, so an item that finds
    /// no spot is dropped from the day's queue and not tried again.
    fn schedule_day(
        &self,
        day: &PlannedDay,
        blocks: &mut [BlockSchedule],
        state: &mut RunState,
        ctx: &mut SchedulingContext,
    ) {
        let range = day.blocks.clone();
        let Some(first_start) = blocks[range.clone()].iter().map(|b| b.start).min() else {
            return;
        };
        state.clock = self.options.current_time.max(first_start);
        log_changes!(self.verbosity, "Day {}: {} blocks from {}", day.date, range.len(), state.clock);

        let mut queue = ReadyQueue::default();
        let ready: Vec<usize> = state
            .open_entries()
            .filter(|&idx| state.deps_done(idx))
            .collect();
        for idx in ready {
            enqueue(&mut queue, state, ctx, idx);
        }
        log_debug!(self.verbosity, "  Ready items: {}", queue.len());

        let penalty = ctx.context_switch_penalty();
        // Work types with no capacity left in today's blocks
        let mut exhausted: FxHashSet<String> = FxHashSet::default();
        let mut passed_over: Vec<String> = Vec::new();

        while let Some((idx, p)) = queue.best(state.last_scheduled.as_ref(), penalty) {
            queue.remove(idx);
            let entry = &state.pool[idx];
            log_checks!(
                self.verbosity,
                "  Considering {} (priority={:.2}, remaining={} min)",
                entry.id(),
                p.total,
                entry.remaining_minutes
            );
            log_debug!(self.verbosity, "    {:?}", p.breakdown);

            let no_capacity =
                entry.remaining_minutes > 0 && exhausted.contains(entry.source.work_type());
            let placement = if no_capacity {
                None
            } else {
                self.find_placement(state, idx, &blocks[range.clone()])
            };
            let Some(placement) = placement else {
                log_checks!(self.verbosity, "    Skipping {}: no room today", state.pool[idx].id());
                passed_over.push(state.pool[idx].id().to_string());
                continue;
            };

            let placement = Placement {
                block: range.start + placement.block,
                ..placement
            };
            let beaten = queue.len();
            self.commit(state, idx, placement, blocks, &p, std::mem::take(&mut passed_over), beaten);

            let work_type = state.pool[idx].source.work_type();
            if blocks[range.clone()]
                .iter()
                .all(|b| b.remaining_for(work_type) <= 0)
            {
                exhausted.insert(work_type.to_string());
            }

            if state.pool[idx].done {
                for dependent in state.pool[idx].dependents.clone() {
                    if !state.pool[dependent].done
                        && !queue.contains(dependent)
                        && state.deps_done(dependent)
                    {
                        enqueue(&mut queue, state, ctx, dependent);
                    }
                }
            } else {
                enqueue(&mut queue, state, ctx, idx);
            }
        }

        log_debug!(self.verbosity, "  Nothing else fits on {}", day.date);
    }

    /// Earliest spot in the day for the next segment of `idx`.
    fn find_placement(&self, state: &RunState, idx: usize, blocks: &[BlockSchedule]) -> Option<Placement> {
        let entry = &state.pool[idx];
        let from = state.earliest_start(idx, state.clock);
        let work_type = entry.source.work_type();
        let remaining = entry.remaining_minutes;

        for (pos, block) in blocks.iter().enumerate() {
            if remaining == 0 {
                if block.block_type.is_system() {
                    continue;
                }
                if let Some(start) = block.next_available_time(from) {
                    return Some(Placement {
                        block: pos,
                        start,
                        minutes: 0,
                    });
                }
                continue;
            }

            let available = block.remaining_for(work_type);
            if available <= 0 {
                continue;
            }

            if self.options.allow_task_splitting {
                let Some(start) = block.next_available_time(from) else {
                    continue;
                };
                let gap = (block.free_until(start) - start).num_minutes();
                let minutes = remaining.min(available).min(gap);
                if minutes > 0 {
                    return Some(Placement {
                        block: pos,
                        start,
                        minutes,
                    });
                }
            } else if available >= remaining {
                if let Some(start) = block.find_gap(from, remaining) {
                    return Some(Placement {
                        block: pos,
                        start,
                        minutes: remaining,
                    });
                }
            }
        }

        None
    }

    /// Record a placement: consume capacity, advance the item, emit the segment.
    ///
    /// `placement.block` indexes the whole horizon. The segment is busy time in
    /// every block it overlaps.
    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        state: &mut RunState,
        idx: usize,
        placement: Placement,
        blocks: &mut [BlockSchedule],
        p: &Priority,
        passed_over: Vec<String>,
        candidates_beaten: usize,
    ) {
        let start = placement.start;
        let end = add_minutes(start, placement.minutes);

        let entry = &mut state.pool[idx];
        blocks[placement.block].consume(entry.source.work_type(), placement.minutes);
        occlude(blocks, start, end);
        let block_id = blocks[placement.block].block_id.clone();

        let first = entry.segments == 0;
        entry.remaining_minutes -= placement.minutes;
        entry.segments += 1;
        entry.last_end = Some(end);
        let more = entry.remaining_minutes > 0;
        entry.done = !more;

        let async_wait = entry.source.async_wait_minutes();
        let item = ScheduledItem {
            id: entry.id().to_string(),
            name: entry.source.name().to_string(),
            kind: entry.source.kind(),
            work_type: entry.source.work_type().to_string(),
            workflow_id: entry.workflow_id.clone(),
            block_id,
            start,
            end,
            duration_minutes: placement.minutes,
            priority: p.total,
            is_start: first && more,
            is_end: !first && !more,
            is_partial: more,
            async_wait_until: (!more && async_wait > 0).then(|| add_minutes(end, async_wait)),
        };

        log_changes!(
            self.verbosity,
            "  Scheduled {} in {} from {} to {}{}",
            item.id,
            item.block_id,
            start,
            end,
            if more { " (partial)" } else { "" }
        );

        state.last_scheduled = Some(LastScheduled {
            id: item.id.clone(),
            group: entry.source.as_priority_item().group().map(str::to_string),
        });

        if self.options.debug_mode {
            state.decisions.push(SchedulingDecision {
                item_id: item.id.clone(),
                block_id: item.block_id.clone(),
                start,
                end,
                duration_minutes: placement.minutes,
                priority: p.total,
                breakdown: p.breakdown.clone(),
                passed_over,
                candidates_beaten,
            });
        }

        state.scheduled.push(item);
    }

    fn collect_unscheduled(&self, state: &RunState, blocks: &[BlockSchedule]) -> Vec<UnscheduledItem> {
        state
            .open_entries()
            .map(|idx| {
                let entry = &state.pool[idx];
                let (reason, message) = self.unscheduled_reason(state, idx, blocks);
                UnscheduledItem {
                    id: entry.id().to_string(),
                    name: entry.source.name().to_string(),
                    kind: entry.source.kind(),
                    work_type: entry.source.work_type().to_string(),
                    workflow_id: entry.workflow_id.clone(),
                    remaining_minutes: entry.remaining_minutes,
                    reason,
                    message,
                }
            })
            .collect()
    }

    fn unscheduled_reason(
        &self,
        state: &RunState,
        idx: usize,
        blocks: &[BlockSchedule],
    ) -> (UnscheduledReason, String) {
        let entry = &state.pool[idx];
        let work_type = entry.source.work_type();

        let pending: Vec<&str> = entry
            .deps
            .iter()
            .filter(|&&dep| !state.pool[dep].done)
            .map(|&dep| state.pool[dep].id())
            .collect();

        if !pending.is_empty() {
            let reason = UnscheduledReason::BlockedByDependency;
            return (reason, format!("{}: {}", reason.message(), pending.join(", ")));
        }

        let reason = if entry.remaining_minutes > 0 && !offers(blocks, work_type) {
            UnscheduledReason::NoMatchingWorkType
        } else if entry.segments > 0 {
            UnscheduledReason::PartiallyScheduled
        } else if !self.options.allow_task_splitting
            && !blocks
                .iter()
                .any(|b| b.capacity_for(work_type) >= entry.remaining_minutes)
        {
            UnscheduledReason::DoesNotFitSingleBlock
        } else {
            UnscheduledReason::NoCapacity
        };

        (reason, reason.message().to_string())
    }
}

/// Score `idx` at its earliest start and queue it.
fn enqueue(queue: &mut ReadyQueue, state: &RunState, ctx: &mut SchedulingContext, idx: usize) {
    ctx.current_time = state.earliest_start(idx, state.clock);
    let item = state.pool[idx].source.as_priority_item();
    queue.insert(idx, item.id(), item.group(), priority(item, ctx));
}

/// Mark `[start, end)` busy in every block it overlaps. `blocks` is sorted by start
/// and no block is longer than a day.
fn occlude(blocks: &mut [BlockSchedule], start: NaiveDateTime, end: NaiveDateTime) {
    if start >= end {
        return;
    }
    let reach = add_minutes(start, -MINUTES_PER_DAY);
    let lo = blocks.partition_point(|b| b.start <= reach);
    let hi = blocks.partition_point(|b| b.start < end).max(lo);
    for block in &mut blocks[lo..hi] {
        if block.end > start {
            block.add_busy_period(start, end);
        }
    }
}

/// True when some block in `blocks` has capacity for `work_type`.
fn offers(blocks: &[BlockSchedule], work_type: &str) -> bool {
    blocks.iter().any(|b| b.capacity_for(work_type) > 0)
}

fn read_time(value: &str, label: &str, state: &mut RunState) -> i64 {
    match try_parse_time(value) {
        Ok(minutes) => minutes,
        Err(err) => {
            state.warn(format!("{label}: {err}, treated as 00:00"));
            0
        }
    }
}

fn sanitize_task(task: &Task) -> Task {
    let mut task = task.clone();
    task.duration_minutes = task.duration_minutes.clamp(0, MAX_ITEM_MINUTES);
    task.async_wait_minutes = task.async_wait_minutes.clamp(0, MAX_ITEM_MINUTES);
    task.importance = task.importance.clamp(1, 10);
    task.urgency = task.urgency.clamp(1, 10);
    task.cognitive_complexity = task.cognitive_complexity.map(|c| c.clamp(1, 5));
    task
}

/// Copy of `step` owned by `workflow`, with the workflow deadline filled in.
fn sanitize_step(step: &Step, workflow: &Workflow) -> Step {
    let mut step = step.clone();
    step.workflow_id = workflow.id().to_string();
    step.duration_minutes = step.duration_minutes.clamp(0, MAX_ITEM_MINUTES);
    step.async_wait_minutes = step.async_wait_minutes.clamp(0, MAX_ITEM_MINUTES);
    step.importance = step.importance.map(|v| v.clamp(1, 10));
    step.urgency = step.urgency.map(|v| v.clamp(1, 10));
    step.cognitive_complexity = step.cognitive_complexity.map(|c| c.clamp(1, 5));
    step.percent_complete = step.percent_complete.clamp(0, 100);
    if step.deadline.is_none() {
        step.deadline = workflow.task.deadline;
        step.deadline_type = step.deadline_type.or(Some(workflow.task.deadline_type));
    }
    step
}

/// Minutes still to do: in-progress steps keep the unfinished share, rounded up.
fn remaining_minutes(step: &Step) -> i64 {
    match step.status {
        StepStatus::InProgress => {
            let left = i64::from(100 - step.percent_complete);
            (step.duration_minutes * left + 99) / 100
        }
        _ => step.duration_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        BlockType, CognitiveLevel, Meeting, ProductivityWindow, SystemBlockKind, WorkBlock,
    };

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn at(date: NaiveDate, hour: u32, minute: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, minute, 0).unwrap()
    }

    /// Monday
    fn monday() -> NaiveDate {
        d(2025, 3, 3)
    }

    fn make_task(id: &str, minutes: i64) -> Task {
        Task::new(id, id, minutes, "focused")
    }

    fn make_step(id: &str, minutes: i64, deps: &[&str]) -> Step {
        let mut step = Step::new(id, "wf", id, minutes, "focused");
        step.depends_on = deps.iter().map(|s| s.to_string()).collect();
        step
    }

    fn make_workflow(steps: Vec<Step>) -> Workflow {
        Workflow::new(Task::new("wf", "Workflow", 0, "focused"), steps)
    }

    fn focused_day(date: NaiveDate, blocks: &[(&str, &str, &str)]) -> DailyWorkPattern {
        DailyWorkPattern::for_date(
            date,
            blocks
                .iter()
                .map(|(id, start, end)| WorkBlock::new(*id, *start, *end, BlockType::single("focused")))
                .collect(),
        )
    }

    fn options() -> ScheduleOptions {
        ScheduleOptions::starting_at(at(monday(), 8, 0))
    }

    fn run(
        tasks: &[Task],
        workflows: &[Workflow],
        patterns: &[DailyWorkPattern],
        options: &ScheduleOptions,
    ) -> ScheduleResult {
        Scheduler::new(tasks, workflows, patterns, options).schedule()
    }

    fn ids(result: &ScheduleResult) -> Vec<&str> {
        result.scheduled.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_task_and_workflow_share_one_block() {
        let mut task = make_task("T", 60);
        task.importance = 8;
        task.urgency = 8;
        let workflow = make_workflow(vec![
            make_step("s1", 30, &[]),
            make_step("s2", 30, &["s1"]),
            make_step("s3", 30, &["s2"]),
        ]);
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "11:00")])];

        let result = run(&[task], &[workflow], &patterns, &options());

        assert_eq!(ids(&result), vec!["T", "s1", "s2"]);
        let times: Vec<(NaiveDateTime, NaiveDateTime)> =
            result.scheduled.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            times,
            vec![
                (at(monday(), 9, 0), at(monday(), 10, 0)),
                (at(monday(), 10, 0), at(monday(), 10, 30)),
                (at(monday(), 10, 30), at(monday(), 11, 0)),
            ]
        );
        assert_eq!(result.unscheduled.len(), 1);
        assert_eq!(result.unscheduled[0].id, "s3");
        assert_eq!(result.unscheduled[0].reason, UnscheduledReason::NoCapacity);
        assert_eq!(
            result.unscheduled[0].message,
            "no capacity of required type remaining in horizon"
        );
        assert_eq!(result.debug_info.total_scheduled, 3);
        assert_eq!(result.debug_info.total_unscheduled, 1);
        assert!((result.debug_info.schedule_efficiency - 1.0).abs() < 1e-9);
        assert!(result.metrics.is_none());
    }

    #[test]
    fn test_partial_placement_across_blocks() {
        let patterns = vec![focused_day(
            monday(),
            &[("short", "09:00", "09:50"), ("long", "10:00", "12:00")],
        )];

        let result = run(&[make_task("big", 90)], &[], &patterns, &options());

        assert_eq!(result.scheduled.len(), 2);
        let first = &result.scheduled[0];
        let second = &result.scheduled[1];
        assert_eq!(first.block_id, "short");
        assert_eq!(first.duration_minutes, 50);
        assert!(first.is_start && first.is_partial && !first.is_end);
        assert_eq!(second.block_id, "long");
        assert_eq!(second.duration_minutes, 40);
        assert_eq!(second.start, at(monday(), 10, 0));
        assert!(second.is_end && !second.is_start && !second.is_partial);
        assert_eq!(first.duration_minutes + second.duration_minutes, 90);
        assert!(result.unscheduled.is_empty());
        assert_eq!(result.debug_info.total_scheduled, 1);
    }

    #[test]
    fn test_unsplit_item_has_no_segment_flags() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];
        let result = run(&[make_task("a", 30)], &[], &patterns, &options());
        let item = &result.scheduled[0];
        assert!(!item.is_start && !item.is_end && !item.is_partial);
    }

    #[test]
    fn test_same_inputs_give_same_output() {
        let tasks: Vec<Task> = (0..8).map(|i| make_task(&format!("t{i}"), 25 + i * 5)).collect();
        let workflow = make_workflow(vec![
            make_step("s1", 40, &[]),
            make_step("s2", 20, &["s1"]),
        ]);
        let patterns = vec![
            focused_day(monday(), &[("b1", "09:00", "11:00"), ("b2", "13:00", "14:30")]),
            focused_day(monday().succ_opt().unwrap(), &[("b3", "09:00", "10:00")]),
        ];
        let mut opts = options();
        opts.debug_mode = true;

        let first = run(&tasks, std::slice::from_ref(&workflow), &patterns, &opts);
        let second = run(&tasks, std::slice::from_ref(&workflow), &patterns, &opts);
        assert_eq!(first, second);
    }

    #[test]
    fn test_dependencies_are_respected() {
        // Declared in reverse order on purpose
        let workflow = make_workflow(vec![
            make_step("s3", 30, &["s2"]),
            make_step("s2", 45, &["s1"]),
            make_step("s1", 60, &[]),
        ]);
        let patterns = vec![focused_day(
            monday(),
            &[("b1", "09:00", "10:00"), ("b2", "10:30", "12:30")],
        )];

        let result = run(&[], std::slice::from_ref(&workflow), &patterns, &options());
        assert!(result.unscheduled.is_empty());

        let end_of = |id: &str| {
            result
                .scheduled
                .iter()
                .filter(|s| s.id == id)
                .map(|s| s.end)
                .max()
                .unwrap()
        };
        let start_of = |id: &str| {
            result
                .scheduled
                .iter()
                .filter(|s| s.id == id)
                .map(|s| s.start)
                .min()
                .unwrap()
        };
        for step in &workflow.steps {
            for dep in &step.depends_on {
                assert!(
                    end_of(dep.as_str()) <= start_of(step.id.as_str()),
                    "{dep} must end before {}",
                    step.id
                );
            }
        }
    }

    #[test]
    fn test_no_double_booking() {
        let mut tasks: Vec<Task> = (0..4).map(|i| make_task(&format!("f{i}"), 50)).collect();
        for i in 0..3 {
            tasks.push(Task::new(format!("a{i}"), "admin", 40, "admin"));
        }
        let patterns = vec![DailyWorkPattern::for_date(
            monday(),
            vec![
                WorkBlock::new("mix", "09:00", "12:00", BlockType::combo([("focused", 0.5), ("admin", 0.5)])),
                WorkBlock::new("late", "14:00", "15:00", BlockType::single("focused")),
            ],
        )];

        let result = run(&tasks, &[], &patterns, &options());

        for usage in &result.debug_info.block_utilization {
            for (work_type, cap) in &usage.capacity {
                let placed: i64 = result
                    .scheduled
                    .iter()
                    .filter(|s| s.block_id == usage.block_id && &s.work_type == work_type)
                    .map(|s| s.duration_minutes)
                    .sum();
                assert!(placed <= *cap, "{} over capacity for {work_type}", usage.block_id);
                assert_eq!(usage.used.get(work_type), Some(&placed));
            }
        }
        for (i, a) in result.scheduled.iter().enumerate() {
            for b in &result.scheduled[i + 1..] {
                assert!(a.end <= b.start || b.end <= a.start, "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_meetings_are_kept_clear() {
        let mut pattern = focused_day(monday(), &[("b1", "09:00", "12:00")]);
        pattern.meetings.push(Meeting {
            id: "standup".into(),
            name: "Standup".into(),
            start_time: "10:00".into(),
            end_time: "11:00".into(),
        });
        let patterns = vec![pattern];

        let result = run(&[make_task("a", 120)], &[], &patterns, &options());
        let times: Vec<(NaiveDateTime, NaiveDateTime)> =
            result.scheduled.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            times,
            vec![
                (at(monday(), 9, 0), at(monday(), 10, 0)),
                (at(monday(), 11, 0), at(monday(), 12, 0)),
            ]
        );
        assert_eq!(result.debug_info.total_capacity_minutes, 120);

        let mut opts = options();
        opts.respect_meetings = false;
        let result = run(&[make_task("a", 120)], &[], &patterns, &opts);
        assert_eq!(result.scheduled.len(), 1);
        assert_eq!(result.scheduled[0].end, at(monday(), 11, 0));
        assert_eq!(result.debug_info.total_capacity_minutes, 180);
    }

    #[test]
    fn test_system_block_is_kept_clear() {
        let patterns = vec![DailyWorkPattern::for_date(
            monday(),
            vec![
                WorkBlock::new("work", "09:00", "12:00", BlockType::single("focused")),
                WorkBlock::new(
                    "lunch",
                    "10:00",
                    "11:00",
                    BlockType::System {
                        kind: SystemBlockKind::Blocked,
                    },
                ),
            ],
        )];

        let result = run(&[make_task("a", 180)], &[], &patterns, &options());

        let times: Vec<(NaiveDateTime, NaiveDateTime)> =
            result.scheduled.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(
            times,
            vec![
                (at(monday(), 9, 0), at(monday(), 10, 0)),
                (at(monday(), 11, 0), at(monday(), 12, 0)),
            ]
        );
        assert_eq!(result.debug_info.total_capacity_minutes, 120);
        assert_eq!(result.unscheduled[0].remaining_minutes, 60);
        assert_eq!(result.unscheduled[0].reason, UnscheduledReason::PartiallyScheduled);
    }

    #[test]
    fn test_overlapping_blocks_share_wall_clock() {
        let patterns = vec![DailyWorkPattern::for_date(
            monday(),
            vec![
                WorkBlock::new("b1", "09:00", "10:00", BlockType::single("focused")),
                WorkBlock::new("b2", "09:00", "10:00", BlockType::single("admin")),
            ],
        )];
        let tasks = vec![make_task("a", 60), Task::new("b", "b", 60, "admin")];

        let result = run(&tasks, &[], &patterns, &options());

        assert_eq!(ids(&result), vec!["a"]);
        assert_eq!(result.scheduled[0].block_id, "b1");
        assert_eq!(result.unscheduled.len(), 1);
        assert_eq!(result.unscheduled[0].id, "b");
        assert_eq!(result.unscheduled[0].reason, UnscheduledReason::NoCapacity);
    }

    #[test]
    fn test_block_crossing_midnight_occupies_next_morning() {
        let tuesday = d(2025, 3, 4);
        let patterns = vec![
            focused_day(monday(), &[("night", "22:00", "02:00")]),
            DailyWorkPattern::for_date(
                tuesday,
                vec![WorkBlock::new("early", "01:00", "03:00", BlockType::single("admin"))],
            ),
        ];
        let tasks = vec![make_task("a", 240), Task::new("b", "b", 90, "admin")];

        let result = run(&tasks, &[], &patterns, &options());

        assert_eq!(ids(&result), vec!["a", "b"]);
        let night = &result.scheduled[0];
        assert_eq!(night.block_id, "night");
        assert_eq!((night.start, night.end), (at(monday(), 22, 0), at(tuesday, 2, 0)));
        let early = &result.scheduled[1];
        assert_eq!(early.block_id, "early");
        assert_eq!((early.start, early.end), (at(tuesday, 2, 0), at(tuesday, 3, 0)));
        assert_eq!(result.unscheduled[0].id, "b");
        assert_eq!(result.unscheduled[0].remaining_minutes, 30);
    }

    #[test]
    fn test_sleep_across_midnight_shortens_morning_block() {
        let tuesday = d(2025, 3, 4);
        let patterns = vec![
            DailyWorkPattern::for_date(
                monday(),
                vec![WorkBlock::new(
                    "sleep",
                    "23:00",
                    "07:00",
                    BlockType::System {
                        kind: SystemBlockKind::Sleep,
                    },
                )],
            ),
            focused_day(tuesday, &[("morning", "06:00", "09:00")]),
        ];

        let result = run(&[make_task("a", 180)], &[], &patterns, &options());

        assert_eq!(result.scheduled.len(), 1);
        assert_eq!(result.scheduled[0].start, at(tuesday, 7, 0));
        assert_eq!(result.scheduled[0].end, at(tuesday, 9, 0));
        assert_eq!(result.unscheduled[0].remaining_minutes, 60);
    }

    #[test]
    fn test_weekends_are_skipped_by_default() {
        let saturday = d(2025, 3, 1);
        let patterns = vec![DailyWorkPattern::template(vec![WorkBlock::new(
            "b1",
            "09:00",
            "10:00",
            BlockType::single("focused"),
        )])];
        let mut opts = ScheduleOptions::starting_at(at(saturday, 8, 0));
        opts.end_date = Some(monday());

        let result = run(&[make_task("a", 60)], &[], &patterns, &opts);
        assert_eq!(result.scheduled[0].start, at(monday(), 9, 0));
        assert_eq!(result.debug_info.block_utilization.len(), 1);

        opts.include_weekends = true;
        let result = run(&[make_task("a", 60)], &[], &patterns, &opts);
        assert_eq!(result.scheduled[0].start, at(saturday, 9, 0));
        assert_eq!(result.debug_info.block_utilization.len(), 3);
    }

    #[test]
    fn test_template_fills_every_day_and_item_spans_days() {
        let tuesday = monday().succ_opt().unwrap();
        let patterns = vec![DailyWorkPattern::template(vec![WorkBlock::new(
            "b1",
            "09:00",
            "11:00",
            BlockType::single("focused"),
        )])];
        let mut opts = options();
        opts.end_date = Some(tuesday);

        let result = run(&[make_task("long", 180)], &[], &patterns, &opts);
        assert_eq!(result.scheduled.len(), 2);
        assert_eq!(result.scheduled[0].end, at(monday(), 11, 0));
        assert!(result.scheduled[0].is_start);
        assert_eq!(result.scheduled[1].start, at(tuesday, 9, 0));
        assert_eq!(result.scheduled[1].end, at(tuesday, 10, 0));
        assert!(result.scheduled[1].is_end);
    }

    #[test]
    fn test_splitting_disabled() {
        let patterns = vec![focused_day(
            monday(),
            &[("b1", "09:00", "09:50"), ("b2", "10:00", "11:00")],
        )];
        let mut opts = options();
        opts.allow_task_splitting = false;

        let result = run(&[make_task("a", 90), make_task("b", 55)], &[], &patterns, &opts);

        assert_eq!(ids(&result), vec!["b"]);
        assert_eq!(result.scheduled[0].block_id, "b2");
        assert_eq!(result.scheduled[0].duration_minutes, 55);
        assert_eq!(result.unscheduled.len(), 1);
        assert_eq!(result.unscheduled[0].id, "a");
        assert_eq!(result.unscheduled[0].reason, UnscheduledReason::DoesNotFitSingleBlock);
    }

    #[test]
    fn test_async_wait_delays_dependent_and_frees_the_gap() {
        let mut s1 = make_step("s1", 30, &[]);
        s1.async_wait_minutes = 60;
        let workflow = make_workflow(vec![s1, make_step("s2", 30, &["s1"])]);
        let mut filler = make_task("filler", 30);
        filler.importance = 2;
        filler.urgency = 2;
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "12:00")])];

        let result = run(&[filler], &[workflow], &patterns, &options());

        assert_eq!(ids(&result), vec!["s1", "filler", "s2"]);
        assert_eq!(result.scheduled[0].async_wait_until, Some(at(monday(), 10, 30)));
        assert_eq!(result.scheduled[1].start, at(monday(), 9, 30));
        assert_eq!(result.scheduled[2].start, at(monday(), 10, 30));
        assert_eq!(result.scheduled[2].async_wait_until, None);
    }

    #[test]
    fn test_huge_and_negative_async_waits() {
        let mut slow = make_step("s1", 30, &[]);
        slow.async_wait_minutes = 200_000_000_000;
        let workflow = make_workflow(vec![slow, make_step("s2", 30, &["s1"])]);
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "11:00")])];

        let result = run(&[], &[workflow], &patterns, &options());

        assert_eq!(ids(&result), vec!["s1"]);
        assert_eq!(
            result.scheduled[0].async_wait_until,
            Some(at(monday(), 9, 30) + Duration::minutes(MAX_ITEM_MINUTES))
        );
        assert_eq!(result.unscheduled[0].id, "s2");
        assert_eq!(result.unscheduled[0].reason, UnscheduledReason::NoCapacity);

        let mut eager = make_step("s1", 30, &[]);
        eager.async_wait_minutes = -60;
        let workflow = make_workflow(vec![eager, make_step("s2", 30, &["s1"])]);

        let result = run(&[], &[workflow], &patterns, &options());

        assert_eq!(ids(&result), vec!["s1", "s2"]);
        assert_eq!(result.scheduled[0].async_wait_until, None);
        assert_eq!(result.scheduled[1].start, at(monday(), 9, 30));
    }

    #[test]
    fn test_huge_duration_is_capped() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];

        let result = run(&[make_task("big", i64::MAX)], &[], &patterns, &options());

        assert_eq!(result.scheduled[0].duration_minutes, 60);
        assert_eq!(result.unscheduled[0].remaining_minutes, MAX_ITEM_MINUTES - 60);
    }

    #[test]
    fn test_step_status_handling() {
        let mut s1 = make_step("s1", 30, &[]);
        s1.status = StepStatus::Completed;
        let mut s2 = make_step("s2", 45, &["s1"]);
        s2.status = StepStatus::InProgress;
        s2.percent_complete = 50;
        let mut s3 = make_step("s3", 30, &[]);
        s3.status = StepStatus::WaitingAsync;
        let s4 = make_step("s4", 30, &["s3"]);
        let workflow = make_workflow(vec![s1, s2, s3, s4]);
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "12:00")])];

        let result = run(&[], &[workflow], &patterns, &options());

        let mut placed = ids(&result);
        placed.sort();
        assert_eq!(placed, vec!["s2", "s4"]);
        let s2 = result.scheduled.iter().find(|s| s.id == "s2").unwrap();
        assert_eq!(s2.duration_minutes, 23);
        assert_eq!(s2.workflow_id.as_deref(), Some("wf"));
    }

    #[test]
    fn test_completed_items_are_ignored() {
        let mut done = make_task("done", 60);
        done.completed = true;
        let mut finished = make_workflow(vec![make_step("s1", 30, &[])]);
        finished.task.completed = true;
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];

        let result = run(&[done], &[finished], &patterns, &options());
        assert!(result.scheduled.is_empty());
        assert!(result.unscheduled.is_empty());
    }

    #[test]
    fn test_unknown_work_type_and_blocked_dependents() {
        let mut s1 = make_step("s1", 30, &[]);
        s1.work_type = "admin".into();
        let workflow = make_workflow(vec![s1, make_step("s2", 30, &["s1"])]);
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];

        let result = run(&[], &[workflow], &patterns, &options());

        assert!(result.scheduled.is_empty());
        let s1 = result.unscheduled.iter().find(|u| u.id == "s1").unwrap();
        assert_eq!(s1.reason, UnscheduledReason::NoMatchingWorkType);
        let s2 = result.unscheduled.iter().find(|u| u.id == "s2").unwrap();
        assert_eq!(s2.reason, UnscheduledReason::BlockedByDependency);
        assert!(s2.message.ends_with("s1"));
        assert!(result
            .debug_info
            .warnings
            .iter()
            .any(|w| w.contains("s1") && w.contains("admin")));
    }

    #[test]
    fn test_partially_scheduled_remainder() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];
        let result = run(&[make_task("a", 100)], &[], &patterns, &options());
        assert_eq!(result.scheduled.len(), 1);
        assert_eq!(result.unscheduled[0].reason, UnscheduledReason::PartiallyScheduled);
        assert_eq!(result.unscheduled[0].remaining_minutes, 40);
    }

    #[test]
    fn test_cyclic_steps_still_schedule() {
        let workflow = make_workflow(vec![make_step("a", 30, &["b"]), make_step("b", 30, &["a"])]);
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];

        let result = run(&[], &[workflow], &patterns, &options());

        assert_eq!(result.scheduled.len(), 2);
        assert!(result
            .debug_info
            .warnings
            .iter()
            .any(|w| w.contains("circular")));
    }

    #[test]
    fn test_overdue_hard_deadline_wins_the_slot() {
        let mut overdue = make_task("b", 60);
        overdue.deadline = Some(at(monday(), 7, 0));
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];

        let result = run(&[make_task("a", 60), overdue], &[], &patterns, &options());
        assert_eq!(ids(&result), vec!["b"]);
        assert_eq!(result.unscheduled[0].id, "a");
    }

    #[test]
    fn test_equal_priority_breaks_ties_by_id() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];
        let result = run(&[make_task("b", 30), make_task("a", 30)], &[], &patterns, &options());
        assert_eq!(ids(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_nothing_placed_before_current_time() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "12:00")])];
        let opts = ScheduleOptions::starting_at(at(monday(), 10, 15));
        let result = run(&[make_task("a", 30)], &[], &patterns, &opts);
        assert_eq!(result.scheduled[0].start, at(monday(), 10, 15));
    }

    #[test]
    fn test_zero_duration_marker() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];
        let result = run(&[make_task("milestone", 0)], &[], &patterns, &options());
        let marker = &result.scheduled[0];
        assert_eq!(marker.start, at(monday(), 9, 0));
        assert_eq!(marker.start, marker.end);
        assert_eq!(marker.duration_minutes, 0);
        assert_eq!(result.debug_info.scheduled_minutes, 0);
    }

    #[test]
    fn test_bad_inputs_warn_instead_of_failing() {
        let patterns = vec![DailyWorkPattern::for_date(
            monday(),
            vec![
                WorkBlock::new("b1", "9am", "10:00", BlockType::single("focused")),
                WorkBlock::new("b2", "13:00", "14:00", BlockType::combo([("focused", 0.6), ("admin", 0.6)])),
            ],
        )];
        let mut negative = make_task("neg", -30);
        negative.importance = 40;

        let result = run(&[negative], &[], &patterns, &options());

        let warnings = &result.debug_info.warnings;
        assert!(warnings.iter().any(|w| w.contains("block b1") && w.contains("9am")));
        assert!(warnings.iter().any(|w| w.contains("block b2") && w.contains("rescaled")));
        assert_eq!(result.scheduled[0].duration_minutes, 0);
    }

    #[test]
    fn test_bad_productivity_window_is_reported() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];
        let mut opts = options();
        opts.productivity_pattern = vec![
            ProductivityWindow {
                start_time: "25:00".into(),
                end_time: "26:00".into(),
                level: CognitiveLevel::Peak,
            },
            ProductivityWindow {
                start_time: "09:00".into(),
                end_time: "10:00".into(),
                level: CognitiveLevel::Peak,
            },
        ];

        let result = run(&[make_task("a", 30)], &[], &patterns, &opts);

        let bad: Vec<&String> = result
            .debug_info
            .warnings
            .iter()
            .filter(|w| w.contains("productivity window"))
            .collect();
        assert_eq!(bad.len(), 1);
        assert!(bad[0].contains("25:00"));
        assert_eq!(result.scheduled.len(), 1);
    }

    #[test]
    fn test_many_items_over_weeks_fill_capacity() {
        let tasks: Vec<Task> = (0..3000)
            .map(|i| {
                let mut task = make_task(&format!("t{i:04}"), 5);
                task.importance = 1 + (i % 10) as i32;
                task.project_id = Some(format!("p{}", i % 7));
                task
            })
            .collect();
        let patterns = vec![DailyWorkPattern::template(vec![
            WorkBlock::new("am", "09:00", "12:00", BlockType::single("focused")),
            WorkBlock::new("pm", "13:00", "17:00", BlockType::single("focused")),
        ])];
        let mut opts = options();
        opts.end_date = Some(d(2025, 3, 28));

        let result = run(&tasks, &[], &patterns, &opts);

        // 20 weekdays of 7 hours, 84 five-minute slots a day
        assert_eq!(result.scheduled.len(), 20 * 84);
        assert_eq!(result.unscheduled.len(), 3000 - 20 * 84);
        assert!(result.unscheduled.iter().all(|u| u.reason == UnscheduledReason::NoCapacity));
        for pair in result.scheduled.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_empty_horizon() {
        let result = run(&[make_task("a", 30)], &[], &[], &options());
        assert!(result.scheduled.is_empty());
        assert_eq!(result.unscheduled[0].reason, UnscheduledReason::NoMatchingWorkType);
        assert!(result
            .debug_info
            .warnings
            .iter()
            .any(|w| w.contains("no work blocks")));
    }

    #[test]
    fn test_debug_mode_records_decisions() {
        let patterns = vec![focused_day(monday(), &[("b1", "09:00", "10:00")])];
        let mut opts = options();
        opts.debug_mode = true;

        let result = run(
            &[make_task("a", 40), make_task("b", 40)],
            &[],
            &patterns,
            &opts,
        );

        let metrics = result.metrics.as_ref().unwrap();
        assert_eq!(metrics.decisions.len(), result.scheduled.len());
        assert_eq!(metrics.decisions[0].item_id, "a");
        assert_eq!(metrics.decisions[0].candidates_beaten, 1);
        assert_eq!(metrics.average_priority, 25.0);
        assert!((metrics.utilization_rate - 1.0).abs() < 1e-9);
    }
}

//! Dependency levels, critical paths, and dependency validation.
//!
//! Step graphs come from user-edited data and may contain dangling ids and
//! cycles. Nothing here fails on either: dangling ids are dropped as already
//! satisfied, and a cycle is cut where the walk runs into a node it is still
//! visiting. `validate_dependencies` reports the same conditions for callers
//! that want to show them.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

use crate::interner::{IdInterner, NodeIndex};
use crate::models::{Step, Task, Workflow};

/// Step graph in arena form: steps are dense indices, edges are index lists.
#[derive(Debug, Clone)]
pub struct StepGraph {
    index: IdInterner,
    /// Active minutes plus async wait, indexed by node.
    weights: Vec<i64>,
    /// Resolvable dependencies in declared order, without duplicates.
    deps: Vec<Vec<NodeIndex>>,
    /// Reverse edges.
    dependents: Vec<Vec<NodeIndex>>,
    /// (step id, unknown dependency id) pairs that were dropped.
    dangling: Vec<(String, String)>,
}

/// Level of every node plus the nodes whose walk hit a cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphLevels {
    pub levels: Vec<u32>,
    pub cycle_nodes: Vec<NodeIndex>,
}

/// Longest chain of (duration + async wait) through a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// Step ids from entry to exit.
    pub path: Vec<String>,
    pub node_ids: FxHashSet<String>,
    /// Edges as "dependency->dependent".
    pub edge_ids: FxHashSet<String>,
    pub duration_minutes: i64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done(u32),
}

impl StepGraph {
    /// Build the graph. Later steps reusing an id already seen are ignored.
    pub fn new(steps: &[Step]) -> Self {
        let mut index = IdInterner::with_capacity(steps.len());
        let mut owners: Vec<&Step> = Vec::with_capacity(steps.len());
        for step in steps {
            if index.get(&step.id).is_none() {
                index.intern(&step.id);
                owners.push(step);
            }
        }

        let n = owners.len();
        let mut weights = vec![0; n];
        let mut deps: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
        let mut dangling = Vec::new();

        for (idx, step) in owners.iter().enumerate() {
            weights[idx] = step
                .duration_minutes
                .max(0)
                .saturating_add(step.async_wait_minutes.max(0));
            for dep_id in &step.depends_on {
                match index.get(dep_id) {
                    Some(dep) => {
                        if !deps[idx].contains(&dep) {
                            deps[idx].push(dep);
                            dependents[dep as usize].push(idx as NodeIndex);
                        }
                    }
                    None => dangling.push((step.id.clone(), dep_id.clone())),
                }
            }
        }

        Self {
            index,
            weights,
            deps,
            dependents,
            dangling,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn id_of(&self, node: NodeIndex) -> &str {
        self.index.resolve(node).unwrap_or_default()
    }

    pub fn dangling(&self) -> &[(String, String)] {
        &self.dangling
    }

    /// Topological level of every node.
    ///
    /// A node with no resolvable dependencies is level 0, otherwise one more than
    /// its deepest dependency. The walk keeps an explicit stack; a dependency
    /// that is still being visited counts as level 0, which ends the walk on
    /// cyclic input. Levels inside a cycle depend on visit order.
    pub fn levels(&self) -> GraphLevels {
        let n = self.len();
        let mut marks = vec![Mark::Unvisited; n];
        let mut cycle_nodes = Vec::new();

        for root in 0..n {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::Visiting;
            let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                if let Some(&dep) = self.deps[node].get(cursor) {
                    frame.1 += 1;
                    let dep = dep as usize;
                    if marks[dep] == Mark::Unvisited {
                        marks[dep] = Mark::Visiting;
                        stack.push((dep, 0));
                    }
                    continue;
                }

                let mut level = 0;
                let mut hit_cycle = false;
                for &dep in &self.deps[node] {
                    let dep_level = match marks[dep as usize] {
                        Mark::Done(l) => l + 1,
                        _ => {
                            hit_cycle = true;
                            1
                        }
                    };
                    level = level.max(dep_level);
                }
                if hit_cycle {
                    cycle_nodes.push(node as NodeIndex);
                }
                marks[node] = Mark::Done(level);
                stack.pop();
            }
        }

        let levels = marks
            .into_iter()
            .map(|m| match m {
                Mark::Done(l) => l,
                _ => 0,
            })
            .collect();

        GraphLevels {
            levels,
            cycle_nodes,
        }
    }

    /// Longest weighted path from an entry node to an exit node.
    ///
    /// Nodes are relaxed in (level, insertion) order and only edges from a lower
    /// level count, so cycles are cut the same way `levels` cuts them. Ties go to
    /// the earlier-inserted node.
    pub fn critical_path(&self) -> CriticalPath {
        let n = self.len();
        if n == 0 {
            return CriticalPath::default();
        }

        let levels = self.levels().levels;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| (levels[i], i));

        let mut dist = vec![0i64; n];
        let mut pred: Vec<Option<usize>> = vec![None; n];
        for &node in &order {
            let mut best: Option<(i64, usize)> = None;
            let mut candidates: Vec<usize> = self.deps[node]
                .iter()
                .map(|&d| d as usize)
                .filter(|&d| levels[d] < levels[node])
                .collect();
            candidates.sort_unstable();
            for dep in candidates {
                if best.map_or(true, |(d, _)| dist[dep] > d) {
                    best = Some((dist[dep], dep));
                }
            }
            dist[node] = self.weights[node].saturating_add(best.map_or(0, |(d, _)| d));
            pred[node] = best.map(|(_, dep)| dep);
        }

        let mut exits: Vec<usize> = (0..n).filter(|&i| self.dependents[i].is_empty()).collect();
        if exits.is_empty() {
            exits = (0..n).collect();
        }
        let mut end = exits[0];
        for &candidate in &exits[1..] {
            if dist[candidate] > dist[end] {
                end = candidate;
            }
        }

        let mut chain = vec![end];
        let mut cursor = end;
        while let Some(prev) = pred[cursor] {
            chain.push(prev);
            cursor = prev;
        }
        chain.reverse();

        let path: Vec<String> = chain
            .iter()
            .map(|&i| self.id_of(i as NodeIndex).to_string())
            .collect();
        let edge_ids = path
            .windows(2)
            .map(|pair| format!("{}->{}", pair[0], pair[1]))
            .collect();

        CriticalPath {
            node_ids: path.iter().cloned().collect(),
            edge_ids,
            path,
            duration_minutes: dist[end],
        }
    }
}

/// Topological level per step id. Terminates on cyclic input.
pub fn level_of(steps: &[Step]) -> FxHashMap<String, u32> {
    let graph = StepGraph::new(steps);
    let levels = graph.levels().levels;
    levels
        .into_iter()
        .enumerate()
        .map(|(i, level)| (graph.id_of(i as NodeIndex).to_string(), level))
        .collect()
}

/// Critical path of a workflow's steps.
pub fn critical_path(steps: &[Step]) -> CriticalPath {
    StepGraph::new(steps).critical_path()
}

/// A problem in a dependency graph.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyError {
    #[error("{item_id} depends on unknown id {missing_id}")]
    Dangling { item_id: String, missing_id: String },
    #[error("{item_id} depends on itself")]
    SelfDependency { item_id: String },
    #[error("circular dependency among: {}", .members.join(", "))]
    Circular { members: Vec<String> },
}

/// One entry of a validation report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub description: String,
    pub error: DependencyError,
}

impl From<DependencyError> for ValidationIssue {
    fn from(error: DependencyError) -> Self {
        Self {
            description: error.to_string(),
            error,
        }
    }
}

/// Result of a dependency pre-flight check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
}

/// Check task dependencies for dangling ids, self references and cycles.
///
/// Advisory only: the scheduler tolerates everything reported here.
pub fn validate_dependencies(tasks: &[Task]) -> ValidationReport {
    validate_graph(tasks.iter().map(|t| (t.id.as_str(), t.dependencies.as_slice())))
}

/// Same check for the steps of one workflow.
pub fn validate_workflow(workflow: &Workflow) -> ValidationReport {
    validate_graph(
        workflow
            .steps
            .iter()
            .map(|s| (s.id.as_str(), s.depends_on.as_slice())),
    )
}

fn validate_graph<'a>(items: impl Iterator<Item = (&'a str, &'a [String])>) -> ValidationReport {
    let items: Vec<(&str, &[String])> = items.collect();
    let mut index = IdInterner::with_capacity(items.len());
    for (id, _) in &items {
        index.intern(id);
    }

    let n = index.len();
    let mut deps: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
    let mut errors: Vec<ValidationIssue> = Vec::new();

    for (id, item_deps) in &items {
        let Some(node) = index.get(id) else {
            continue;
        };
        for dep_id in item_deps.iter() {
            match index.get(dep_id) {
                Some(dep) if dep == node => errors.push(
                    DependencyError::SelfDependency {
                        item_id: id.to_string(),
                    }
                    .into(),
                ),
                Some(dep) => {
                    if !deps[node as usize].contains(&dep) {
                        deps[node as usize].push(dep);
                    }
                }
                None => errors.push(
                    DependencyError::Dangling {
                        item_id: id.to_string(),
                        missing_id: dep_id.clone(),
                    }
                    .into(),
                ),
            }
        }
    }

    let members = cycle_members(&deps);
    if !members.is_empty() {
        errors.push(
            DependencyError::Circular {
                members: members
                    .into_iter()
                    .filter_map(|m| index.resolve(m).map(str::to_string))
                    .collect(),
            }
            .into(),
        );
    }

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Nodes that lie on a cycle or between cycles, in insertion order.
///
/// Kahn's algorithm peels off nodes with no unresolved dependencies; a second
/// pass in the other direction peels off nodes that merely hang off a cycle.
fn cycle_members(deps: &[Vec<NodeIndex>]) -> Vec<NodeIndex> {
    let n = deps.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (node, node_deps) in deps.iter().enumerate() {
        for &dep in node_deps {
            dependents[dep as usize].push(node);
        }
    }

    let mut alive = vec![true; n];
    let mut pending_deps: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| pending_deps[i] == 0).collect();
    while let Some(node) = queue.pop_front() {
        alive[node] = false;
        for &dependent in &dependents[node] {
            pending_deps[dependent] -= 1;
            if pending_deps[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    let mut pending_dependents: Vec<usize> = (0..n)
        .map(|i| dependents[i].iter().filter(|&&d| alive[d]).count())
        .collect();
    let mut queue: VecDeque<usize> = (0..n)
        .filter(|&i| alive[i] && pending_dependents[i] == 0)
        .collect();
    while let Some(node) = queue.pop_front() {
        alive[node] = false;
        for &dep in &deps[node] {
            let dep = dep as usize;
            if alive[dep] {
                pending_dependents[dep] -= 1;
                if pending_dependents[dep] == 0 {
                    queue.push_back(dep);
                }
            }
        }
    }

    (0..n)
        .filter(|&i| alive[i])
        .map(|i| i as NodeIndex)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_step(id: &str, duration: i64, deps: &[&str]) -> Step {
        let mut step = Step::new(id, "wf", id, duration, "focused");
        step.depends_on = deps.iter().map(|d| d.to_string()).collect();
        step
    }

    fn make_task(id: &str, deps: &[&str]) -> Task {
        let mut task = Task::new(id, id, 30, "admin");
        task.dependencies = deps.iter().map(|d| d.to_string()).collect();
        task
    }

    #[test]
    fn test_levels_of_chain() {
        let steps = vec![
            make_step("a", 30, &[]),
            make_step("b", 30, &["a"]),
            make_step("c", 30, &["b"]),
        ];
        let levels = level_of(&steps);
        assert_eq!(levels["a"], 0);
        assert_eq!(levels["b"], 1);
        assert_eq!(levels["c"], 2);
    }

    #[test]
    fn test_levels_take_deepest_dependency() {
        let steps = vec![
            make_step("a", 10, &[]),
            make_step("b", 10, &["a"]),
            make_step("c", 10, &[]),
            make_step("d", 10, &["c", "b"]),
        ];
        let levels = level_of(&steps);
        assert_eq!(levels["d"], 2);
        assert_eq!(levels["c"], 0);
    }

    #[test]
    fn test_dangling_dependency_is_ignored() {
        let steps = vec![make_step("a", 10, &["ghost"]), make_step("b", 10, &["a"])];
        let graph = StepGraph::new(&steps);
        assert_eq!(graph.dangling(), &[("a".to_string(), "ghost".to_string())]);
        let levels = level_of(&steps);
        assert_eq!(levels["a"], 0);
        assert_eq!(levels["b"], 1);
    }

    #[test]
    fn test_two_cycle_terminates() {
        let steps = vec![make_step("a", 10, &["b"]), make_step("b", 10, &["a"])];
        let graph = StepGraph::new(&steps);
        let result = graph.levels();
        assert_eq!(result.levels.len(), 2);
        assert!(!result.cycle_nodes.is_empty());

        let levels = level_of(&steps);
        assert!(levels.contains_key("a"));
        assert!(levels.contains_key("b"));
    }

    #[test]
    fn test_self_cycle_terminates() {
        let steps = vec![make_step("a", 10, &["a"])];
        let result = StepGraph::new(&steps).levels();
        assert_eq!(result.levels, vec![1]);
        assert_eq!(result.cycle_nodes, vec![0]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut steps = vec![make_step("s0", 1, &[])];
        for i in 1..20_000 {
            let prev = format!("s{}", i - 1);
            steps.push(make_step(&format!("s{i}"), 1, &[prev.as_str()]));
        }
        let levels = level_of(&steps);
        assert_eq!(levels["s19999"], 19_999);
    }

    #[test]
    fn test_critical_path_saturates_on_huge_weights() {
        let mut first = make_step("first", i64::MAX, &[]);
        first.async_wait_minutes = i64::MAX;
        let steps = vec![first, make_step("second", i64::MAX, &["first"])];
        let cp = critical_path(&steps);
        assert_eq!(cp.duration_minutes, i64::MAX);
        assert_eq!(cp.path, vec!["first", "second"]);
    }

    #[test]
    fn test_critical_path_includes_async_wait() {
        let mut slow = make_step("review", 10, &["draft"]);
        slow.async_wait_minutes = 120;
        let steps = vec![
            make_step("draft", 30, &[]),
            slow,
            make_step("polish", 60, &["draft"]),
            make_step("publish", 15, &["review", "polish"]),
        ];
        let cp = critical_path(&steps);
        assert_eq!(cp.path, vec!["draft", "review", "publish"]);
        assert_eq!(cp.duration_minutes, 30 + 130 + 15);
        assert!(cp.edge_ids.contains("draft->review"));
        assert!(cp.edge_ids.contains("review->publish"));
        assert!(!cp.node_ids.contains("polish"));
    }

    #[test]
    fn test_critical_path_tie_prefers_insertion_order() {
        let steps = vec![
            make_step("a", 30, &[]),
            make_step("b", 30, &[]),
            make_step("c", 10, &["b", "a"]),
        ];
        let cp = critical_path(&steps);
        assert_eq!(cp.path, vec!["a", "c"]);
        assert_eq!(cp.duration_minutes, 40);
    }

    #[test]
    fn test_critical_path_of_independent_steps() {
        let steps = vec![make_step("a", 20, &[]), make_step("b", 45, &[])];
        let cp = critical_path(&steps);
        assert_eq!(cp.path, vec!["b"]);
        assert_eq!(cp.duration_minutes, 45);
        assert!(cp.edge_ids.is_empty());
    }

    #[test]
    fn test_critical_path_on_cycle_is_finite() {
        let steps = vec![make_step("a", 10, &["b"]), make_step("b", 20, &["a"])];
        let cp = critical_path(&steps);
        assert!(cp.duration_minutes >= 20);
        assert!(cp.duration_minutes <= 30);
    }

    #[test]
    fn test_critical_path_empty() {
        let cp = critical_path(&[]);
        assert_eq!(cp.duration_minutes, 0);
        assert!(cp.path.is_empty());
    }

    #[test]
    fn test_validate_clean_graph() {
        let tasks = vec![make_task("a", &[]), make_task("b", &["a"])];
        let report = validate_dependencies(&tasks);
        assert!(report.is_valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_validate_reports_dangling_and_self() {
        let tasks = vec![make_task("a", &["nope"]), make_task("b", &["b"])];
        let report = validate_dependencies(&tasks);
        assert!(!report.is_valid);
        assert_eq!(report.errors.len(), 2);
        assert_eq!(report.errors[0].description, "a depends on unknown id nope");
        assert_eq!(report.errors[1].description, "b depends on itself");
    }

    #[test]
    fn test_validate_reports_cycle_members_only() {
        // c hangs off the cycle and d feeds into it; neither is part of it
        let tasks = vec![
            make_task("d", &[]),
            make_task("a", &["b", "d"]),
            make_task("b", &["a"]),
            make_task("c", &["a"]),
        ];
        let report = validate_dependencies(&tasks);
        assert!(!report.is_valid);
        assert_eq!(
            report.errors[0].error,
            DependencyError::Circular {
                members: vec!["a".to_string(), "b".to_string()]
            }
        );
        assert_eq!(report.errors[0].description, "circular dependency among: a, b");
    }

    #[test]
    fn test_validate_workflow_steps() {
        let workflow = Workflow::new(
            Task::new("wf", "Workflow", 0, "focused"),
            vec![make_step("x", 10, &["y"]), make_step("y", 10, &["x"])],
        );
        let report = validate_workflow(&workflow);
        assert!(!report.is_valid);
        assert!(matches!(report.errors[0].error, DependencyError::Circular { .. }));
    }
}

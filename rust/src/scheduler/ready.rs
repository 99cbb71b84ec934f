//! Ready items of one day, kept in priority order.
//!
//! Scores are stored as computed with no previous item, so without the
//! context-switch penalty. The penalty is the same for everything outside the
//! last placed item's group, which leaves two contenders for the top spot:
//! the overall leader and the leader of that group.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use crate::priority::{LastScheduled, Priority, PriorityKey};

type Slot = (PriorityKey, usize);

#[derive(Clone, Debug)]
struct Queued {
    key: PriorityKey,
    group: Option<String>,
    priority: Priority,
}

/// Pool indices ordered by `PriorityKey`, with a per-group index.
#[derive(Clone, Debug, Default)]
pub struct ReadyQueue {
    all: BTreeSet<Slot>,
    by_group: FxHashMap<Option<String>, BTreeSet<Slot>>,
    entries: FxHashMap<usize, Queued>,
}

impl ReadyQueue {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.entries.contains_key(&idx)
    }

    /// Add or rescore `idx`. `priority` must carry no context-switch penalty.
    pub fn insert(&mut self, idx: usize, id: &str, group: Option<&str>, priority: Priority) {
        self.remove(idx);
        let key = PriorityKey::new(priority.total, id);
        let group = group.map(str::to_string);
        self.all.insert((key.clone(), idx));
        self.by_group
            .entry(group.clone())
            .or_default()
            .insert((key.clone(), idx));
        self.entries.insert(
            idx,
            Queued {
                key,
                group,
                priority,
            },
        );
    }

    pub fn remove(&mut self, idx: usize) -> bool {
        let Some(queued) = self.entries.remove(&idx) else {
            return false;
        };
        let slot = (queued.key, idx);
        self.all.remove(&slot);
        if let Some(set) = self.by_group.get_mut(&queued.group) {
            set.remove(&slot);
            if set.is_empty() {
                self.by_group.remove(&queued.group);
            }
        }
        true
    }

    /// Top candidate after charging `penalty` to items outside `last`'s group.
    pub fn best(&self, last: Option<&LastScheduled>, penalty: f64) -> Option<(usize, Priority)> {
        let &(_, top) = self.all.first()?;
        let leader = self.entries.get(&top)?;
        let Some(last) = last else {
            return Some((top, leader.priority.clone()));
        };
        if leader.group == last.group {
            return Some((top, leader.priority.clone()));
        }

        let charged = with_penalty(&leader.priority, penalty);
        let insider = self
            .by_group
            .get(&last.group)
            .and_then(BTreeSet::first)
            .and_then(|&(_, idx)| self.entries.get(&idx).map(|queued| (idx, queued)));

        match insider {
            Some((idx, queued))
                if queued.key < PriorityKey::new(charged.total, leader.key.id.as_str()) =>
            {
                Some((idx, queued.priority.clone()))
            }
            _ => Some((top, charged)),
        }
    }
}

fn with_penalty(priority: &Priority, penalty: f64) -> Priority {
    let mut charged = priority.clone();
    charged.breakdown.context_switch_penalty = -penalty;
    charged.total += -penalty;
    charged
}

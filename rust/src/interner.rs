//! String interning for dependency graphs.
//!
//! Maps step and task ids to dense integer indices so graph walks work on
//! flat vectors instead of string-keyed maps.

use rustc_hash::FxHashMap;

/// Dense index of an interned id.
pub type NodeIndex = u32;

/// Maps id strings to dense indices in insertion order.
#[derive(Debug, Clone, Default)]
pub struct IdInterner {
    to_index: FxHashMap<String, NodeIndex>,
    from_index: Vec<String>,
}

impl IdInterner {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            to_index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            from_index: Vec::with_capacity(capacity),
        }
    }

    /// Intern an id, returning its index. Repeated ids keep their first index.
    pub fn intern(&mut self, id: &str) -> NodeIndex {
        if let Some(&index) = self.to_index.get(id) {
            return index;
        }
        let index = self.from_index.len() as NodeIndex;
        self.from_index.push(id.to_string());
        self.to_index.insert(id.to_string(), index);
        index
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<NodeIndex> {
        self.to_index.get(id).copied()
    }

    #[inline]
    pub fn resolve(&self, index: NodeIndex) -> Option<&str> {
        self.from_index.get(index as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.from_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from_index.is_empty()
    }
}

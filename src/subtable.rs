//! Unique table: one hash map per level.
//!
//! Since every node of a level has the same variable, a subtable is keyed by
//! the `(high, low)` children only. Together the subtables map each triple
//! `(level, high, low)` to at most one node (hash consing).

use std::collections::HashMap;

use crate::reference::Ref;
use crate::types::Level;

/// Nodes of a single level.
#[derive(Debug, Clone, Default)]
pub struct Subtable {
    nodes: HashMap<(Ref, Ref), Ref>,
}

impl Subtable {
    pub fn find(&self, high: Ref, low: Ref) -> Option<Ref> {
        self.nodes.get(&(high, low)).copied()
    }

    pub fn insert(&mut self, high: Ref, low: Ref, node: Ref) {
        let old = self.nodes.insert((high, low), node);
        debug_assert!(old.is_none(), "duplicate node for ({}, {})", high, low);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove every node for which `alive` is false and return the removed ones.
    pub fn sweep(&mut self, alive: impl Fn(Ref) -> bool) -> Vec<Ref> {
        let mut dead = Vec::new();
        self.nodes.retain(|_, &mut node| {
            let keep = alive(node);
            if !keep {
                dead.push(node);
            }
            keep
        });
        dead
    }
}

#[derive(Debug, Default)]
pub struct UniqueTable {
    subtables: Vec<Subtable>,
}

impl UniqueTable {
    /// Make room for nodes at `level`.
    pub fn add_level(&mut self, level: Level) {
        if self.subtables.len() <= level.index() {
            self.subtables.resize_with(level.index() + 1, Subtable::default);
        }
    }

    pub fn find(&self, level: Level, high: Ref, low: Ref) -> Option<Ref> {
        self.subtables[level.index()].find(high, low)
    }

    pub fn insert(&mut self, level: Level, high: Ref, low: Ref, node: Ref) {
        self.subtables[level.index()].insert(high, low, node);
    }

    /// Total number of live nodes, leaves excluded.
    pub fn len(&self) -> usize {
        self.subtables.iter().map(Subtable::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.subtables.iter().all(Subtable::is_empty)
    }

    pub fn sweep(&mut self, alive: impl Fn(Ref) -> bool) -> Vec<Ref> {
        self.subtables
            .iter_mut()
            .flat_map(|subtable| subtable.sweep(&alive))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_insert() {
        let mut table = UniqueTable::default();
        table.add_level(Level::new(1));

        assert!(table.find(Level::new(1), Ref::ONE, Ref::ZERO).is_none());
        table.insert(Level::new(1), Ref::ONE, Ref::ZERO, Ref::new(2));
        assert_eq!(table.find(Level::new(1), Ref::ONE, Ref::ZERO), Some(Ref::new(2)));
        assert!(table.find(Level::new(0), Ref::ONE, Ref::ZERO).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sweep() {
        let mut table = UniqueTable::default();
        table.add_level(Level::new(0));
        table.insert(Level::new(0), Ref::ONE, Ref::ZERO, Ref::new(2));
        table.insert(Level::new(0), Ref::ZERO, Ref::ONE, Ref::new(3));

        let dead = table.sweep(|r| r == Ref::new(3));
        assert_eq!(dead, vec![Ref::new(2)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.find(Level::new(0), Ref::ZERO, Ref::ONE), Some(Ref::new(3)));
    }
}

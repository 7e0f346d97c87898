use std::cmp::min;

use crate::node::Node;
use crate::reference::Ref;

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    occupied: bool,
}

/// Arena of nodes indexed by [`Ref`].
///
/// Slots 0 and 1 hold the two leaves and are never freed. Freed slots are
/// handed out again by [`Storage::alloc`], lowest index first.
#[derive(Debug)]
pub struct Storage {
    data: Vec<Slot>,
    /// Index of the first *possibly* free (non-occupied) slot.
    min_free: usize,
    /// Number of occupied slots.
    real_size: usize,
}

impl Storage {
    pub fn new(capacity: usize) -> Self {
        let mut data = Vec::with_capacity(capacity.max(2));
        data.push(Slot {
            node: Node::Leaf(false),
            occupied: true,
        });
        data.push(Slot {
            node: Node::Leaf(true),
            occupied: true,
        });
        Self {
            data,
            min_free: 2,
            real_size: 2,
        }
    }

    /// Number of slots ever allocated (occupied or not).
    pub fn size(&self) -> usize {
        self.data.len()
    }
    /// Number of occupied slots, leaves included.
    pub fn real_size(&self) -> usize {
        self.real_size
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.data.get(index).map_or(false, |slot| slot.occupied)
    }

    pub fn node(&self, r: Ref) -> &Node {
        let slot = &self.data[r.index()];
        assert!(slot.occupied, "Slot {} is not occupied", r);
        &slot.node
    }

    /// Store a node in the first free slot and return its handle.
    pub fn alloc(&mut self, node: Node) -> Ref {
        let index = (self.min_free..self.data.len())
            .find(|&i| !self.data[i].occupied)
            .unwrap_or(self.data.len());

        let slot = Slot {
            node,
            occupied: true,
        };
        if index == self.data.len() {
            self.data.push(slot);
        } else {
            self.data[index] = slot;
        }
        self.min_free = index + 1;
        self.real_size += 1;

        Ref::new(index as u32)
    }

    /// Release the slot of a collected node.
    pub fn free(&mut self, r: Ref) {
        assert!(!r.is_leaf(), "Leaves are never freed");
        let slot = &mut self.data[r.index()];
        assert!(slot.occupied, "Double free of {}", r);

        slot.occupied = false;
        self.min_free = min(self.min_free, r.index());
        self.real_size -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaves_preallocated() {
        let storage = Storage::new(8);
        assert_eq!(storage.real_size(), 2);
        assert_eq!(*storage.node(Ref::ZERO), Node::Leaf(false));
        assert_eq!(*storage.node(Ref::ONE), Node::Leaf(true));
    }

    #[test]
    fn test_alloc_and_reuse() {
        let mut storage = Storage::new(8);
        let a = storage.alloc(Node::Leaf(true));
        let b = storage.alloc(Node::Leaf(true));
        assert_eq!(a, Ref::new(2));
        assert_eq!(b, Ref::new(3));

        storage.free(a);
        assert!(!storage.is_occupied(2));
        assert_eq!(storage.real_size(), 3);

        let c = storage.alloc(Node::Leaf(false));
        assert_eq!(c, a);
        assert_eq!(storage.size(), 4);
    }

    #[test]
    #[should_panic(expected = "Leaves are never freed")]
    fn test_free_leaf_panics() {
        let mut storage = Storage::new(8);
        storage.free(Ref::ONE);
    }
}

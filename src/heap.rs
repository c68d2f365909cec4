//! Addressable query heap.
//!
//! A 4-ary min-heap keyed by tentative weight with one slot per graph node.
//! Slots are version-stamped so clearing between searches is O(1) instead of
//! an O(N) fill, and a settled node keeps its key and data readable for the
//! path-retrieval walk after `delete_min` removed it from the heap array.

use crate::types::{EdgeDuration, EdgeWeight, NodeId};

/// Per-node annotation carried next to the heap key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapData {
    pub parent: NodeId,
    /// Set when the edge that produced this entry was a cell shortcut; the
    /// next relaxation of this node must not emit shortcuts again.
    pub from_clique_arc: bool,
    pub duration: EdgeDuration,
}

/// Slot position marking a node that has been settled by `delete_min`.
const SETTLED: u32 = u32::MAX;

#[derive(Clone, Copy)]
struct NodeSlot {
    key: EdgeWeight,
    data: HeapData,
    position: u32,
    version: u32,
}

const EMPTY_SLOT: NodeSlot = NodeSlot {
    key: 0,
    data: HeapData {
        parent: 0,
        from_clique_arc: false,
        duration: 0,
    },
    position: 0,
    version: 0,
};

pub struct QueryHeap {
    slots: Vec<NodeSlot>,
    heap: Vec<NodeId>,
    version: u32,
}

impl QueryHeap {
    pub fn new() -> Self {
        QueryHeap {
            slots: Vec::new(),
            heap: Vec::new(),
            version: 0,
        }
    }

    /// Start a fresh search over `num_nodes` nodes. `capacity_hint` bounds
    /// the expected live heap size (typically the border-node count).
    pub fn clear(&mut self, num_nodes: u32, capacity_hint: u32) {
        if self.slots.len() < num_nodes as usize {
            self.slots.resize(num_nodes as usize, EMPTY_SLOT);
        }
        self.version = self.version.wrapping_add(1);
        if self.version == 0 {
            // Version wrapped; stamp everything stale once.
            for slot in &mut self.slots {
                slot.version = 0;
            }
            self.version = 1;
        }
        self.heap.clear();
        self.heap.reserve(capacity_hint as usize);
    }

    #[inline]
    pub fn empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// True once `node` has been inserted in the current search, settled or
    /// not.
    #[inline]
    pub fn was_inserted(&self, node: NodeId) -> bool {
        self.slots[node as usize].version == self.version
    }

    #[inline]
    pub fn get_key(&self, node: NodeId) -> EdgeWeight {
        debug_assert!(self.was_inserted(node));
        self.slots[node as usize].key
    }

    #[inline]
    pub fn get_data(&self, node: NodeId) -> HeapData {
        debug_assert!(self.was_inserted(node));
        self.slots[node as usize].data
    }

    #[inline]
    pub fn get_data_mut(&mut self, node: NodeId) -> &mut HeapData {
        debug_assert!(self.was_inserted(node));
        &mut self.slots[node as usize].data
    }

    pub fn insert(&mut self, node: NodeId, key: EdgeWeight, data: HeapData) {
        debug_assert!(!self.was_inserted(node));
        let position = self.heap.len() as u32;
        self.slots[node as usize] = NodeSlot {
            key,
            data,
            position,
            version: self.version,
        };
        self.heap.push(node);
        self.sift_up(position as usize);
    }

    /// Lower `node`'s key. A settled node only has its stored key updated:
    /// it is never re-expanded, but later annotation reads see the better
    /// value.
    pub fn decrease_key(&mut self, node: NodeId, key: EdgeWeight) {
        debug_assert!(self.was_inserted(node));
        debug_assert!(key <= self.slots[node as usize].key);
        let slot = &mut self.slots[node as usize];
        slot.key = key;
        let position = slot.position;
        if position != SETTLED {
            self.sift_up(position as usize);
        }
    }

    /// Remove and return the node with the minimal key. Its key and data
    /// stay readable.
    pub fn delete_min(&mut self) -> NodeId {
        debug_assert!(!self.heap.is_empty());
        let min = self.heap[0];
        let last = self.heap.pop().expect("heap not empty");
        if !self.heap.is_empty() {
            self.heap[0] = last;
            self.slots[last as usize].position = 0;
            self.sift_down(0);
        }
        self.slots[min as usize].position = SETTLED;
        min
    }

    #[inline]
    fn key_at(&self, heap_index: usize) -> EdgeWeight {
        self.slots[self.heap[heap_index] as usize].key
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 4;
            if self.key_at(parent) <= self.key_at(index) {
                break;
            }
            self.swap_heap(parent, index);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        loop {
            let first_child = index * 4 + 1;
            if first_child >= self.heap.len() {
                break;
            }
            let last_child = (first_child + 4).min(self.heap.len());
            let mut smallest = index;
            for child in first_child..last_child {
                if self.key_at(child) < self.key_at(smallest) {
                    smallest = child;
                }
            }
            if smallest == index {
                break;
            }
            self.swap_heap(index, smallest);
            index = smallest;
        }
    }

    #[inline]
    fn swap_heap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots[self.heap[a] as usize].position = a as u32;
        self.slots[self.heap[b] as usize].position = b as u32;
    }
}

impl Default for QueryHeap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(parent: NodeId, duration: EdgeDuration) -> HeapData {
        HeapData {
            parent,
            from_clique_arc: false,
            duration,
        }
    }

    #[test]
    fn delete_min_orders_by_key() {
        let mut heap = QueryHeap::new();
        heap.clear(8, 8);
        heap.insert(3, 30, data(3, 30));
        heap.insert(1, 10, data(1, 10));
        heap.insert(2, 20, data(2, 20));
        heap.insert(5, -5, data(5, -5));

        assert_eq!(heap.delete_min(), 5);
        assert_eq!(heap.delete_min(), 1);
        assert_eq!(heap.delete_min(), 2);
        assert_eq!(heap.delete_min(), 3);
        assert!(heap.empty());
    }

    #[test]
    fn settled_nodes_stay_readable() {
        let mut heap = QueryHeap::new();
        heap.clear(4, 4);
        heap.insert(0, 7, data(0, 9));

        assert_eq!(heap.delete_min(), 0);
        assert!(heap.was_inserted(0));
        assert_eq!(heap.get_key(0), 7);
        assert_eq!(heap.get_data(0).duration, 9);
    }

    #[test]
    fn decrease_key_reorders() {
        let mut heap = QueryHeap::new();
        heap.clear(4, 4);
        heap.insert(0, 10, data(0, 10));
        heap.insert(1, 20, data(1, 20));
        heap.decrease_key(1, 5);

        assert_eq!(heap.delete_min(), 1);
        assert_eq!(heap.get_key(1), 5);
        assert_eq!(heap.delete_min(), 0);
    }

    #[test]
    fn clear_resets_in_constant_observable_state() {
        let mut heap = QueryHeap::new();
        heap.clear(4, 4);
        heap.insert(2, 1, data(2, 1));
        assert_eq!(heap.delete_min(), 2);

        heap.clear(4, 4);
        assert!(heap.empty());
        assert!(!heap.was_inserted(2));
    }
}

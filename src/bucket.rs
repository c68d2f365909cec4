//! Bucket store for the bidirectional engine.
//!
//! One flat vector, filled during the per-target backward searches, sorted
//! once, then probed with binary-search equal ranges during the forward
//! sweep. Entries are unique per `(node, column)` because a backward search
//! settles each node at most once.

use crate::types::{EdgeDuration, EdgeWeight, NodeId};

#[derive(Debug, Clone, Copy)]
pub struct NodeBucket {
    pub node: NodeId,
    pub parent: NodeId,
    pub from_clique_arc: bool,
    /// Target column this bucket belongs to.
    pub column: u32,
    pub weight: EdgeWeight,
    pub duration: EdgeDuration,
}

#[derive(Debug, Default)]
pub struct BucketStore {
    items: Vec<NodeBucket>,
    sorted: bool,
}

impl BucketStore {
    pub fn new() -> Self {
        BucketStore::default()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.sorted = false;
    }

    #[inline]
    pub fn push(&mut self, bucket: NodeBucket) {
        debug_assert!(!self.sorted);
        self.items.push(bucket);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }

    pub fn sort(&mut self) {
        self.items.sort_unstable_by_key(|b| (b.node, b.column));
        self.sorted = true;
    }

    /// All buckets for `node`, in ascending column order.
    #[inline]
    pub fn range(&self, node: NodeId) -> &[NodeBucket] {
        debug_assert!(self.sorted);
        let start = self.items.partition_point(|b| b.node < node);
        let end = start + self.items[start..].partition_point(|b| b.node == node);
        &self.items[start..end]
    }

    /// The unique bucket for `(node, column)`, if the backward search for
    /// `column` settled `node`.
    pub fn find(&self, node: NodeId, column: u32) -> Option<&NodeBucket> {
        let range = self.range(node);
        let index = range.partition_point(|b| b.column < column);
        let found = range.get(index).filter(|b| b.column == column);
        debug_assert!(range
            .get(index + 1)
            .map_or(true, |b| b.column != column));
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(node: NodeId, column: u32, weight: EdgeWeight) -> NodeBucket {
        NodeBucket {
            node,
            parent: node,
            from_clique_arc: false,
            column,
            weight,
            duration: weight,
        }
    }

    #[test]
    fn equal_range_by_node() {
        let mut store = BucketStore::new();
        store.push(bucket(5, 1, 10));
        store.push(bucket(3, 0, 7));
        store.push(bucket(5, 0, 12));
        store.sort();

        let range = store.range(5);
        assert_eq!(range.len(), 2);
        assert_eq!((range[0].column, range[0].weight), (0, 12));
        assert_eq!((range[1].column, range[1].weight), (1, 10));
        assert!(store.range(4).is_empty());
    }

    #[test]
    fn find_by_node_and_column() {
        let mut store = BucketStore::new();
        store.push(bucket(2, 3, 4));
        store.push(bucket(2, 1, 9));
        store.sort();

        assert_eq!(store.find(2, 1).map(|b| b.weight), Some(9));
        assert_eq!(store.find(2, 3).map(|b| b.weight), Some(4));
        assert!(store.find(2, 2).is_none());
        assert!(store.find(7, 1).is_none());
    }
}

//! Per-worker mutable search state.
//!
//! The facade is shared read-only across workers; everything a query
//! mutates lives here. One instance per worker thread, cleared (version
//! bumped, not zeroed) at the start of each query and each source row.

use crate::heap::QueryHeap;

pub struct EngineWorkingData {
    pub(crate) query_heap: QueryHeap,
    /// Scratch heap for expanding clique arcs during distance annotation.
    pub(crate) unpack_heap: QueryHeap,
}

impl EngineWorkingData {
    pub fn new() -> Self {
        EngineWorkingData {
            query_heap: QueryHeap::new(),
            unpack_heap: QueryHeap::new(),
        }
    }

    /// Reset the main query heap for a search over `num_nodes` nodes.
    /// `num_border_nodes` hints the live heap size: away from the endpoints
    /// the search only touches boundary nodes.
    pub(crate) fn clear_query_heap(&mut self, num_nodes: u32, num_border_nodes: u32) {
        self.query_heap.clear(num_nodes, num_border_nodes);
    }
}

impl Default for EngineWorkingData {
    fn default() -> Self {
        Self::new()
    }
}

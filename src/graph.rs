//! Read-only facade over the compiled routing graph.
//!
//! Adjacency is CSR with each node's edges sorted by descending
//! highest-different-level towards the edge target, so the border edges at
//! any level form a prefix of the node's adjacency and
//! [`GraphFacade::border_edge_range`] is a single slice lookup.
//!
//! Every directed relationship is stored from both endpoints: a road u -> v
//! appears in u's adjacency with `forward` set and in v's adjacency with
//! `backward` set, which lets one CSR serve both search directions.

use crate::cells::{CellMetric, CellStorage, CellView};
use crate::partition::MultiLevelPartition;
use crate::types::{CellId, EdgeDistance, EdgeDuration, EdgeId, EdgeWeight, LevelId, NodeId};

#[derive(Debug, Clone, Copy)]
pub struct EdgeData {
    pub weight: EdgeWeight,
    pub duration: EdgeDuration,
    pub forward: bool,
    pub backward: bool,
}

#[derive(Debug, Clone)]
pub struct GraphFacade {
    num_nodes: u32,
    max_border_node_id: u32,
    /// CSR offsets, `num_nodes + 1` entries.
    edge_offsets: Vec<u32>,
    edge_targets: Vec<NodeId>,
    edge_data: Vec<EdgeData>,
    /// `border_ends[node * num_levels + level]` = number of adjacent edges
    /// whose highest-different-level is at least `level` (a prefix length).
    border_ends: Vec<u32>,
    num_levels: usize,
    /// Geometric length of the segment each node represents.
    node_distances: Vec<EdgeDistance>,
    /// One bit per node; set bits are excluded by the active profile.
    exclude_mask: Vec<u64>,
    partition: MultiLevelPartition,
    cell_storage: CellStorage,
    cell_metric: CellMetric,
}

impl GraphFacade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        num_nodes: u32,
        edge_offsets: Vec<u32>,
        edge_targets: Vec<NodeId>,
        edge_data: Vec<EdgeData>,
        border_ends: Vec<u32>,
        node_distances: Vec<EdgeDistance>,
        exclude_mask: Vec<u64>,
        partition: MultiLevelPartition,
        cell_storage: CellStorage,
        cell_metric: CellMetric,
    ) -> Self {
        let num_levels = partition.number_of_levels() as usize;
        debug_assert_eq!(edge_offsets.len(), num_nodes as usize + 1);
        debug_assert_eq!(edge_targets.len(), edge_data.len());
        debug_assert_eq!(border_ends.len(), num_nodes as usize * num_levels);

        // Highest node incident to any level >= 1 border edge; sizes the
        // working-set capacity hints.
        let mut max_border_node_id = 0u32;
        if num_levels > 1 {
            for node in 0..num_nodes {
                let borders = border_ends[node as usize * num_levels + 1];
                if borders > 0 {
                    max_border_node_id = max_border_node_id.max(node);
                    let start = edge_offsets[node as usize] as usize;
                    for &target in &edge_targets[start..start + borders as usize] {
                        max_border_node_id = max_border_node_id.max(target);
                    }
                }
            }
        }

        GraphFacade {
            num_nodes,
            max_border_node_id,
            edge_offsets,
            edge_targets,
            edge_data,
            border_ends,
            num_levels,
            node_distances,
            exclude_mask,
            partition,
            cell_storage,
            cell_metric,
        }
    }

    #[inline]
    pub fn number_of_nodes(&self) -> u32 {
        self.num_nodes
    }

    #[inline]
    pub fn max_border_node_id(&self) -> u32 {
        self.max_border_node_id
    }

    /// All edges incident to `node`, both directions.
    #[inline]
    pub fn adjacent_edge_range(&self, node: NodeId) -> std::ops::Range<EdgeId> {
        self.edge_offsets[node as usize]..self.edge_offsets[node as usize + 1]
    }

    /// Edges of `node` crossing a cell boundary at `level`. Level 0 is the
    /// full adjacency.
    #[inline]
    pub fn border_edge_range(&self, level: LevelId, node: NodeId) -> std::ops::Range<EdgeId> {
        let start = self.edge_offsets[node as usize];
        let len = self.border_ends[node as usize * self.num_levels + level as usize];
        start..start + len
    }

    #[inline]
    pub fn edge_data(&self, edge: EdgeId) -> &EdgeData {
        &self.edge_data[edge as usize]
    }

    #[inline]
    pub fn target(&self, edge: EdgeId) -> NodeId {
        self.edge_targets[edge as usize]
    }

    #[inline]
    pub fn exclude_node(&self, node: NodeId) -> bool {
        self.exclude_mask[node as usize >> 6] & (1u64 << (node & 63)) != 0
    }

    /// Geometric length of the segment `node` represents.
    #[inline]
    pub fn node_distance(&self, node: NodeId) -> EdgeDistance {
        self.node_distances[node as usize]
    }

    #[inline]
    pub fn partition(&self) -> &MultiLevelPartition {
        &self.partition
    }

    /// Cell view for `cell_id` at `level` under the active metric.
    #[inline]
    pub fn cell(&self, level: LevelId, cell_id: CellId) -> CellView<'_> {
        self.cell_storage.get_cell(&self.cell_metric, level, cell_id)
    }
}

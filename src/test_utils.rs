//! Test utilities for building partitioned road networks programmatically.
//!
//! The engine consumes a compiled facade; real deployments get it from the
//! offline toolchain. This builder assembles an equivalent facade from
//! explicit nodes, directed edges and a hand-written partition, including a
//! miniature customizer that fills the per-cell shortcut tables by running
//! plain Dijkstras inside each cell.
//!
//! # Example
//!
//! ```
//! use butterfly_matrix::test_utils::{node_phantom, TestGraphBuilder};
//!
//! let facade = TestGraphBuilder::new(4)
//!     .edge(0, 1, 1)
//!     .edge(1, 2, 1)
//!     .edge(2, 3, 1)
//!     .level(vec![0, 0, 1, 1])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(facade.number_of_nodes(), 4);
//! let phantom = node_phantom(0);
//! assert!(phantom.is_valid_forward_source());
//! ```

use std::cmp::Reverse;
use std::collections::{BinaryHeap, BTreeMap};

use anyhow::{ensure, Context, Result};

use crate::cells::{CellMetric, CellStorage, CellStorageLevelBuilder};
use crate::graph::{EdgeData, GraphFacade};
use crate::partition::MultiLevelPartition;
use crate::phantom::{PhantomNode, SegmentId};
use crate::types::{
    CellId, EdgeDistance, EdgeDuration, EdgeWeight, LevelId, NodeId, INVALID_EDGE_WEIGHT,
    MAXIMAL_EDGE_DURATION,
};

pub struct TestGraphBuilder {
    num_nodes: u32,
    edges: Vec<(NodeId, NodeId, EdgeWeight, EdgeDuration)>,
    node_distances: Vec<EdgeDistance>,
    levels: Vec<Vec<CellId>>,
    excluded: Vec<NodeId>,
}

impl TestGraphBuilder {
    /// Start a graph with `num_nodes` nodes, each representing a segment of
    /// geometric length 1.
    pub fn new(num_nodes: u32) -> Self {
        TestGraphBuilder {
            num_nodes,
            edges: Vec::new(),
            node_distances: vec![1; num_nodes as usize],
            levels: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Directed edge with equal weight and duration.
    pub fn edge(self, from: NodeId, to: NodeId, weight: EdgeWeight) -> Self {
        self.edge_with(from, to, weight, weight)
    }

    /// Directed edge with separate weight and duration.
    pub fn edge_with(
        mut self,
        from: NodeId,
        to: NodeId,
        weight: EdgeWeight,
        duration: EdgeDuration,
    ) -> Self {
        self.edges.push((from, to, weight, duration));
        self
    }

    /// Both directions with equal costs.
    pub fn bidirectional_edge(self, a: NodeId, b: NodeId, weight: EdgeWeight) -> Self {
        self.edge(a, b, weight).edge(b, a, weight)
    }

    /// Override the geometric length of the segment `node` represents.
    pub fn node_distance(mut self, node: NodeId, distance: EdgeDistance) -> Self {
        self.node_distances[node as usize] = distance;
        self
    }

    /// Append a partition level: one cell id per node. The first call is
    /// level 1, the next level 2, and so on; levels must nest.
    pub fn level(mut self, cells: Vec<CellId>) -> Self {
        self.levels.push(cells);
        self
    }

    /// Exclude `node` from the active profile.
    pub fn exclude(mut self, node: NodeId) -> Self {
        self.excluded.push(node);
        self
    }

    pub fn build(self) -> Result<GraphFacade> {
        let n = self.num_nodes as usize;
        for (level, cells) in self.levels.iter().enumerate() {
            ensure!(
                cells.len() == n,
                "level {} assigns {} of {} nodes",
                level + 1,
                cells.len(),
                n
            );
        }
        // Nesting: nodes sharing a cell at level l share one at level l + 1.
        for l in 1..self.levels.len() {
            let mut parent_of: BTreeMap<CellId, CellId> = BTreeMap::new();
            for node in 0..n {
                let child = self.levels[l - 1][node];
                let parent = self.levels[l][node];
                let known = parent_of.entry(child).or_insert(parent);
                ensure!(
                    *known == parent,
                    "level {} cell {} straddles level {} cells",
                    l,
                    child,
                    l + 1
                );
            }
        }
        for &(from, to, weight, _) in &self.edges {
            ensure!(weight > 0, "edge {}->{} must have positive weight", from, to);
            ensure!(
                (from as usize) < n && (to as usize) < n,
                "edge {}->{} out of range",
                from,
                to
            );
        }

        let partition = MultiLevelPartition::new(self.levels.clone());
        let num_levels = partition.number_of_levels() as usize;

        // Store each directed edge from both endpoints so one CSR serves
        // both search directions; opposite directed edges with equal costs
        // collapse into a single two-flag entry.
        let mut merged: BTreeMap<(NodeId, NodeId, EdgeWeight, EdgeDuration), (bool, bool)> =
            BTreeMap::new();
        for &(from, to, weight, duration) in &self.edges {
            merged.entry((from, to, weight, duration)).or_insert((false, false)).0 = true;
            merged.entry((to, from, weight, duration)).or_insert((false, false)).1 = true;
        }
        let mut adjacency: Vec<Vec<(NodeId, EdgeData)>> = vec![Vec::new(); n];
        for (&(node, target, weight, duration), &(forward, backward)) in &merged {
            adjacency[node as usize].push((
                target,
                EdgeData {
                    weight,
                    duration,
                    forward,
                    backward,
                },
            ));
        }

        // Border edges per level must form adjacency prefixes: sort each
        // node's edges by descending highest-different-level.
        let mut edge_offsets = Vec::with_capacity(n + 1);
        let mut edge_targets = Vec::new();
        let mut edge_data = Vec::new();
        let mut border_ends = vec![0u32; n * num_levels];
        edge_offsets.push(0u32);
        for node in 0..n {
            let mut entries = std::mem::take(&mut adjacency[node]);
            entries.sort_by_key(|&(target, _)| {
                (
                    Reverse(partition.highest_different_level(node as NodeId, target)),
                    target,
                )
            });
            for level in 0..num_levels {
                border_ends[node * num_levels + level] = entries
                    .iter()
                    .filter(|&&(target, _)| {
                        partition.highest_different_level(node as NodeId, target)
                            >= level as LevelId
                    })
                    .count() as u32;
            }
            for (target, data) in entries {
                edge_targets.push(target);
                edge_data.push(data);
            }
            edge_offsets.push(edge_targets.len() as u32);
        }

        let mut exclude_mask = vec![0u64; n.div_ceil(64).max(1)];
        for &node in &self.excluded {
            exclude_mask[node as usize >> 6] |= 1u64 << (node & 63);
        }

        let (cell_storage, cell_metric) = customize_cells(
            &partition,
            n,
            &edge_offsets,
            &edge_targets,
            &edge_data,
            &exclude_mask,
        )
        .context("cell customization failed")?;

        Ok(GraphFacade::new(
            self.num_nodes,
            edge_offsets,
            edge_targets,
            edge_data,
            border_ends,
            self.node_distances,
            exclude_mask,
            partition,
            cell_storage,
            cell_metric,
        ))
    }
}

/// Fill the per-cell shortcut tables: boundary nodes from the border edges,
/// costs from intra-cell Dijkstras with the engine's `(weight, duration)`
/// tie-break.
fn customize_cells(
    partition: &MultiLevelPartition,
    n: usize,
    edge_offsets: &[u32],
    edge_targets: &[NodeId],
    edge_data: &[EdgeData],
    exclude_mask: &[u64],
) -> Result<(CellStorage, CellMetric)> {
    let excluded = |node: NodeId| exclude_mask[node as usize >> 6] & (1u64 << (node & 63)) != 0;
    let mut level_builders = Vec::new();
    let mut weights = Vec::new();
    let mut durations = Vec::new();

    for level in 1..partition.number_of_levels() {
        let num_cells = partition.number_of_cells(level) as usize;
        let mut source_offsets = vec![0u32];
        let mut destination_offsets = vec![0u32];
        let mut source_nodes = Vec::new();
        let mut destination_nodes = Vec::new();

        let mut members: Vec<Vec<NodeId>> = vec![Vec::new(); num_cells];
        for node in 0..n as NodeId {
            members[partition.cell(level, node) as usize].push(node);
        }

        for cell_members in &members {
            let cell = cell_members
                .first()
                .map(|&node| partition.cell(level, node));
            let mut sources = Vec::new();
            let mut destinations = Vec::new();
            for &node in cell_members {
                let mut entering = false;
                let mut leaving = false;
                for edge in edge_offsets[node as usize]..edge_offsets[node as usize + 1] {
                    let target = edge_targets[edge as usize];
                    if Some(partition.cell(level, target)) == cell {
                        continue;
                    }
                    let data = &edge_data[edge as usize];
                    // A backward-usable entry means a real edge arrives here
                    // from outside; a forward-usable one leaves the cell.
                    entering |= data.backward;
                    leaving |= data.forward;
                }
                if entering {
                    sources.push(node);
                }
                if leaving {
                    destinations.push(node);
                }
            }

            for &source in &sources {
                let costs = intra_cell_dijkstra(
                    source,
                    level,
                    partition,
                    edge_offsets,
                    edge_targets,
                    edge_data,
                    &excluded,
                );
                for &destination in &destinations {
                    let (weight, duration) = costs
                        .get(&destination)
                        .copied()
                        .unwrap_or((INVALID_EDGE_WEIGHT, MAXIMAL_EDGE_DURATION));
                    weights.push(weight);
                    durations.push(duration);
                }
            }

            source_nodes.extend_from_slice(&sources);
            destination_nodes.extend_from_slice(&destinations);
            source_offsets.push(source_nodes.len() as u32);
            destination_offsets.push(destination_nodes.len() as u32);
        }

        level_builders.push(CellStorageLevelBuilder {
            source_offsets,
            destination_offsets,
            source_nodes,
            destination_nodes,
        });
    }

    let storage = CellStorage::new(level_builders);
    ensure!(
        storage.metric_entries() == weights.len(),
        "metric misaligned: {} entries for {} slots",
        storage.metric_entries(),
        weights.len()
    );
    Ok((storage, CellMetric { weights, durations }))
}

/// Forward Dijkstra from `source` staying inside its cell at `level`,
/// minimizing `(weight, duration)` lexicographically.
fn intra_cell_dijkstra(
    source: NodeId,
    level: LevelId,
    partition: &MultiLevelPartition,
    edge_offsets: &[u32],
    edge_targets: &[NodeId],
    edge_data: &[EdgeData],
    excluded: &dyn Fn(NodeId) -> bool,
) -> BTreeMap<NodeId, (EdgeWeight, EdgeDuration)> {
    let cell = partition.cell(level, source);
    let mut best: BTreeMap<NodeId, (EdgeWeight, EdgeDuration)> = BTreeMap::new();
    let mut heap = BinaryHeap::new();

    if excluded(source) {
        return best;
    }
    best.insert(source, (0, 0));
    heap.push(Reverse((0 as EdgeWeight, 0 as EdgeDuration, source)));

    while let Some(Reverse((weight, duration, node))) = heap.pop() {
        if best.get(&node) != Some(&(weight, duration)) {
            continue;
        }
        for edge in edge_offsets[node as usize]..edge_offsets[node as usize + 1] {
            let data = &edge_data[edge as usize];
            if !data.forward {
                continue;
            }
            let target = edge_targets[edge as usize];
            if partition.cell(level, target) != cell || excluded(target) {
                continue;
            }
            let candidate = (
                weight.saturating_add(data.weight),
                duration.saturating_add(data.duration),
            );
            if best.get(&target).map_or(true, |&current| candidate < current) {
                best.insert(target, candidate);
                heap.push(Reverse((candidate.0, candidate.1, target)));
            }
        }
    }
    best
}

/// Phantom aligned to a node centre: forward side only, zero offsets.
pub fn node_phantom(node: NodeId) -> PhantomNode {
    PhantomNode {
        forward_segment_id: SegmentId::new(node),
        reverse_segment_id: SegmentId::DISABLED,
        forward_weight: 0,
        reverse_weight: 0,
        forward_weight_offset: 0,
        reverse_weight_offset: 0,
        forward_duration: 0,
        reverse_duration: 0,
        forward_distance: 0,
        reverse_distance: 0,
    }
}

/// Phantom valid in both directions, aligned to the centres of the two
/// opposing segments.
pub fn bidirectional_node_phantom(forward: NodeId, reverse: NodeId) -> PhantomNode {
    PhantomNode {
        forward_segment_id: SegmentId::new(forward),
        reverse_segment_id: SegmentId::new(reverse),
        ..node_phantom(forward)
    }
}

/// Phantom partway along the segment `node` represents: `weight`,
/// `duration` and `distance` are the costs from the segment start to the
/// phantom position.
pub fn edge_phantom(
    node: NodeId,
    weight: EdgeWeight,
    duration: EdgeDuration,
    distance: EdgeDistance,
) -> PhantomNode {
    PhantomNode {
        forward_segment_id: SegmentId::new(node),
        reverse_segment_id: SegmentId::DISABLED,
        forward_weight: weight,
        reverse_weight: 0,
        forward_weight_offset: 0,
        reverse_weight_offset: 0,
        forward_duration: duration,
        reverse_duration: 0,
        forward_distance: distance,
        reverse_distance: 0,
    }
}

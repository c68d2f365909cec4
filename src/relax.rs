//! Level-aware edge relaxation.
//!
//! Expanding a settled node happens in two phases. At query level >= 1 the
//! cell's precomputed shortcuts jump straight to the opposite boundary,
//! unless the node itself was reached over a shortcut: a border edge must
//! come in between, which keeps the search zig-zagging down-up through the
//! level hierarchy instead of hopping cells sideways forever. The border
//! phase then crosses the cell boundary on real edges.

use crate::graph::GraphFacade;
use crate::heap::{HeapData, QueryHeap};
use crate::partition::MultiLevelPartition;
use crate::phantom::PhantomNode;
use crate::types::{
    Direction, EdgeDuration, EdgeWeight, LevelId, NodeId, INVALID_EDGE_WEIGHT, INVALID_LEVEL_ID,
};

/// Phantom context a search relaxes against; decides how deep into the
/// hierarchy an expansion may climb.
pub enum QueryLevelContext<'a> {
    /// Bidirectional sweep: level relative to one phantom.
    Phantom(&'a PhantomNode),
    /// Backward bucket fill: as `Phantom`, but expansion stops at the
    /// maximal level.
    PhantomCapped(&'a PhantomNode, LevelId),
    /// Unidirectional search: elementwise minimum over the search phantom
    /// and every opposite-side phantom.
    PhantomSet {
        phantoms: &'a [PhantomNode],
        source_index: usize,
        opposite_indices: &'a [usize],
    },
}

#[inline]
fn phantom_min_level(partition: &MultiLevelPartition, node: NodeId, phantom: &PhantomNode) -> LevelId {
    let forward = if phantom.forward_segment_id.enabled {
        partition.highest_different_level(phantom.forward_segment_id.id, node)
    } else {
        INVALID_LEVEL_ID
    };
    let reverse = if phantom.reverse_segment_id.enabled {
        partition.highest_different_level(phantom.reverse_segment_id.id, node)
    } else {
        INVALID_LEVEL_ID
    };
    forward.min(reverse)
}

impl QueryLevelContext<'_> {
    /// Query level of `node`, or `INVALID_LEVEL_ID` when the node must not
    /// be expanded.
    pub fn query_level(&self, partition: &MultiLevelPartition, node: NodeId) -> LevelId {
        match *self {
            QueryLevelContext::Phantom(phantom) => phantom_min_level(partition, node, phantom),
            QueryLevelContext::PhantomCapped(phantom, maximal_level) => {
                let level = phantom_min_level(partition, node, phantom);
                if level >= maximal_level {
                    INVALID_LEVEL_ID
                } else {
                    level
                }
            }
            QueryLevelContext::PhantomSet {
                phantoms,
                source_index,
                opposite_indices,
            } => {
                let mut level = phantom_min_level(partition, node, &phantoms[source_index]);
                for &index in opposite_indices {
                    level = level.min(phantom_min_level(partition, node, &phantoms[index]));
                }
                level
            }
        }
    }
}

/// Insert `to` or improve its entry when `(weight, duration)` is
/// lexicographically better. Settled nodes keep the improved annotation but
/// are not re-expanded.
#[inline]
pub(crate) fn update_heap(
    heap: &mut QueryHeap,
    to: NodeId,
    weight: EdgeWeight,
    duration: EdgeDuration,
    parent: NodeId,
    from_clique_arc: bool,
) {
    if !heap.was_inserted(to) {
        heap.insert(
            to,
            weight,
            HeapData {
                parent,
                from_clique_arc,
                duration,
            },
        );
    } else if (weight, duration) < (heap.get_key(to), heap.get_data(to).duration) {
        *heap.get_data_mut(to) = HeapData {
            parent,
            from_clique_arc,
            duration,
        };
        heap.decrease_key(to, weight);
    }
}

/// Expand `node`, settled at `(weight, duration)`, at its query level.
/// Precondition: `node` is not excluded.
pub fn relax_outgoing_edges(
    direction: Direction,
    facade: &GraphFacade,
    node: NodeId,
    weight: EdgeWeight,
    duration: EdgeDuration,
    heap: &mut QueryHeap,
    context: &QueryLevelContext<'_>,
) {
    debug_assert!(!facade.exclude_node(node));

    let partition = facade.partition();
    let level = context.query_level(partition, node);
    if level == INVALID_LEVEL_ID {
        return;
    }

    let from_clique_arc = heap.get_data(node).from_clique_arc;

    if level >= 1 && !from_clique_arc {
        let cell = facade.cell(level, partition.cell(level, node));
        match direction {
            Direction::Forward => {
                let weights = cell.out_weight(node);
                let durations = cell.out_duration(node);
                debug_assert_eq!(weights.len(), durations.len());
                for ((&to, &shortcut_weight), &shortcut_duration) in
                    cell.destination_nodes().iter().zip(weights).zip(durations)
                {
                    if shortcut_weight != INVALID_EDGE_WEIGHT && to != node {
                        update_heap(
                            heap,
                            to,
                            weight.saturating_add(shortcut_weight),
                            duration.saturating_add(shortcut_duration),
                            node,
                            true,
                        );
                    }
                }
            }
            Direction::Reverse => {
                let weights = cell.in_weight(node);
                let durations = cell.in_duration(node);
                debug_assert_eq!(
                    cell.in_weight(node).count(),
                    cell.in_duration(node).count()
                );
                for ((&to, shortcut_weight), shortcut_duration) in
                    cell.source_nodes().iter().zip(weights).zip(durations)
                {
                    if shortcut_weight != INVALID_EDGE_WEIGHT && to != node {
                        update_heap(
                            heap,
                            to,
                            weight.saturating_add(shortcut_weight),
                            duration.saturating_add(shortcut_duration),
                            node,
                            true,
                        );
                    }
                }
            }
        }
    }

    for edge in facade.border_edge_range(level, node) {
        let data = facade.edge_data(edge);
        let usable = match direction {
            Direction::Forward => data.forward,
            Direction::Reverse => data.backward,
        };
        if !usable {
            continue;
        }
        let to = facade.target(edge);
        if facade.exclude_node(to) {
            continue;
        }
        debug_assert!(data.weight > 0, "edge weight invalid");
        update_heap(
            heap,
            to,
            weight.saturating_add(data.weight),
            duration.saturating_add(data.duration),
            node,
            false,
        );
    }
}

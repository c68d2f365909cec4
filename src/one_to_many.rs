//! Unidirectional engine for one-to-many and many-to-one tables.
//!
//! A single search runs from the query's lone phantom; every opposite-side
//! phantom is registered in a target index keyed by its segment nodes.
//! Settling (or seeding) a node probes the index: a probe whose combined
//! weight is still negative has not overcome the phantom offset yet and
//! stays registered; a nonnegative probe resolves its target for good.

use rustc_hash::FxHashMap;

use crate::distance::{annotate_packed_path, retrieve_heap_leg};
use crate::graph::GraphFacade;
use crate::phantom::PhantomNode;
use crate::relax::{relax_outgoing_edges, update_heap, QueryLevelContext};
use crate::types::{
    Direction, EdgeDistance, EdgeDuration, EdgeWeight, NodeId, INVALID_EDGE_DISTANCE,
    INVALID_EDGE_WEIGHT, MAXIMAL_EDGE_DURATION, SPECIAL_NODEID,
};
use crate::working_data::EngineWorkingData;

/// Per-target registration: position in the output row, plus the initial
/// weight/duration contributed by the phantom's segment offset.
type TargetIndex = FxHashMap<NodeId, Vec<(usize, EdgeWeight, EdgeDuration)>>;

struct TargetTables {
    weights: Vec<EdgeWeight>,
    durations: Vec<EdgeDuration>,
    /// Meeting node per resolved target, `SPECIAL_NODEID` while unreached.
    meeting_nodes: Vec<NodeId>,
}

/// One-to-many (forward) or many-to-one (reverse) search from
/// `phantom_nodes[source_phantom_index]` to every phantom in
/// `phantom_indices`. Output vectors are indexed by position in
/// `phantom_indices`.
pub fn one_to_many_search(
    working_data: &mut EngineWorkingData,
    facade: &GraphFacade,
    phantom_nodes: &[PhantomNode],
    source_phantom_index: usize,
    phantom_indices: &[usize],
    direction: Direction,
    calculate_distance: bool,
) -> (Vec<EdgeDuration>, Option<Vec<EdgeDistance>>) {
    let mut tables = TargetTables {
        weights: vec![INVALID_EDGE_WEIGHT; phantom_indices.len()],
        durations: vec![MAXIMAL_EDGE_DURATION; phantom_indices.len()],
        meeting_nodes: vec![SPECIAL_NODEID; phantom_indices.len()],
    };

    let (mut target_index, mut remaining) =
        build_target_index(phantom_nodes, phantom_indices, direction);

    working_data.clear_query_heap(facade.number_of_nodes(), facade.max_border_node_id() + 1);
    let heap = &mut working_data.query_heap;

    // Seed the search phantom's enabled segments plus their one-step
    // expansions; the seed itself may already resolve same-segment targets.
    let source_phantom = &phantom_nodes[source_phantom_index];
    let mut seed = |segment: NodeId, weight: EdgeWeight, duration: EdgeDuration| {
        probe_targets(
            segment,
            weight,
            duration,
            &mut target_index,
            &mut remaining,
            &mut tables,
        );
        update_heap(heap, segment, weight, duration, segment, false);
        for edge in facade.adjacent_edge_range(segment) {
            let data = facade.edge_data(edge);
            let usable = match direction {
                Direction::Forward => data.forward,
                Direction::Reverse => data.backward,
            };
            if usable && !facade.exclude_node(facade.target(edge)) {
                update_heap(
                    heap,
                    facade.target(edge),
                    weight.saturating_add(data.weight),
                    duration.saturating_add(data.duration),
                    segment,
                    false,
                );
            }
        }
    };

    match direction {
        Direction::Forward => {
            if source_phantom.is_valid_forward_source() {
                seed(
                    source_phantom.forward_segment_id.id,
                    -source_phantom.forward_weight_plus_offset(),
                    -source_phantom.forward_duration,
                );
            }
            if source_phantom.is_valid_reverse_source() {
                seed(
                    source_phantom.reverse_segment_id.id,
                    -source_phantom.reverse_weight_plus_offset(),
                    -source_phantom.reverse_duration,
                );
            }
        }
        Direction::Reverse => {
            if source_phantom.is_valid_forward_target() {
                seed(
                    source_phantom.forward_segment_id.id,
                    source_phantom.forward_weight_plus_offset(),
                    source_phantom.forward_duration,
                );
            }
            if source_phantom.is_valid_reverse_target() {
                seed(
                    source_phantom.reverse_segment_id.id,
                    source_phantom.reverse_weight_plus_offset(),
                    source_phantom.reverse_duration,
                );
            }
        }
    }

    let context = QueryLevelContext::PhantomSet {
        phantoms: phantom_nodes,
        source_index: source_phantom_index,
        opposite_indices: phantom_indices,
    };

    while !working_data.query_heap.empty() && remaining > 0 {
        let node = working_data.query_heap.delete_min();
        let weight = working_data.query_heap.get_key(node);
        let duration = working_data.query_heap.get_data(node).duration;

        probe_targets(
            node,
            weight,
            duration,
            &mut target_index,
            &mut remaining,
            &mut tables,
        );

        relax_outgoing_edges(
            direction,
            facade,
            node,
            weight,
            duration,
            &mut working_data.query_heap,
            &context,
        );
    }

    let distances = calculate_distance.then(|| {
        calculate_one_to_many_distances(
            working_data,
            facade,
            phantom_nodes,
            source_phantom_index,
            phantom_indices,
            direction,
            &tables,
        )
    });

    (tables.durations, distances)
}

fn build_target_index(
    phantom_nodes: &[PhantomNode],
    phantom_indices: &[usize],
    direction: Direction,
) -> (TargetIndex, usize) {
    let mut index: TargetIndex =
        FxHashMap::with_capacity_and_hasher(phantom_indices.len(), Default::default());
    let mut remaining = 0usize;
    for (column, &phantom_index) in phantom_indices.iter().enumerate() {
        let phantom = &phantom_nodes[phantom_index];
        match direction {
            Direction::Forward => {
                if phantom.is_valid_forward_target() {
                    index.entry(phantom.forward_segment_id.id).or_default().push((
                        column,
                        phantom.forward_weight_plus_offset(),
                        phantom.forward_duration,
                    ));
                    remaining += 1;
                }
                if phantom.is_valid_reverse_target() {
                    index.entry(phantom.reverse_segment_id.id).or_default().push((
                        column,
                        phantom.reverse_weight_plus_offset(),
                        phantom.reverse_duration,
                    ));
                    remaining += 1;
                }
            }
            Direction::Reverse => {
                if phantom.is_valid_forward_source() {
                    index.entry(phantom.forward_segment_id.id).or_default().push((
                        column,
                        -phantom.forward_weight_plus_offset(),
                        -phantom.forward_duration,
                    ));
                    remaining += 1;
                }
                if phantom.is_valid_reverse_source() {
                    index.entry(phantom.reverse_segment_id.id).or_default().push((
                        column,
                        -phantom.reverse_weight_plus_offset(),
                        -phantom.reverse_duration,
                    ));
                    remaining += 1;
                }
            }
        }
    }
    (index, remaining)
}

/// Resolve every registered target at `node` whose combined weight has
/// become nonnegative. Resolution is final: the entry is removed even when
/// it does not improve the table, because the first valid meeting already
/// carries the minimal settled weight.
fn probe_targets(
    node: NodeId,
    weight: EdgeWeight,
    duration: EdgeDuration,
    target_index: &mut TargetIndex,
    remaining: &mut usize,
    tables: &mut TargetTables,
) {
    let Some(candidates) = target_index.get_mut(&node) else {
        return;
    };
    candidates.retain(|&(column, target_weight, target_duration)| {
        let path_weight = weight + target_weight;
        if path_weight < 0 {
            return true;
        }
        let path_duration = duration + target_duration;
        if (path_weight, path_duration) < (tables.weights[column], tables.durations[column]) {
            tables.weights[column] = path_weight;
            tables.durations[column] = path_duration;
            tables.meeting_nodes[column] = node;
        }
        *remaining -= 1;
        false
    });
    if candidates.is_empty() {
        target_index.remove(&node);
    }
}

fn calculate_one_to_many_distances(
    working_data: &mut EngineWorkingData,
    facade: &GraphFacade,
    phantom_nodes: &[PhantomNode],
    source_phantom_index: usize,
    phantom_indices: &[usize],
    direction: Direction,
    tables: &TargetTables,
) -> Vec<EdgeDistance> {
    let mut distances = vec![INVALID_EDGE_DISTANCE; phantom_indices.len()];
    let search_phantom = &phantom_nodes[source_phantom_index];

    for (column, &phantom_index) in phantom_indices.iter().enumerate() {
        if phantom_index == source_phantom_index {
            distances[column] = 0;
            continue;
        }
        let meeting_node = tables.meeting_nodes[column];
        if meeting_node == SPECIAL_NODEID {
            continue;
        }

        let packed = retrieve_heap_leg(&working_data.query_heap, meeting_node, direction);
        let probe_phantom = &phantom_nodes[phantom_index];
        // In a forward search the trip runs search phantom -> probe; in a
        // reverse (many-to-one) search the probe phantoms are the trips'
        // real sources.
        let (real_source, real_target) = match direction {
            Direction::Forward => (search_phantom, probe_phantom),
            Direction::Reverse => (probe_phantom, search_phantom),
        };
        distances[column] = annotate_packed_path(
            facade,
            &mut working_data.unpack_heap,
            &packed,
            real_source,
            real_target,
        );
    }

    distances
}

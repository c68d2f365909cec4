//! Bidirectional engine for many-to-many tables, plus the public
//! dispatcher.
//!
//! Phase 1 runs a backward search per target column and records every
//! settled node as a bucket. Phase 2 runs a forward search per source row;
//! every settled node is joined against the sorted buckets, and the best
//! `(weight, duration)` combination per table entry wins together with its
//! meeting node.
//!
//! The backward search space is pruned against the hierarchy's top level,
//! so tables are cheapest when there are at least as many targets as
//! sources; the dispatcher flips the orientation otherwise and the location
//! formula transposes the result back on the fly.

use serde::Serialize;

use crate::bucket::{BucketStore, NodeBucket};
use crate::distance::{annotate_packed_path, retrieve_packed_path};
use crate::graph::GraphFacade;
use crate::one_to_many::one_to_many_search;
use crate::phantom::PhantomNode;
use crate::relax::{relax_outgoing_edges, update_heap, QueryLevelContext};
use crate::types::{
    Direction, EdgeDistance, EdgeDuration, EdgeWeight, NodeId, INVALID_EDGE_DISTANCE,
    INVALID_EDGE_WEIGHT, MAXIMAL_EDGE_DURATION, SPECIAL_NODEID,
};
use crate::working_data::EngineWorkingData;

/// Result of a table query, row-major sources x targets.
#[derive(Debug, Clone, Serialize)]
pub struct TableResult {
    pub durations: Vec<EdgeDuration>,
    pub distances: Option<Vec<EdgeDistance>>,
    pub stats: TableStats,
}

/// Search-effort counters for one table query.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct TableStats {
    pub n_sources: usize,
    pub n_targets: usize,
    pub forward_settled: usize,
    pub backward_settled: usize,
    pub bucket_items: usize,
    pub bucket_probes: usize,
}

/// Row-major location of `(row, column)`; the reverse orientation writes
/// transposed so the caller always reads sources x targets.
#[inline]
fn table_location(
    direction: Direction,
    row: usize,
    column: usize,
    number_of_sources: usize,
    number_of_targets: usize,
) -> usize {
    match direction {
        Direction::Forward => row * number_of_targets + column,
        Direction::Reverse => row + column * number_of_sources,
    }
}

/// Seed `phantom` as the start of a forward-facing leg: enabled segments
/// enter at *minus* their offset costs.
fn insert_source_in_heap(working_data: &mut EngineWorkingData, phantom: &PhantomNode) {
    let heap = &mut working_data.query_heap;
    if phantom.is_valid_forward_source() {
        update_heap(
            heap,
            phantom.forward_segment_id.id,
            -phantom.forward_weight_plus_offset(),
            -phantom.forward_duration,
            phantom.forward_segment_id.id,
            false,
        );
    }
    if phantom.is_valid_reverse_source() {
        update_heap(
            heap,
            phantom.reverse_segment_id.id,
            -phantom.reverse_weight_plus_offset(),
            -phantom.reverse_duration,
            phantom.reverse_segment_id.id,
            false,
        );
    }
}

/// Seed `phantom` as the end of a leg: enabled segments enter at *plus*
/// their offset costs.
fn insert_target_in_heap(working_data: &mut EngineWorkingData, phantom: &PhantomNode) {
    let heap = &mut working_data.query_heap;
    if phantom.is_valid_forward_target() {
        update_heap(
            heap,
            phantom.forward_segment_id.id,
            phantom.forward_weight_plus_offset(),
            phantom.forward_duration,
            phantom.forward_segment_id.id,
            false,
        );
    }
    if phantom.is_valid_reverse_target() {
        update_heap(
            heap,
            phantom.reverse_segment_id.id,
            phantom.reverse_weight_plus_offset(),
            phantom.reverse_duration,
            phantom.reverse_segment_id.id,
            false,
        );
    }
}

/// Run the backward search for one target column to exhaustion, emitting a
/// bucket for every settled node. Returns the number of settled nodes.
pub(crate) fn backward_bucket_fill(
    working_data: &mut EngineWorkingData,
    facade: &GraphFacade,
    column: u32,
    phantom: &PhantomNode,
    direction: Direction,
    buckets: &mut BucketStore,
) -> usize {
    working_data.clear_query_heap(facade.number_of_nodes(), facade.max_border_node_id() + 1);
    match direction {
        Direction::Forward => insert_target_in_heap(working_data, phantom),
        Direction::Reverse => insert_source_in_heap(working_data, phantom),
    }

    let maximal_level = facade.partition().number_of_levels() - 1;
    let context = QueryLevelContext::PhantomCapped(phantom, maximal_level);
    let mut settled = 0usize;

    while !working_data.query_heap.empty() {
        let heap = &mut working_data.query_heap;
        let node = heap.delete_min();
        let weight = heap.get_key(node);
        let data = heap.get_data(node);

        buckets.push(NodeBucket {
            node,
            parent: data.parent,
            from_clique_arc: data.from_clique_arc,
            column,
            weight,
            duration: data.duration,
        });
        settled += 1;

        relax_outgoing_edges(
            direction.flip(),
            facade,
            node,
            weight,
            data.duration,
            heap,
            &context,
        );
    }
    settled
}

struct SweepTables {
    weights: Vec<EdgeWeight>,
    durations: Vec<EdgeDuration>,
    middle_nodes: Vec<NodeId>,
}

/// Run the forward search for one source row to exhaustion, joining every
/// settled node against the buckets. Returns `(settled, probes)`.
#[allow(clippy::too_many_arguments)]
fn forward_row_sweep(
    working_data: &mut EngineWorkingData,
    facade: &GraphFacade,
    row: usize,
    number_of_sources: usize,
    number_of_targets: usize,
    phantom: &PhantomNode,
    direction: Direction,
    buckets: &BucketStore,
    tables: &mut SweepTables,
) -> (usize, usize) {
    working_data.clear_query_heap(facade.number_of_nodes(), facade.max_border_node_id() + 1);
    match direction {
        Direction::Forward => insert_source_in_heap(working_data, phantom),
        Direction::Reverse => insert_target_in_heap(working_data, phantom),
    }

    let context = QueryLevelContext::Phantom(phantom);
    let mut settled = 0usize;
    let mut probes = 0usize;

    while !working_data.query_heap.empty() {
        let heap = &mut working_data.query_heap;
        let node = heap.delete_min();
        let source_weight = heap.get_key(node);
        let source_duration = heap.get_data(node).duration;
        settled += 1;

        for bucket in buckets.range(node) {
            probes += 1;
            let location = table_location(
                direction,
                row,
                bucket.column as usize,
                number_of_sources,
                number_of_targets,
            );
            let new_weight = source_weight + bucket.weight;
            let new_duration = source_duration + bucket.duration;
            if new_weight >= 0
                && (new_weight, new_duration)
                    < (tables.weights[location], tables.durations[location])
            {
                tables.weights[location] = new_weight;
                tables.durations[location] = new_duration;
                tables.middle_nodes[location] = node;
            }
        }

        relax_outgoing_edges(
            direction,
            facade,
            node,
            source_weight,
            source_duration,
            heap,
            &context,
        );
    }
    (settled, probes)
}

/// Distance pass for one source row: reconstruct the packed path through
/// each entry's middle node and annotate it with real segment lengths and
/// phantom offsets. Runs while the row's forward heap is still intact.
#[allow(clippy::too_many_arguments)]
fn calculate_row_distances(
    working_data: &mut EngineWorkingData,
    facade: &GraphFacade,
    phantom_nodes: &[PhantomNode],
    target_indices: &[usize],
    row: usize,
    source_index: usize,
    direction: Direction,
    number_of_sources: usize,
    buckets: &BucketStore,
    tables: &SweepTables,
    distances: &mut [EdgeDistance],
) {
    let row_phantom = &phantom_nodes[source_index];
    let number_of_targets = target_indices.len();

    for (column, &target_index) in target_indices.iter().enumerate() {
        let location = table_location(
            direction,
            row,
            column,
            number_of_sources,
            number_of_targets,
        );

        if source_index == target_index {
            distances[location] = 0;
            continue;
        }
        let middle = tables.middle_nodes[location];
        if middle == SPECIAL_NODEID {
            // One-way streets and friends: no meeting point exists.
            distances[location] = INVALID_EDGE_DISTANCE;
            continue;
        }

        let packed = retrieve_packed_path(
            &working_data.query_heap,
            buckets,
            middle,
            column as u32,
            direction,
        );

        let column_phantom = &phantom_nodes[target_index];
        // Under reverse orientation the row phantom is where trips *end*.
        let (real_source, real_target) = match direction {
            Direction::Forward => (row_phantom, column_phantom),
            Direction::Reverse => (column_phantom, row_phantom),
        };
        distances[location] = annotate_packed_path(
            facade,
            &mut working_data.unpack_heap,
            &packed,
            real_source,
            real_target,
        );
    }
}

/// Bidirectional many-to-many search in a fixed orientation. Prefer
/// [`many_to_many_search`], which picks the cheaper orientation.
pub fn many_to_many_bidirectional(
    working_data: &mut EngineWorkingData,
    facade: &GraphFacade,
    phantom_nodes: &[PhantomNode],
    source_indices: &[usize],
    target_indices: &[usize],
    direction: Direction,
    calculate_distance: bool,
) -> (Vec<EdgeDuration>, Option<Vec<EdgeDistance>>, TableStats) {
    let number_of_sources = source_indices.len();
    let number_of_targets = target_indices.len();
    let number_of_entries = number_of_sources * number_of_targets;

    let mut tables = SweepTables {
        weights: vec![INVALID_EDGE_WEIGHT; number_of_entries],
        durations: vec![MAXIMAL_EDGE_DURATION; number_of_entries],
        middle_nodes: vec![SPECIAL_NODEID; number_of_entries],
    };
    let mut distances =
        calculate_distance.then(|| vec![INVALID_EDGE_DISTANCE; number_of_entries]);
    let mut stats = TableStats {
        n_sources: number_of_sources,
        n_targets: number_of_targets,
        ..Default::default()
    };

    let mut buckets = BucketStore::new();
    for (column, &target_index) in target_indices.iter().enumerate() {
        stats.backward_settled += backward_bucket_fill(
            working_data,
            facade,
            column as u32,
            &phantom_nodes[target_index],
            direction,
            &mut buckets,
        );
    }
    buckets.sort();
    stats.bucket_items = buckets.len();

    for (row, &source_index) in source_indices.iter().enumerate() {
        let (settled, probes) = forward_row_sweep(
            working_data,
            facade,
            row,
            number_of_sources,
            number_of_targets,
            &phantom_nodes[source_index],
            direction,
            &buckets,
            &mut tables,
        );
        stats.forward_settled += settled;
        stats.bucket_probes += probes;

        if let Some(distances) = distances.as_mut() {
            calculate_row_distances(
                working_data,
                facade,
                phantom_nodes,
                target_indices,
                row,
                source_index,
                direction,
                number_of_sources,
                &buckets,
                &tables,
                distances,
            );
        }
    }

    (tables.durations, distances, stats)
}

/// Compute a sources x targets duration table (and optionally a distance
/// table) between phantom endpoints.
///
/// Dispatch: a single source runs a forward one-to-many, a single target a
/// reverse many-to-one; otherwise the bidirectional engine runs in the
/// orientation with the fewer backward searches and the result is
/// transposed back semantically. `calculate_duration` is accepted for
/// interface parity; the duration table is always produced.
pub fn many_to_many_search(
    working_data: &mut EngineWorkingData,
    facade: &GraphFacade,
    phantom_nodes: &[PhantomNode],
    source_indices: &[usize],
    target_indices: &[usize],
    calculate_distance: bool,
    calculate_duration: bool,
) -> TableResult {
    let _ = calculate_duration;
    tracing::debug!(
        n_sources = source_indices.len(),
        n_targets = target_indices.len(),
        calculate_distance,
        "table query"
    );

    if source_indices.len() == 1 {
        let (durations, distances) = one_to_many_search(
            working_data,
            facade,
            phantom_nodes,
            source_indices[0],
            target_indices,
            Direction::Forward,
            calculate_distance,
        );
        let stats = TableStats {
            n_sources: 1,
            n_targets: target_indices.len(),
            ..Default::default()
        };
        return TableResult {
            durations,
            distances,
            stats,
        };
    }

    if target_indices.len() == 1 {
        let (durations, distances) = one_to_many_search(
            working_data,
            facade,
            phantom_nodes,
            target_indices[0],
            source_indices,
            Direction::Reverse,
            calculate_distance,
        );
        let stats = TableStats {
            n_sources: source_indices.len(),
            n_targets: 1,
            ..Default::default()
        };
        return TableResult {
            durations,
            distances,
            stats,
        };
    }

    let (durations, distances, mut stats) = if target_indices.len() < source_indices.len() {
        many_to_many_bidirectional(
            working_data,
            facade,
            phantom_nodes,
            target_indices,
            source_indices,
            Direction::Reverse,
            calculate_distance,
        )
    } else {
        many_to_many_bidirectional(
            working_data,
            facade,
            phantom_nodes,
            source_indices,
            target_indices,
            Direction::Forward,
            calculate_distance,
        )
    };
    if target_indices.len() < source_indices.len() {
        // The reverse run swapped the roles; report the caller's view.
        std::mem::swap(&mut stats.n_sources, &mut stats.n_targets);
    }

    TableResult {
        durations,
        distances,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::retrieve_packed_path;
    use crate::test_utils::{node_phantom, TestGraphBuilder};

    /// Three cells in a row; crossing from cell 0 to cell 2 must take the
    /// middle cell's shortcut.
    fn three_cell_chain() -> GraphFacade {
        TestGraphBuilder::new(6)
            .edge(0, 1, 1)
            .edge(1, 2, 1)
            .edge(2, 3, 1)
            .edge(3, 4, 1)
            .edge(4, 5, 1)
            .level(vec![0, 0, 1, 1, 2, 2])
            .build()
            .unwrap()
    }

    #[test]
    fn backward_fill_emits_one_bucket_per_settled_node() {
        let facade = three_cell_chain();
        let mut working_data = EngineWorkingData::new();
        let mut buckets = BucketStore::new();

        let targets = [node_phantom(5), node_phantom(3)];
        let mut settled_per_column = Vec::new();
        for (column, phantom) in targets.iter().enumerate() {
            settled_per_column.push(backward_bucket_fill(
                &mut working_data,
                &facade,
                column as u32,
                phantom,
                Direction::Forward,
                &mut buckets,
            ));
        }
        buckets.sort();

        for column in 0..targets.len() as u32 {
            let mut nodes: Vec<NodeId> = Vec::new();
            for node in 0..facade.number_of_nodes() {
                if let Some(bucket) = buckets.find(node, column) {
                    assert_eq!(bucket.node, node);
                    nodes.push(node);
                }
            }
            assert_eq!(nodes.len(), settled_per_column[column as usize]);
        }
        assert_eq!(
            buckets.len(),
            settled_per_column.iter().sum::<usize>(),
            "every settled node appears exactly once per column"
        );
    }

    #[test]
    fn cross_cell_path_uses_shortcut_and_zigzags() {
        let facade = three_cell_chain();
        let mut working_data = EngineWorkingData::new();
        let mut buckets = BucketStore::new();

        let target = node_phantom(5);
        backward_bucket_fill(
            &mut working_data,
            &facade,
            0,
            &target,
            Direction::Forward,
            &mut buckets,
        );
        buckets.sort();

        let source = node_phantom(0);
        let mut tables = SweepTables {
            weights: vec![INVALID_EDGE_WEIGHT; 1],
            durations: vec![MAXIMAL_EDGE_DURATION; 1],
            middle_nodes: vec![SPECIAL_NODEID; 1],
        };
        forward_row_sweep(
            &mut working_data,
            &facade,
            0,
            1,
            1,
            &source,
            Direction::Forward,
            &buckets,
            &mut tables,
        );

        assert_eq!(tables.durations[0], 5);
        let middle = tables.middle_nodes[0];
        assert_ne!(middle, SPECIAL_NODEID);

        let packed = retrieve_packed_path(
            &working_data.query_heap,
            &buckets,
            middle,
            0,
            Direction::Forward,
        );
        assert!(
            packed.iter().any(|&(_, _, clique)| clique),
            "cross-cell path must use a cell shortcut"
        );
        for pair in packed.windows(2) {
            assert!(
                !(pair[0].2 && pair[1].2),
                "two consecutive clique arcs in {:?}",
                packed
            );
        }
        // Contiguous traversal order from source segment to target segment.
        assert_eq!(packed.first().unwrap().0, 0);
        assert_eq!(packed.last().unwrap().1, 5);
        for pair in packed.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
    }

    #[test]
    fn reverse_orientation_writes_transposed_locations() {
        assert_eq!(table_location(Direction::Forward, 1, 2, 4, 3), 5);
        assert_eq!(table_location(Direction::Reverse, 1, 2, 4, 3), 9);
    }
}

//! End-to-end table queries on small hand-built networks.

use butterfly_matrix::test_utils::{edge_phantom, node_phantom, TestGraphBuilder};
use butterfly_matrix::{
    many_to_many_bidirectional, many_to_many_search, Direction, EngineWorkingData, GraphFacade,
    INVALID_EDGE_DISTANCE, MAXIMAL_EDGE_DURATION,
};

/// Directed unit-cost path 0 -> 1 -> 2 -> 3 with extra unconnected nodes,
/// partitioned into two cells.
fn directed_path() -> GraphFacade {
    TestGraphBuilder::new(10)
        .edge(0, 1, 1)
        .edge(1, 2, 1)
        .edge(2, 3, 1)
        .level(vec![0, 0, 1, 1, 2, 2, 2, 2, 2, 2])
        .build()
        .unwrap()
}

fn bidirectional_path() -> GraphFacade {
    TestGraphBuilder::new(4)
        .bidirectional_edge(0, 1, 1)
        .bidirectional_edge(1, 2, 1)
        .bidirectional_edge(2, 3, 1)
        .level(vec![0, 0, 1, 1])
        .build()
        .unwrap()
}

#[test]
fn one_to_many_along_path() {
    // Scenario A
    let facade = directed_path();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [
        node_phantom(0),
        node_phantom(1),
        node_phantom(2),
        node_phantom(3),
    ];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0],
        &[1, 2, 3],
        true,
        true,
    );

    assert_eq!(result.durations, vec![1, 2, 3]);
    assert_eq!(result.distances, Some(vec![1, 2, 3]));
}

#[test]
fn one_way_targets_are_unreachable() {
    // Scenario B
    let facade = directed_path();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [
        node_phantom(0),
        node_phantom(1),
        node_phantom(2),
        node_phantom(3),
    ];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[3],
        &[0, 1, 2],
        true,
        true,
    );

    assert_eq!(result.durations, vec![MAXIMAL_EDGE_DURATION; 3]);
    assert_eq!(result.distances, Some(vec![INVALID_EDGE_DISTANCE; 3]));
}

#[test]
fn bidirectional_forward_orientation() {
    // Scenario C: |T| >= |S| keeps the forward orientation.
    let facade = directed_path();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [
        node_phantom(0),
        node_phantom(1),
        node_phantom(2),
        node_phantom(3),
    ];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0, 1],
        &[2, 3],
        false,
        true,
    );

    assert_eq!(result.durations, vec![2, 3, 1, 2]);
    assert_eq!(result.stats.n_sources, 2);
    assert_eq!(result.stats.n_targets, 2);
    assert!(result.stats.bucket_items > 0);
}

#[test]
fn many_to_one_runs_reverse() {
    // Scenario D
    let facade = directed_path();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [
        node_phantom(0),
        node_phantom(1),
        node_phantom(2),
        node_phantom(3),
    ];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0, 1, 2],
        &[3],
        true,
        true,
    );

    assert_eq!(result.durations, vec![3, 2, 1]);
    assert_eq!(result.distances, Some(vec![3, 2, 1]));
}

#[test]
fn same_segment_phantoms_use_offset_difference() {
    // Scenario E: both phantoms on the segment of node 0, target further
    // along; no graph edge is traversed.
    let facade = TestGraphBuilder::new(2)
        .edge(0, 1, 10)
        .node_distance(0, 10)
        .level(vec![0, 1])
        .build()
        .unwrap();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [edge_phantom(0, 2, 2, 2), edge_phantom(0, 7, 7, 7)];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0],
        &[1],
        true,
        true,
    );

    assert_eq!(result.durations, vec![5]);
    assert_eq!(result.distances, Some(vec![5]));
}

#[test]
fn same_segment_phantom_behind_source_stays_unreachable() {
    // The offset is never overcome on a one-way segment without a loop.
    let facade = TestGraphBuilder::new(2)
        .edge(0, 1, 10)
        .node_distance(0, 10)
        .level(vec![0, 1])
        .build()
        .unwrap();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [edge_phantom(0, 7, 7, 7), edge_phantom(0, 2, 2, 2)];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0],
        &[1],
        true,
        true,
    );

    assert_eq!(result.durations, vec![MAXIMAL_EDGE_DURATION]);
    assert_eq!(result.distances, Some(vec![INVALID_EDGE_DISTANCE]));
}

#[test]
fn cross_cell_distances_match_durations() {
    // Scenario F on unit segments: distance equals duration for every
    // reachable pair, including entries routed over cell shortcuts.
    let facade = TestGraphBuilder::new(6)
        .edge(0, 1, 1)
        .edge(1, 2, 1)
        .edge(2, 3, 1)
        .edge(3, 4, 1)
        .edge(4, 5, 1)
        .level(vec![0, 0, 1, 1, 2, 2])
        .build()
        .unwrap();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [
        node_phantom(0),
        node_phantom(1),
        node_phantom(4),
        node_phantom(5),
    ];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0, 1],
        &[2, 3],
        true,
        true,
    );

    assert_eq!(result.durations, vec![4, 5, 3, 4]);
    let distances = result.distances.unwrap();
    assert_eq!(distances, vec![4, 5, 3, 4]);
}

#[test]
fn diagonal_is_zero() {
    let facade = bidirectional_path();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [node_phantom(0), node_phantom(2)];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0, 1],
        &[0, 1],
        true,
        true,
    );

    assert_eq!(result.durations[0], 0);
    assert_eq!(result.durations[3], 0);
    let distances = result.distances.unwrap();
    assert_eq!(distances[0], 0);
    assert_eq!(distances[3], 0);
}

#[test]
fn costs_are_nonnegative_or_sentinel() {
    let facade = directed_path();
    let mut working_data = EngineWorkingData::new();
    let phantoms: Vec<_> = (0..4).map(node_phantom).collect();
    let indices = [0, 1, 2, 3];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &indices,
        &indices,
        true,
        true,
    );

    for &duration in &result.durations {
        assert!(duration == MAXIMAL_EDGE_DURATION || duration >= 0);
    }
    for &distance in result.distances.as_deref().unwrap() {
        assert!(distance == INVALID_EDGE_DISTANCE || distance >= 0);
    }
}

#[test]
fn transposition_on_symmetric_graph() {
    let facade = bidirectional_path();
    let phantoms: Vec<_> = (0..4).map(node_phantom).collect();
    let sources = [0usize, 1, 2];
    let targets = [3usize, 0];

    let mut working_data = EngineWorkingData::new();
    // |T| < |S| exercises the reverse orientation.
    let forward = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &sources,
        &targets,
        false,
        true,
    );
    let swapped = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &targets,
        &sources,
        false,
        true,
    );

    for (row, _) in sources.iter().enumerate() {
        for (column, _) in targets.iter().enumerate() {
            assert_eq!(
                forward.durations[row * targets.len() + column],
                swapped.durations[column * sources.len() + row],
                "transposed entry ({row}, {column}) differs"
            );
        }
    }
}

#[test]
fn reverse_orientation_matches_row_queries() {
    // Directed graph, |T| < |S|: the transposed run must still report
    // d(source -> target) in the caller's orientation.
    let facade = directed_path();
    let phantoms: Vec<_> = (0..4).map(node_phantom).collect();
    let sources = [0usize, 1, 2];
    let targets = [2usize, 3];

    let mut working_data = EngineWorkingData::new();
    let table = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &sources,
        &targets,
        false,
        true,
    );

    for (row, &source) in sources.iter().enumerate() {
        let row_result = many_to_many_search(
            &mut working_data,
            &facade,
            &phantoms,
            &[source],
            &targets,
            false,
            true,
        );
        assert_eq!(
            &table.durations[row * targets.len()..(row + 1) * targets.len()],
            row_result.durations.as_slice(),
            "row {row} differs from a one-to-many query"
        );
    }
}

#[test]
fn reverse_orientation_distances_match_hand_computed() {
    // Distinct segment lengths on a directed chain; |T| < |S| with both
    // above one forces the transposed bidirectional run, so the distance
    // pass reconstructs packed paths from a reverse-direction sweep.
    let facade = TestGraphBuilder::new(6)
        .edge(0, 1, 1)
        .edge(1, 2, 1)
        .edge(2, 3, 1)
        .edge(3, 4, 1)
        .edge(4, 5, 1)
        .node_distance(0, 1)
        .node_distance(1, 2)
        .node_distance(2, 3)
        .node_distance(3, 4)
        .node_distance(4, 5)
        .node_distance(5, 6)
        .level(vec![0, 0, 1, 1, 2, 2])
        .build()
        .unwrap();
    let mut working_data = EngineWorkingData::new();
    let phantoms: Vec<_> = (0..6).map(node_phantom).collect();

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0, 1, 2],
        &[4, 5],
        true,
        true,
    );

    assert_eq!(result.durations, vec![4, 5, 3, 4, 2, 3]);
    // d(s -> t) sums the segment lengths of every node on the path except
    // the final one, e.g. d(0 -> 4) = 1 + 2 + 3 + 4.
    assert_eq!(result.distances, Some(vec![10, 15, 9, 14, 7, 12]));
}

#[test]
fn one_to_many_reduction_matches_bidirectional() {
    let facade = bidirectional_path();
    let phantoms: Vec<_> = (0..4).map(node_phantom).collect();
    let targets = [1usize, 2, 3];

    let mut working_data = EngineWorkingData::new();
    let dispatched = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0],
        &targets,
        false,
        true,
    );
    let (bidirectional, _, _) = many_to_many_bidirectional(
        &mut working_data,
        &facade,
        &phantoms,
        &[0],
        &targets,
        Direction::Forward,
        false,
    );

    assert_eq!(dispatched.durations, bidirectional);
}

#[test]
fn excluded_nodes_block_paths() {
    let facade = TestGraphBuilder::new(4)
        .edge(0, 1, 1)
        .edge(1, 2, 1)
        .edge(2, 3, 1)
        .edge(0, 3, 9)
        .level(vec![0, 0, 1, 1])
        .exclude(1)
        .build()
        .unwrap();
    let mut working_data = EngineWorkingData::new();
    let phantoms = [node_phantom(0), node_phantom(3)];

    let result = many_to_many_search(
        &mut working_data,
        &facade,
        &phantoms,
        &[0],
        &[1],
        false,
        true,
    );

    // Only the direct expensive edge remains.
    assert_eq!(result.durations, vec![9]);
}

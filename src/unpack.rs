//! Packed-path unpacking.
//!
//! A packed path alternates real border edges with clique arcs. Border
//! edges pass through unchanged; a clique arc summarises a shortest path
//! between two boundary nodes and is expanded here with a plain base-graph
//! Dijkstra between its endpoints. All packed edges arrive oriented in real
//! traversal order, so expansion always runs in the forward direction.

use crate::graph::GraphFacade;
use crate::heap::{HeapData, QueryHeap};
use crate::types::{EdgeDistance, EdgeId, EdgeWeight, NodeId, PackedPath};

/// Geometric length of the segment `node` represents.
#[inline]
pub fn compute_edge_distance(facade: &GraphFacade, node: NodeId) -> EdgeDistance {
    facade.node_distance(node)
}

/// Expand `packed` into concrete graph nodes and edge ids, returning the
/// total weight alongside. `unpack_heap` is borrowed scratch state.
pub fn unpack_path_and_calculate_distance(
    facade: &GraphFacade,
    unpack_heap: &mut QueryHeap,
    packed: &PackedPath,
) -> (EdgeWeight, Vec<NodeId>, Vec<EdgeId>) {
    debug_assert!(!packed.is_empty());

    let mut nodes = Vec::with_capacity(packed.len() + 1);
    let mut edges = Vec::with_capacity(packed.len());
    let mut total_weight: EdgeWeight = 0;
    nodes.push(packed[0].0);

    for &(from, to, from_clique_arc) in packed {
        debug_assert_eq!(nodes.last().copied(), Some(from));
        if from_clique_arc {
            let weight = expand_clique_arc(facade, unpack_heap, from, to, &mut nodes, &mut edges);
            total_weight = total_weight.saturating_add(weight);
        } else {
            match find_forward_edge(facade, from, to) {
                Some(edge) => {
                    total_weight = total_weight.saturating_add(facade.edge_data(edge).weight);
                    nodes.push(to);
                    edges.push(edge);
                }
                None => {
                    tracing::trace!(from, to, "unpack: missing border edge");
                    nodes.push(to);
                }
            }
        }
    }

    (total_weight, nodes, edges)
}

/// Expand the clique arc `from -> to` by searching the base graph. Appends
/// the intermediate nodes and edges (excluding `from` itself) and returns
/// the path weight.
fn expand_clique_arc(
    facade: &GraphFacade,
    heap: &mut QueryHeap,
    from: NodeId,
    to: NodeId,
    nodes: &mut Vec<NodeId>,
    edges: &mut Vec<EdgeId>,
) -> EdgeWeight {
    heap.clear(facade.number_of_nodes(), facade.max_border_node_id() + 1);
    heap.insert(
        from,
        0,
        HeapData {
            parent: from,
            from_clique_arc: false,
            duration: 0,
        },
    );

    while !heap.empty() {
        let node = heap.delete_min();
        if node == to {
            break;
        }
        let weight = heap.get_key(node);
        for edge in facade.adjacent_edge_range(node) {
            let data = facade.edge_data(edge);
            if !data.forward {
                continue;
            }
            let target = facade.target(edge);
            if facade.exclude_node(target) {
                continue;
            }
            let to_weight = weight.saturating_add(data.weight);
            let to_duration = heap.get_data(node).duration.saturating_add(data.duration);
            crate::relax::update_heap(heap, target, to_weight, to_duration, node, false);
        }
    }

    if !heap.was_inserted(to) {
        tracing::trace!(from, to, "unpack: clique arc target unreachable");
        nodes.push(to);
        return 0;
    }

    // Walk parents back to `from`, then splice in natural order.
    let mut leg = Vec::new();
    let mut node = to;
    while node != from {
        let parent = heap.get_data(node).parent;
        leg.push(node);
        node = parent;
    }
    for &step in leg.iter().rev() {
        let previous = *nodes.last().expect("nodes never empty");
        match find_forward_edge(facade, previous, step) {
            Some(edge) => edges.push(edge),
            None => tracing::trace!(from = previous, to = step, "unpack: missing unpacked edge"),
        }
        nodes.push(step);
    }

    heap.get_key(to)
}

/// Forward-traversable edge `from -> to`, if one exists.
fn find_forward_edge(facade: &GraphFacade, from: NodeId, to: NodeId) -> Option<EdgeId> {
    facade
        .adjacent_edge_range(from)
        .find(|&edge| facade.target(edge) == to && facade.edge_data(edge).forward)
}

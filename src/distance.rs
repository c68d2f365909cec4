//! Packed-path retrieval and distance annotation.
//!
//! Retrieval normalizes both halves of a meeting-point path into real
//! traversal order before unpacking, so the annotation logic is direction
//! free: sum the per-segment lengths over all but the final node, subtract
//! the real source phantom's offset at the start, add the real target
//! phantom's offset at the end.

use crate::bucket::BucketStore;
use crate::graph::GraphFacade;
use crate::heap::QueryHeap;
use crate::phantom::PhantomNode;
use crate::types::{Direction, EdgeDistance, NodeId, PackedPath, INVALID_EDGE_DISTANCE};
use crate::unpack::{compute_edge_distance, unpack_path_and_calculate_distance};

/// Walk the query heap's parent chain from `middle` back to the search
/// root, emitting edges oriented in real traversal order.
///
/// A forward search grows away from the real source, so the walk collects
/// `(parent, node)` edges and reverses them into source -> middle order. A
/// reverse search grows against the edges, so `(node, parent)` already *is*
/// real orientation and the walk order middle -> root needs no reversal.
pub(crate) fn retrieve_heap_leg(heap: &QueryHeap, middle: NodeId, direction: Direction) -> PackedPath {
    let mut path = PackedPath::new();
    let mut node = middle;
    loop {
        let data = heap.get_data(node);
        if data.parent == node {
            break;
        }
        match direction {
            Direction::Forward => path.push((data.parent, node, data.from_clique_arc)),
            Direction::Reverse => path.push((node, data.parent, data.from_clique_arc)),
        }
        node = data.parent;
    }
    if direction.is_forward() {
        path.reverse();
    }
    path
}

/// Walk the bucket parent chain for `column` from `middle` towards the
/// bucket search's root, emitting edges in real traversal order.
///
/// The bucket fill ran opposite to `direction`: under a forward sweep the
/// buckets came from a reverse search whose parent chain already runs
/// middle -> target in real orientation; under a reverse sweep they came
/// from a forward search and the collected leg must be flipped into
/// source -> middle order.
pub(crate) fn retrieve_bucket_leg(
    buckets: &BucketStore,
    middle: NodeId,
    column: u32,
    direction: Direction,
) -> PackedPath {
    let mut leg = PackedPath::new();
    let mut node = middle;
    while let Some(bucket) = buckets.find(node, column) {
        if bucket.parent == node {
            break;
        }
        match direction {
            Direction::Forward => leg.push((node, bucket.parent, bucket.from_clique_arc)),
            Direction::Reverse => leg.push((bucket.parent, node, bucket.from_clique_arc)),
        }
        node = bucket.parent;
    }
    if !direction.is_forward() {
        leg.reverse();
    }
    leg
}

/// Full packed path for a bidirectional meeting at `middle`, in real
/// traversal order from the real source phantom to the real target phantom.
pub fn retrieve_packed_path(
    heap: &QueryHeap,
    buckets: &BucketStore,
    middle: NodeId,
    column: u32,
    direction: Direction,
) -> PackedPath {
    let mut path;
    match direction {
        Direction::Forward => {
            path = retrieve_heap_leg(heap, middle, direction);
            path.extend(retrieve_bucket_leg(buckets, middle, column, direction));
        }
        Direction::Reverse => {
            path = retrieve_bucket_leg(buckets, middle, column, direction);
            path.extend(retrieve_heap_leg(heap, middle, direction));
        }
    }
    path
}

/// Distance between two phantoms on the same segment, where no graph edge
/// is traversed at all. Uses the side on which both phantoms are valid;
/// forward wins when the target lies further along.
pub(crate) fn same_edge_distance(source: &PhantomNode, target: &PhantomNode) -> EdgeDistance {
    if source.is_valid_forward_source()
        && target.is_valid_forward_target()
        && target.forward_distance > source.forward_distance
    {
        target.forward_distance - source.forward_distance
    } else if source.is_valid_reverse_source() && target.is_valid_reverse_target() {
        target.reverse_distance - source.reverse_distance
    } else {
        INVALID_EDGE_DISTANCE
    }
}

/// Unpack `packed` and sum real segment lengths, then correct both
/// boundaries by the phantom offsets. `source` and `target` are the *real*
/// roles: where the trip starts and where it ends, independent of which
/// search direction produced the path.
pub fn annotate_packed_path(
    facade: &GraphFacade,
    unpack_heap: &mut QueryHeap,
    packed: &PackedPath,
    source: &PhantomNode,
    target: &PhantomNode,
) -> EdgeDistance {
    if packed.is_empty() {
        return same_edge_distance(source, target);
    }

    let (_weight, nodes, _edges) = unpack_path_and_calculate_distance(facade, unpack_heap, packed);

    let mut distance: EdgeDistance = 0;
    for &node in &nodes[..nodes.len() - 1] {
        distance += compute_edge_distance(facade, node);
    }

    let first = nodes[0];
    let last = *nodes.last().expect("unpacked path has nodes");

    // The summation starts at the first segment's start; the trip starts at
    // the phantom partway along it.
    if source.forward_segment_id.id == first {
        distance -= source.forward_distance;
    } else if source.reverse_segment_id.id == first {
        distance -= source.reverse_distance;
    }
    // The summation stops before the last segment; the trip continues into
    // it up to the phantom.
    if target.forward_segment_id.id == last {
        distance += target.forward_distance;
    } else if target.reverse_segment_id.id == last {
        distance += target.reverse_distance;
    }

    distance
}

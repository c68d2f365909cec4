//! Core scalar types and sentinels shared across the matrix engine.
//!
//! Edge costs are nonnegative, but *accumulated* weights may be transiently
//! negative: phantom endpoints seed the search with negated segment offsets
//! that are only overcome once the search has crossed the segment.

/// Node in the edge-based routing graph.
pub type NodeId = u32;
/// Index of an edge in the facade's adjacency arrays.
pub type EdgeId = u32;
/// Cell identifier within one partition level.
pub type CellId = u32;
/// Partition level. Level 0 is the base graph; higher levels are coarser.
pub type LevelId = u8;

pub type EdgeWeight = i32;
pub type EdgeDuration = i32;
pub type EdgeDistance = i64;

/// Sentinel node id meaning "none".
pub const SPECIAL_NODEID: NodeId = u32::MAX;
/// Sentinel weight; compares as the maximum.
pub const INVALID_EDGE_WEIGHT: EdgeWeight = i32::MAX;
/// Sentinel duration for unreachable entries; compares as the maximum.
pub const MAXIMAL_EDGE_DURATION: EdgeDuration = i32::MAX;
/// Sentinel distance for unreachable entries; compares as the maximum.
pub const INVALID_EDGE_DISTANCE: EdgeDistance = i64::MAX;
/// Sentinel level meaning "do not expand from this node".
pub const INVALID_LEVEL_ID: LevelId = u8::MAX;

/// Search direction. Forward walks edges as signposted; Reverse walks the
/// transposed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    #[inline]
    pub fn flip(self) -> Direction {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    #[inline]
    pub fn is_forward(self) -> bool {
        matches!(self, Direction::Forward)
    }
}

/// One hop of a packed path: `(from, to, from_clique_arc)`, oriented in real
/// traversal order regardless of which search direction produced it.
pub type PackedEdge = (NodeId, NodeId, bool);
/// Packed edges in traversal order from the real source towards the real
/// target. Clique arcs still need unpacking before distances can be summed.
pub type PackedPath = Vec<PackedEdge>;

//! Phantom nodes - virtual trip endpoints lying on an edge.
//!
//! A phantom carries one segment per travel direction of the underlying
//! edge. Each side stores the cost from the segment start to the phantom
//! position, so a source is seeded with the *negated* cost (the residual is
//! paid back as the search leaves the segment) and a target contributes the
//! positive cost on top of the searched leg.

use crate::types::{EdgeDistance, EdgeDuration, EdgeWeight, NodeId, INVALID_EDGE_WEIGHT};

/// One directed segment of a phantom's underlying edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentId {
    pub id: NodeId,
    pub enabled: bool,
}

impl SegmentId {
    pub const DISABLED: SegmentId = SegmentId {
        id: crate::types::SPECIAL_NODEID,
        enabled: false,
    };

    pub fn new(id: NodeId) -> Self {
        SegmentId { id, enabled: true }
    }
}

/// A snapped trip endpoint. Produced by the (external) snapping stage;
/// the engine only reads it.
#[derive(Debug, Clone, Copy)]
pub struct PhantomNode {
    pub forward_segment_id: SegmentId,
    pub reverse_segment_id: SegmentId,
    pub forward_weight: EdgeWeight,
    pub reverse_weight: EdgeWeight,
    pub forward_weight_offset: EdgeWeight,
    pub reverse_weight_offset: EdgeWeight,
    pub forward_duration: EdgeDuration,
    pub reverse_duration: EdgeDuration,
    pub forward_distance: EdgeDistance,
    pub reverse_distance: EdgeDistance,
}

impl PhantomNode {
    #[inline]
    pub fn forward_weight_plus_offset(&self) -> EdgeWeight {
        self.forward_weight + self.forward_weight_offset
    }

    #[inline]
    pub fn reverse_weight_plus_offset(&self) -> EdgeWeight {
        self.reverse_weight + self.reverse_weight_offset
    }

    #[inline]
    pub fn is_valid_forward_source(&self) -> bool {
        self.forward_segment_id.enabled && self.forward_weight != INVALID_EDGE_WEIGHT
    }

    #[inline]
    pub fn is_valid_forward_target(&self) -> bool {
        self.is_valid_forward_source()
    }

    #[inline]
    pub fn is_valid_reverse_source(&self) -> bool {
        self.reverse_segment_id.enabled && self.reverse_weight != INVALID_EDGE_WEIGHT
    }

    #[inline]
    pub fn is_valid_reverse_target(&self) -> bool {
        self.is_valid_reverse_source()
    }
}

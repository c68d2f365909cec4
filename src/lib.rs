//! Butterfly-Matrix: many-to-many travel time/distance tables over a
//! multi-level partitioned road graph.
//!
//! The engine runs Multi-Level Dijkstra (MLD) queries against a compiled
//! facade: a hierarchical partition whose cells carry precomputed shortcut
//! tables between their boundary nodes. A table query decomposes into:
//!
//! - one-to-many / many-to-one: a single unidirectional search resolving a
//!   target index of opposite-side phantoms
//! - many-to-many: per-target backward searches fill a sorted bucket store,
//!   then per-source forward searches join against it
//! - optional distances: packed paths through each meeting node are
//!   unpacked to real segments and corrected by phantom offsets
//!
//! Queries are sequential; concurrency happens across queries, each worker
//! owning its own [`EngineWorkingData`] against the shared read-only
//! [`GraphFacade`].

pub mod bucket;
pub mod cells;
pub mod distance;
pub mod graph;
pub mod heap;
pub mod many_to_many;
pub mod one_to_many;
pub mod partition;
pub mod phantom;
pub mod relax;
pub mod test_utils;
pub mod types;
pub mod unpack;
pub mod working_data;

pub use graph::{EdgeData, GraphFacade};
pub use many_to_many::{many_to_many_bidirectional, many_to_many_search, TableResult, TableStats};
pub use one_to_many::one_to_many_search;
pub use phantom::{PhantomNode, SegmentId};
pub use types::{
    Direction, EdgeDistance, EdgeDuration, EdgeWeight, LevelId, NodeId, INVALID_EDGE_DISTANCE,
    INVALID_EDGE_WEIGHT, INVALID_LEVEL_ID, MAXIMAL_EDGE_DURATION, SPECIAL_NODEID,
};
pub use working_data::EngineWorkingData;

use crate::frustum::Classification;
use crate::octree::{Node, NodePath, SpatialRegion};
use std::sync::Arc;

/// Copy of one node as seen by a query at the time the snapshot was taken.
///
/// The decoded payload is shared with the cache (it is immutable); the traversal
/// fields are copied out of the query, so later processing never changes them.
#[derive(Clone, Debug)]
pub struct NodeSnapshot {
    pub path: NodePath,
    pub region: SpatialRegion,
    pub node: Arc<Node>,
    pub classification: Classification,
    /// Bit `i` set: the renderer still has to draw this node's own points for
    /// octant `i`, since no visible child replaces them.
    pub placeholder_octants: u8,
    pub override_color: Option<[u8; 3]>,
    /// Whether the query already processed this node (count, detail test, children).
    pub processed: bool,
}

impl NodeSnapshot {
    pub fn shows_octant(&self, octant: u8) -> bool {
        octant < 8 && self.placeholder_octants & (1 << octant) != 0
    }

    pub fn level(&self) -> u32 {
        self.region.level()
    }
}

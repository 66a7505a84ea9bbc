pub mod node;
pub mod region;
pub mod snapshot;

pub use node::{DecodeError, Node, PointRecord};
pub use region::{InvalidRegion, SpatialRegion};
pub use snapshot::NodeSnapshot;

use std::borrow::Borrow;
use std::fmt;

/// Identifies a node within a tree.
///
/// A root path is `<tree>/f1`; every level below appends the octant digit (`0`-`7`)
/// of the child, so the last character tells which octant of its parent a node is.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(String);

impl NodePath {
    pub fn root(tree_name: &str) -> Self {
        Self(format!("{tree_name}/f1"))
    }

    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn child(&self, octant: u8) -> Self {
        debug_assert!(octant < 8, "octant out of range: {octant}");
        let mut path = String::with_capacity(self.0.len() + 1);
        path.push_str(&self.0);
        path.push(char::from(b'0' + octant));
        Self(path)
    }

    /// Octant encoded by the trailing character.
    pub fn octant(&self) -> Option<u8> {
        self.0
            .chars()
            .last()
            .and_then(|c| c.to_digit(8))
            .map(|digit| digit as u8)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` lies in the subtree rooted at `ancestor` (inclusive).
    pub fn starts_with(&self, ancestor: &NodePath) -> bool {
        self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

use crate::octree::NodePath;
use crate::octree::region::SpatialRegion;
use crate::point::PointData;
use binrw::{BinRead, BinWrite, binrw};
use glam::{DVec3, U8Vec3};
use std::io::Cursor;
use thiserror::Error;

/// Size in bytes of one quantized point record.
pub const POINT_RECORD_SIZE: usize = 6;

/// Points per axis of the grid a node's summary points are snapped to.
pub const NODE_RESOLUTION: f64 = 64.0;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Empty node payload")]
    Empty,

    #[error("Payload of {len} bytes is not a mask byte followed by 6-byte point records")]
    Misaligned { len: usize },

    #[error("Invalid binary data: {0}")]
    InvalidBinaryData(#[from] binrw::Error),
}

/// One quantized point: position bytes span the node region, colour is raw RGB.
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PointRecord {
    pub position: [u8; 3],
    pub color: [u8; 3],
}

impl PointRecord {
    /// Lowest colour bit, set by the writer on points that came from a leaf.
    pub fn is_leaf_point(&self) -> bool {
        self.color[2] & 1 == 1
    }
}

#[binrw]
#[brw(little)]
#[br(import(num_points: usize))]
struct NodePayload {
    children_mask: u8,
    #[br(count = num_points)]
    points: Vec<PointRecord>,
}

/// A decoded octree node.
///
/// The payload never changes after decoding, so a node can be shared between the
/// cache and any number of queries. Traversal state lives with the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    path: NodePath,
    region: SpatialRegion,
    children_mask: u8,
    points: Vec<PointRecord>,
}

impl Node {
    pub fn new(
        path: NodePath,
        region: SpatialRegion,
        children_mask: u8,
        points: Vec<PointRecord>,
    ) -> Self {
        Self {
            path,
            region,
            children_mask,
            points,
        }
    }

    /// Decode the raw bytes fetched for `path`.
    pub fn decode(path: NodePath, region: SpatialRegion, buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.is_empty() {
            return Err(DecodeError::Empty);
        }
        if (buf.len() - 1) % POINT_RECORD_SIZE != 0 {
            return Err(DecodeError::Misaligned { len: buf.len() });
        }
        let num_points = (buf.len() - 1) / POINT_RECORD_SIZE;

        let mut cursor = Cursor::new(buf);
        let payload = NodePayload::read_le_args(&mut cursor, (num_points,))?;

        Ok(Self {
            path,
            region,
            children_mask: payload.children_mask,
            points: payload.points,
        })
    }

    /// Serialize back to the on-disk layout.
    pub fn encode(&self) -> Result<Vec<u8>, DecodeError> {
        let payload = NodePayload {
            children_mask: self.children_mask,
            points: self.points.clone(),
        };
        let mut cursor = Cursor::new(Vec::with_capacity(
            1 + self.points.len() * POINT_RECORD_SIZE,
        ));
        payload.write_le(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn region(&self) -> &SpatialRegion {
        &self.region
    }

    pub fn children_mask(&self) -> u8 {
        self.children_mask
    }

    pub fn is_leaf(&self) -> bool {
        self.children_mask == 0
    }

    pub fn has_child(&self, octant: u8) -> bool {
        octant < 8 && (1 << octant) & self.children_mask != 0
    }

    pub fn num_children(&self) -> u32 {
        self.children_mask.count_ones()
    }

    /// Edge length of the node cube.
    pub fn scale(&self) -> f64 {
        self.region.edge()
    }

    /// Lower corner of the node cube.
    pub fn offset(&self) -> DVec3 {
        self.region.lo()
    }

    pub fn center(&self) -> DVec3 {
        self.region.center()
    }

    pub fn bounding_radius(&self) -> f64 {
        self.region.bounding_radius()
    }

    /// Spacing between summary points, compared against the resolution threshold.
    pub fn node_size(&self) -> f64 {
        self.scale() / NODE_RESOLUTION
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn records(&self) -> &[PointRecord] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<PointData> {
        self.points.get(index).map(|record| self.dequantize(record))
    }

    pub fn points(&self) -> impl Iterator<Item = PointData> + '_ {
        self.points.iter().map(|record| self.dequantize(record))
    }

    fn dequantize(&self, record: &PointRecord) -> PointData {
        let scale = self.scale();
        let [x, y, z] = record.position;
        PointData {
            position: self.offset()
                + DVec3::new(x as f64, y as f64, z as f64) * (scale / 255.0),
            color: U8Vec3::from_array(record.color),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> SpatialRegion {
        SpatialRegion::new(DVec3::new(10.0, 20.0, 30.0), DVec3::new(12.0, 22.0, 32.0)).unwrap()
    }

    #[test]
    fn decodes_mask_and_points() {
        let buf = [0b1000_0001, 0, 255, 51, 1, 2, 3, 255, 0, 0, 9, 8, 6];
        let node = Node::decode(NodePath::root("t"), region(), &buf).unwrap();

        assert_eq!(node.children_mask(), 0b1000_0001);
        assert!(node.has_child(0));
        assert!(node.has_child(7));
        assert!(!node.has_child(3));
        assert!(!node.is_leaf());
        assert_eq!(node.num_children(), 2);
        assert_eq!(node.num_points(), 2);

        let first = node.point(0).unwrap();
        assert!(first.position.abs_diff_eq(DVec3::new(10.0, 22.0, 30.4), 1e-9));
        assert_eq!(first.color, U8Vec3::new(1, 2, 3));
        assert!(node.records()[0].is_leaf_point());
        assert!(!node.records()[1].is_leaf_point());

        let second = node.point(1).unwrap();
        assert!(second.position.abs_diff_eq(DVec3::new(12.0, 20.0, 30.0), 1e-9));
        assert!(node.point(2).is_none());
    }

    #[test]
    fn mask_only_payload_is_an_empty_node() {
        let node = Node::decode(NodePath::root("t"), region(), &[0]).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.num_points(), 0);
    }

    #[test]
    fn rejects_empty_and_misaligned_payloads() {
        assert!(matches!(
            Node::decode(NodePath::root("t"), region(), &[]),
            Err(DecodeError::Empty)
        ));
        assert!(matches!(
            Node::decode(NodePath::root("t"), region(), &[1, 2, 3, 4]),
            Err(DecodeError::Misaligned { len: 4 })
        ));
    }

    #[test]
    fn encode_matches_wire_layout() {
        let node = Node::new(
            NodePath::root("t"),
            region(),
            0b10,
            vec![PointRecord {
                position: [1, 2, 3],
                color: [4, 5, 6],
            }],
        );
        assert_eq!(node.encode().unwrap(), vec![0b10, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn derived_geometry() {
        let node = Node::new(NodePath::root("t"), region(), 0, Vec::new());
        assert_eq!(node.scale(), 2.0);
        assert_eq!(node.offset(), DVec3::new(10.0, 20.0, 30.0));
        assert_eq!(node.center(), DVec3::new(11.0, 21.0, 31.0));
        assert_eq!(node.node_size(), 2.0 / 64.0);
        assert!((node.bounding_radius() - 3f64.sqrt()).abs() < 1e-12);
    }
}

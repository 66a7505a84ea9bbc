use glam::{DVec3, U8Vec3};

/// A dequantized point in world coordinates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointData {
    pub position: DVec3,
    pub color: U8Vec3,
}

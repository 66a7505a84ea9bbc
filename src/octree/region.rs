use glam::DVec3;
use thiserror::Error;

/// Bit of an octant index selecting the upper half along X.
pub const X_BIT: u8 = 2;
/// Bit of an octant index selecting the upper half along Y.
pub const Y_BIT: u8 = 1;
/// Bit of an octant index selecting the upper half along Z.
pub const Z_BIT: u8 = 0;

const ROOT3: f64 = 1.732_050_807_568_877_2;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Invalid region: lo {lo} must be strictly below hi {hi} on every axis")]
pub struct InvalidRegion {
    pub lo: DVec3,
    pub hi: DVec3,
}

/// Axis aligned cube covered by one octree node.
///
/// Regions are immutable: subdividing returns a new region one level deeper.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialRegion {
    lo: DVec3,
    hi: DVec3,
    level: u32,
}

impl SpatialRegion {
    /// Root region (level 0) spanning `lo..hi`.
    pub fn new(lo: DVec3, hi: DVec3) -> Result<Self, InvalidRegion> {
        if lo.cmplt(hi).all() {
            Ok(Self { lo, hi, level: 0 })
        } else {
            Err(InvalidRegion { lo, hi })
        }
    }

    /// Cube of edge `size` centred on `center`.
    pub fn cube(center: DVec3, size: f64) -> Result<Self, InvalidRegion> {
        let half = DVec3::splat(size / 2.0);
        Self::new(center - half, center + half)
    }

    pub fn lo(&self) -> DVec3 {
        self.lo
    }

    pub fn hi(&self) -> DVec3 {
        self.hi
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn center(&self) -> DVec3 {
        (self.lo + self.hi) * 0.5
    }

    pub fn extent(&self) -> DVec3 {
        self.hi - self.lo
    }

    /// Edge length along X, the node scale used for dequantization.
    pub fn edge(&self) -> f64 {
        self.hi.x - self.lo.x
    }

    pub fn volume(&self) -> f64 {
        let extent = self.extent();
        extent.x * extent.y * extent.z
    }

    /// Radius of the sphere enclosing the cube.
    pub fn bounding_radius(&self) -> f64 {
        self.edge() / 2.0 * ROOT3
    }

    pub fn contains(&self, point: DVec3) -> bool {
        point.cmpge(self.lo).all() && point.cmple(self.hi).all()
    }

    /// Region of the child in `octant` (0-7).
    ///
    /// Midpoints are computed once so sibling regions share their faces exactly.
    pub fn child(&self, octant: u8) -> SpatialRegion {
        let mid = self.center();
        let mut lo = self.lo;
        let mut hi = self.hi;

        if octant & (1 << X_BIT) != 0 {
            lo.x = mid.x;
        } else {
            hi.x = mid.x;
        }
        if octant & (1 << Y_BIT) != 0 {
            lo.y = mid.y;
        } else {
            hi.y = mid.y;
        }
        if octant & (1 << Z_BIT) != 0 {
            lo.z = mid.z;
        } else {
            hi.z = mid.z;
        }

        SpatialRegion {
            lo,
            hi,
            level: self.level + 1,
        }
    }

    pub fn children(&self) -> [SpatialRegion; 8] {
        std::array::from_fn(|octant| self.child(octant as u8))
    }

    /// Octant of this region that contains `point` (upper half wins on the midplane).
    pub fn octant_of(&self, point: DVec3) -> u8 {
        let mid = self.center();
        let mut octant = 0;
        if point.x >= mid.x {
            octant |= 1 << X_BIT;
        }
        if point.y >= mid.y {
            octant |= 1 << Y_BIT;
        }
        if point.z >= mid.z {
            octant |= 1 << Z_BIT;
        }
        octant
    }
}

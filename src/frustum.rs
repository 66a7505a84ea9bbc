//! View frustum planes and bounding sphere classification.
//!
//! Planes are extracted from the projection matrix alone, so every point handed to
//! [`FrustumPlanes::classify`] must already be expressed in camera space (the camera
//! looks down -Z, OpenGL clip convention).

use glam::{DMat4, DVec3, DVec4};

/// Where a bounding sphere lies relative to the view frustum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    /// Completely outside: the subtree is pruned.
    Outside,
    /// Straddles at least one plane: children must be tested again.
    Intersecting,
    /// Completely inside: descendants inherit this without testing.
    Inside,
}

impl Classification {
    pub fn is_visible(self) -> bool {
        self != Classification::Outside
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrustumPlanes {
    /// right, left, bottom, top, near, far
    planes: [DVec4; 6],
}

impl FrustumPlanes {
    /// Extract the six clip planes of `projection` by combining its rows.
    pub fn from_projection(projection: &DMat4) -> Self {
        let r0 = projection.row(0);
        let r1 = projection.row(1);
        let r2 = projection.row(2);
        let r3 = projection.row(3);

        let planes = [r3 - r0, r3 + r0, r3 + r1, r3 - r1, r3 + r2, r3 - r2].map(normalize_plane);

        Self { planes }
    }

    pub fn planes(&self) -> &[DVec4; 6] {
        &self.planes
    }

    /// Signed distance from `point` to every plane, positive on the inside.
    pub fn distances(&self, point: DVec3) -> [f64; 6] {
        self.planes.map(|plane| plane.truncate().dot(point) + plane.w)
    }

    pub fn classify(&self, center: DVec3, radius: f64) -> Classification {
        let mut min_distance = f64::INFINITY;
        for distance in self.distances(center) {
            if distance < -radius {
                return Classification::Outside;
            }
            min_distance = min_distance.min(distance);
        }

        if min_distance > radius {
            Classification::Inside
        } else {
            Classification::Intersecting
        }
    }
}

fn normalize_plane(plane: DVec4) -> DVec4 {
    let norm = plane.truncate().length();
    if norm > 0.0 { plane / norm } else { plane }
}

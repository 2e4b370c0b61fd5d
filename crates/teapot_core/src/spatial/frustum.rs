//! View frustum for visibility culling

use crate::foundation::math::{Mat4, Vec3, Vec4};

use super::{Aabb, Containment, Plane};

/// Frustum for visibility culling
///
/// Plane normals point into the visible volume.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes in the order left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    #[must_use]
    pub const fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from `projection * view` (Gribb-Hartmann)
    ///
    /// Assumes clip-space depth in `[0, 1]`.
    #[must_use]
    pub fn from_matrix(view_projection: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_coefficients(&(r3 + r0)),
                Plane::from_coefficients(&(r3 - r0)),
                Plane::from_coefficients(&(r3 + r1)),
                Plane::from_coefficients(&(r3 - r1)),
                Plane::from_coefficients(&r2),
                Plane::from_coefficients(&(r3 - r2)),
            ],
        }
    }

    /// Classify a box against the frustum
    ///
    /// Uses the box center and half extents projected onto each plane normal.
    /// Boxes near a corner of the frustum may be reported as intersecting
    /// although they are outside; never the other way round.
    #[must_use]
    pub fn classify(&self, aabb: &Aabb) -> Containment {
        if aabb.is_empty() {
            return Containment::Outside;
        }
        let center = aabb.center();
        let half = aabb.extents();
        let mut result = Containment::Inside;
        for plane in &self.planes {
            let radius = half.dot(&plane.normal.abs());
            let dist = plane.distance_to_point(&center);
            if dist + radius < 0.0 {
                return Containment::Outside;
            }
            if dist - radius < 0.0 {
                result = Containment::Intersects;
            }
        }
        result
    }

    /// Check if an AABB is inside or intersects the frustum
    #[must_use]
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.classify(aabb) != Containment::Outside
    }

    /// Point containment
    #[must_use]
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.planes.iter().all(|p| p.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{frustum, look_at_dir, ortho};

    fn camera_frustum() -> Frustum {
        let view = look_at_dir(&Vec3::new(0.0, 0.0, 10.0), &Vec3::new(0.0, 0.0, -1.0), &Vec3::y());
        let proj = frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 100.0);
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn planes_are_normalized() {
        for plane in &camera_frustum().planes {
            approx::assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn classification() {
        let f = camera_frustum();
        let centered = Aabb::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0));
        assert_eq!(f.classify(&centered), Containment::Inside);

        let behind = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 20.0), Vec3::repeat(1.0));
        assert_eq!(f.classify(&behind), Containment::Outside);

        let beside = Aabb::from_center_extents(Vec3::new(50.0, 0.0, 0.0), Vec3::repeat(1.0));
        assert_eq!(f.classify(&beside), Containment::Outside);

        let across_near = Aabb::from_center_extents(Vec3::new(0.0, 0.0, 9.0), Vec3::repeat(0.5));
        assert_eq!(f.classify(&across_near), Containment::Intersects);

        assert_eq!(f.classify(&Aabb::empty()), Containment::Outside);
    }

    #[test]
    fn orthographic_frustum_is_a_box() {
        let view = look_at_dir(&Vec3::new(0.0, 0.0, 10.0), &Vec3::new(0.0, 0.0, -1.0), &Vec3::y());
        let f = Frustum::from_matrix(&(ortho(-5.0, 5.0, -5.0, 5.0, 1.0, 20.0) * view));
        assert!(f.contains_point(&Vec3::new(4.9, -4.9, 0.0)));
        assert!(!f.contains_point(&Vec3::new(5.1, 0.0, 0.0)));
        assert!(!f.contains_point(&Vec3::new(0.0, 0.0, 9.5)));
    }
}

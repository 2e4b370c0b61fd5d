//! Planes in Hessian normal form

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Plane defined by normal and distance from origin
///
/// Points `p` on the plane satisfy `normal · p + distance == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Signed offset along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    #[must_use]
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let len = normal.norm();
        if len > 0.0 {
            Self { normal: normal / len, distance: distance / len }
        } else {
            Self { normal, distance }
        }
    }

    /// Plane through `point` with the given normal
    #[must_use]
    pub fn from_point_normal(point: &Vec3, normal: &Vec3) -> Self {
        let n = normal.normalize();
        Self { normal: n, distance: -n.dot(point) }
    }

    /// Plane from raw `(a, b, c, d)` coefficients, normalized
    #[must_use]
    pub fn from_coefficients(c: &Vec4) -> Self {
        Self::new(c.xyz(), c.w)
    }

    /// Coefficients as a 4-vector `(normal, distance)`
    #[must_use]
    pub fn coefficients(&self) -> Vec4 {
        Vec4::new(self.normal.x, self.normal.y, self.normal.z, self.distance)
    }

    /// Calculate signed distance from plane to point
    #[must_use]
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Parameter `t` where `origin + t * direction` meets the plane
    ///
    /// `None` when the line runs parallel to the plane.
    #[must_use]
    pub fn intersect_line(&self, origin: &Vec3, direction: &Vec3) -> Option<f32> {
        let denom = self.normal.dot(direction);
        if denom.abs() < f32::EPSILON {
            return None;
        }
        Some(-self.distance_to_point(origin) / denom)
    }

    /// Planar projection matrix casting geometry onto this plane from a
    /// point light
    ///
    /// Multiplying a world transform by the result flattens the geometry into
    /// its shadow on the plane.
    #[must_use]
    pub fn shadow_matrix(&self, light: &Vec3) -> Mat4 {
        let p = self.coefficients();
        let l = Vec4::new(light.x, light.y, light.z, 1.0);
        let dot = p.dot(&l);
        Mat4::identity() * dot - l * p.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::transform_point;
    use approx::assert_relative_eq;

    #[test]
    fn constructor_normalizes() {
        let p = Plane::new(Vec3::new(0.0, 2.0, 0.0), 4.0);
        assert_relative_eq!(p.normal, Vec3::y());
        assert_relative_eq!(p.distance, 2.0);
        assert_relative_eq!(p.distance_to_point(&Vec3::new(5.0, -2.0, 1.0)), 0.0);
    }

    #[test]
    fn line_intersection_and_parallel_case() {
        let ground = Plane::from_point_normal(&Vec3::zeros(), &Vec3::y());
        let t = ground
            .intersect_line(&Vec3::new(0.0, 4.0, 0.0), &Vec3::new(1.0, -2.0, 0.0))
            .unwrap();
        assert_relative_eq!(t, 2.0);
        assert!(ground.intersect_line(&Vec3::y(), &Vec3::x()).is_none());
    }

    #[test]
    fn shadow_matrix_flattens_onto_plane() {
        let ground = Plane::from_point_normal(&Vec3::new(0.0, -1.0, 0.0), &Vec3::y());
        let light = Vec3::new(0.0, 10.0, 0.0);
        let shadow = ground.shadow_matrix(&light);

        let p = transform_point(&shadow, &Vec3::new(1.0, 4.0, 2.0));
        assert_relative_eq!(p.y, -1.0, epsilon = 1e-5);
        // Point, light and shadow are collinear
        let to_point = (Vec3::new(1.0, 4.0, 2.0) - light).normalize();
        let to_shadow = (p - light).normalize();
        assert_relative_eq!(to_point, to_shadow, epsilon = 1e-5);
    }
}

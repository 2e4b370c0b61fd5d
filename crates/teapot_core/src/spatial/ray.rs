//! Rays for picking and hit tests
//!
//! Rays built from the screen run from the near plane (`t = 0`) to the far
//! plane (`t = 1`), so `t` values from different tests are directly comparable.

use crate::foundation::math::{transform_point, transform_vector, Mat4, Vec2, Vec3};

use super::Aabb;

/// Barycentric slack so hits on shared triangle edges are not lost
const EDGE_TOLERANCE: f32 = 0.001;

/// Half-line with an unnormalized direction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Direction; its length defines the unit of `t`
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray from origin and direction
    #[must_use]
    pub const fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Build a picking ray through a window coordinate
    ///
    /// # Arguments
    /// * `screen` - Pixel position with the origin at the top-left corner
    /// * `display` - Window size in pixels
    /// * `inverse_view_projection` - Inverse of `projection * view`
    #[must_use]
    pub fn from_screen(screen: Vec2, display: Vec2, inverse_view_projection: &Mat4) -> Self {
        let ndc_x = 2.0 * screen.x / display.x - 1.0;
        let ndc_y = 2.0 * (display.y - screen.y) / display.y - 1.0;
        let near = transform_point(inverse_view_projection, &Vec3::new(ndc_x, ndc_y, 0.0));
        let far = transform_point(inverse_view_projection, &Vec3::new(ndc_x, ndc_y, 1.0));
        Self::new(near, far - near)
    }

    /// Point at parameter `t`
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray mapped through an affine transform; `t` values are preserved
    #[must_use]
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self::new(
            transform_point(matrix, &self.origin),
            transform_vector(matrix, &self.direction),
        )
    }

    /// Slab test restricted to `[t0, t1]`
    ///
    /// Returns the entry parameter, clamped to `t0` when the ray starts inside.
    #[must_use]
    pub fn intersect_aabb(&self, aabb: &Aabb, t0: f32, t1: f32) -> Option<f32> {
        if aabb.is_empty() {
            return None;
        }
        let mut t_min = t0;
        let mut t_max = t1;
        for axis in 0..3 {
            let o = self.origin[axis];
            let d = self.direction[axis];
            if d.abs() < f32::EPSILON {
                if o < aabb.min[axis] || o > aabb.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut near = (aabb.min[axis] - o) * inv;
            let mut far = (aabb.max[axis] - o) * inv;
            if near > far {
                std::mem::swap(&mut near, &mut far);
            }
            t_min = t_min.max(near);
            t_max = t_max.min(far);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }

    /// Möller–Trumbore triangle test, accepting both windings
    ///
    /// Returns the ray parameter of the hit.
    #[must_use]
    pub fn intersect_triangle(&self, a: &Vec3, b: &Vec3, c: &Vec3) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(&edge2);
        let det = edge1.dot(&p);
        if det.abs() < 1.0e-12 {
            return None;
        }
        let inv_det = 1.0 / det;

        let s = self.origin - a;
        let u = s.dot(&p) * inv_det;
        if !(-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = self.direction.dot(&q) * inv_det;
        if v < -EDGE_TOLERANCE || u + v > 1.0 + EDGE_TOLERANCE {
            return None;
        }

        let t = edge2.dot(&q) * inv_det;
        (t >= 0.0).then_some(t)
    }

    /// Parameter of the closest approach to `point` and the squared distance there
    ///
    /// The parameter is clamped to `t >= 0`.
    #[must_use]
    pub fn closest_to_point(&self, point: &Vec3) -> (f32, f32) {
        let len_sq = self.direction.norm_squared();
        if len_sq == 0.0 {
            return (0.0, (point - self.origin).norm_squared());
        }
        let t = ((point - self.origin).dot(&self.direction) / len_sq).max(0.0);
        (t, (self.at(t) - point).norm_squared())
    }

    /// Closest approach between the ray and segment `a`–`b`
    ///
    /// Returns the ray parameter and the squared distance between the two
    /// closest points.
    #[must_use]
    pub fn closest_to_segment(&self, a: &Vec3, b: &Vec3) -> (f32, f32) {
        let seg = b - a;
        let seg_len_sq = seg.norm_squared();
        if seg_len_sq == 0.0 {
            return self.closest_to_point(a);
        }
        let d = self.direction;
        let r = self.origin - a;
        let dd = d.dot(&d);
        let ds = d.dot(&seg);
        let dr = d.dot(&r);
        let sr = seg.dot(&r);
        let denom = dd * seg_len_sq - ds * ds;

        // Segment parameter first, then the ray parameter that matches it
        let mut s = if denom.abs() > f32::EPSILON {
            ((dd * sr - ds * dr) / denom).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let mut t = if dd > 0.0 { (s * ds - dr) / dd } else { 0.0 };
        if t < 0.0 {
            // Segment lies behind the origin: project the origin instead
            t = 0.0;
            s = (sr / seg_len_sq).clamp(0.0, 1.0);
        }
        let on_ray = self.at(t);
        let on_seg = a + seg * s;
        (t, (on_ray - on_seg).norm_squared())
    }
}

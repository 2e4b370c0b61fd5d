//! Axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

use crate::foundation::math::{transform_point, Mat4, Vec3};

/// How one box (or the box under test) relates to a bounding volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// Completely outside
    Outside,
    /// Partially overlapping
    Intersects,
    /// Completely inside
    Inside,
}

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Create a new AABB from min and max points
    #[must_use]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    #[must_use]
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// The empty box: neutral element of [`Aabb::union`], never valid
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Smallest box containing every point
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Vec3>,
    {
        points.into_iter().fold(Self::empty(), |mut acc, p| {
            acc.min = acc.min.inf(p);
            acc.max = acc.max.sup(p);
            acc
        })
    }

    /// Get the center of the AABB
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    #[must_use]
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full edge lengths
    #[must_use]
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// A box is valid when every extent is a non-negative number and at
    /// least one of them is non-zero.
    ///
    /// Empty boxes, single points and boxes carrying NaN are invalid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let size = self.size();
        let well_formed = size.iter().all(|s| s.is_finite() && *s >= 0.0);
        well_formed && size.iter().any(|s| *s > 0.0)
    }

    /// True when nothing has been accumulated into the box yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Check if this AABB contains a point
    #[must_use]
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if `other` lies completely inside this box (faces may touch)
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Classify `other` against this box
    #[must_use]
    pub fn classify(&self, other: &Self) -> Containment {
        if self.contains(other) {
            Containment::Inside
        } else if self.intersects(other) {
            Containment::Intersects
        } else {
            Containment::Outside
        }
    }

    /// Smallest box containing both
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Grow in place to include `other`
    pub fn merge(&mut self, other: &Self) {
        *self = self.union(other);
    }

    /// Index of the longest axis; ties resolve to the lower axis (x, then y, then z)
    #[must_use]
    pub fn longest_axis(&self) -> usize {
        let size = self.size();
        let mut axis = 0;
        for candidate in 1..3 {
            if size[candidate] > size[axis] {
                axis = candidate;
            }
        }
        axis
    }

    /// Split at the midpoint of the longest axis into (lower, upper) halves
    #[must_use]
    pub fn split(&self) -> (Self, Self) {
        let axis = self.longest_axis();
        let mid = (self.min[axis] + self.max[axis]) * 0.5;

        let mut lower = *self;
        lower.max[axis] = mid;
        let mut upper = *self;
        upper.min[axis] = mid;
        (lower, upper)
    }

    /// The eight corner points
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// Box enclosing this box after transformation by `matrix`
    ///
    /// The empty box stays empty.
    #[must_use]
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }
        let corners = self.corners().map(|c| transform_point(matrix, &c));
        Self::from_points(corners.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::rotation_deg;
    use approx::assert_relative_eq;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::zeros(), Vec3::repeat(1.0))
    }

    #[test]
    fn validity_rules() {
        assert!(unit_box().is_valid());
        // Flat boxes are still valid
        assert!(Aabb::new(Vec3::zeros(), Vec3::new(1.0, 0.0, 1.0)).is_valid());
        assert!(!Aabb::empty().is_valid());
        assert!(!Aabb::new(Vec3::repeat(2.0), Vec3::repeat(2.0)).is_valid());
        assert!(!Aabb::new(Vec3::zeros(), Vec3::new(f32::NAN, 1.0, 1.0)).is_valid());
        assert!(!Aabb::new(Vec3::repeat(1.0), Vec3::zeros()).is_valid());
    }

    #[test]
    fn union_with_empty_is_identity() {
        let b = unit_box();
        assert_eq!(Aabb::empty().union(&b), b);
        let pts = [Vec3::new(-1.0, 2.0, 0.0), Vec3::new(3.0, -4.0, 1.0)];
        let from = Aabb::from_points(pts.iter());
        assert_eq!(from.min, Vec3::new(-1.0, -4.0, 0.0));
        assert_eq!(from.max, Vec3::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn classify_inside_touching_and_outside() {
        let outer = Aabb::new(Vec3::zeros(), Vec3::repeat(10.0));
        assert_eq!(outer.classify(&unit_box()), Containment::Inside);
        let straddling = Aabb::new(Vec3::repeat(9.0), Vec3::repeat(11.0));
        assert_eq!(outer.classify(&straddling), Containment::Intersects);
        let far = Aabb::new(Vec3::repeat(20.0), Vec3::repeat(21.0));
        assert_eq!(outer.classify(&far), Containment::Outside);
    }

    #[test]
    fn split_halves_longest_axis_with_x_tie_break() {
        let cube = Aabb::new(Vec3::zeros(), Vec3::repeat(4.0));
        let (lo, hi) = cube.split();
        assert_eq!(lo.max, Vec3::new(2.0, 4.0, 4.0));
        assert_eq!(hi.min, Vec3::new(2.0, 0.0, 0.0));

        let tall = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 8.0));
        assert_eq!(tall.longest_axis(), 2);
        let (lo, hi) = tall.split();
        assert_relative_eq!(lo.max.z, 4.0);
        assert_relative_eq!(hi.min.z, 4.0);
    }

    #[test]
    fn transformed_box_encloses_rotated_corners() {
        let b = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::repeat(1.0));
        let rotated = b.transformed(&rotation_deg(&Vec3::z(), 45.0));
        let r = 2.0_f32.sqrt();
        assert_relative_eq!(rotated.max.x, r, epsilon = 1e-5);
        assert_relative_eq!(rotated.max.z, 1.0, epsilon = 1e-5);
        assert!(Aabb::empty().transformed(&Mat4::identity()).is_empty());
    }
}

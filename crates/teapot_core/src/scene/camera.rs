//! Scene cameras
//!
//! A camera is a fixed viewpoint shipped with a scene (or synthesized to frame
//! it). Interactive changes are kept in the controller, so cameras never
//! change after creation.

use crate::foundation::math::{inverse_or_unchanged, look_at_dir, transform_point, transform_vector, Mat4, Vec3};

/// Named viewpoint with a default view window
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    name: String,
    width: f32,
    height: f32,
    near: f32,
    far: f32,
    position: Vec3,
    direction: Vec3,
    up: Vec3,
}

impl Camera {
    /// Create a camera
    ///
    /// # Arguments
    /// * `width`, `height` - Size of the view window at the near plane
    /// * `near`, `far` - Clip distances along the viewing direction
    /// * `position`, `direction`, `up` - Pose in world space
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        width: f32,
        height: f32,
        near: f32,
        far: f32,
        position: Vec3,
        direction: Vec3,
        up: Vec3,
    ) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            near,
            far,
            position,
            direction,
            up,
        }
    }

    /// Recover a camera from a view matrix
    ///
    /// Used by importers whose formats store cameras as matrices.
    #[must_use]
    pub fn from_view_matrix(name: impl Into<String>, width: f32, height: f32, near: f32, far: f32, view: &Mat4) -> Self {
        let inv = inverse_or_unchanged(view);
        Self::new(
            name,
            width,
            height,
            near,
            far,
            transform_point(&inv, &Vec3::zeros()),
            transform_vector(&inv, &Vec3::new(0.0, 0.0, -1.0)),
            transform_vector(&inv, &Vec3::y()),
        )
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Window width at the near plane
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Window height at the near plane
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }

    /// Near clip distance
    #[must_use]
    pub const fn near(&self) -> f32 {
        self.near
    }

    /// Far clip distance
    #[must_use]
    pub const fn far(&self) -> f32 {
        self.far
    }

    /// Eye position
    #[must_use]
    pub const fn position(&self) -> &Vec3 {
        &self.position
    }

    /// Viewing direction
    #[must_use]
    pub const fn direction(&self) -> &Vec3 {
        &self.direction
    }

    /// Up vector
    #[must_use]
    pub const fn up(&self) -> &Vec3 {
        &self.up
    }

    /// Orientation only: the view matrix of this camera moved to the origin
    #[must_use]
    pub fn rotation(&self) -> Mat4 {
        look_at_dir(&Vec3::zeros(), &self.direction, &self.up)
    }

    /// World-to-view matrix
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        look_at_dir(&self.position, &self.direction, &self.up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn view_matrix_round_trips_through_from_view_matrix() {
        let cam = Camera::new(
            "front",
            2.0,
            1.5,
            1.0,
            50.0,
            Vec3::new(3.0, 4.0, 10.0),
            Vec3::new(-0.3, -0.4, -1.0),
            Vec3::y(),
        );
        let back = Camera::from_view_matrix("copy", 2.0, 1.5, 1.0, 50.0, &cam.view_matrix());
        assert_relative_eq!(*back.position(), *cam.position(), epsilon = 1e-4);
        assert_relative_eq!(back.direction().normalize(), cam.direction().normalize(), epsilon = 1e-4);
        assert_relative_eq!(back.up().dot(back.direction()), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn rotation_has_no_translation() {
        let cam = Camera::new("c", 1.0, 1.0, 1.0, 10.0, Vec3::new(5.0, 5.0, 5.0), -Vec3::z(), Vec3::y());
        let r = cam.rotation();
        assert_relative_eq!(transform_point(&r, &Vec3::zeros()), Vec3::zeros());
    }
}

//! Math utilities and types
//!
//! Column-vector convention throughout: a point is transformed as `M * p`, and
//! a child placed under a parent ends up at `parent * local`.
//!
//! Projection matrices map view-space depth onto `[0, 1]` (near to far) in a
//! right-handed view space looking down `-Z`.

pub use nalgebra::{Matrix4, Unit, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Errors raised by fallible math operations
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Gauss elimination found no usable pivot in the given column
    #[error("Matrix is singular (zero pivot in column {0})")]
    SingularMatrix(usize),
}

/// Pivots with a magnitude below this are treated as zero
const PIVOT_EPSILON: f32 = 1.0e-12;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    #[must_use]
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    #[must_use]
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }
}

/// Invert a matrix by Gauss elimination with partial pivoting
///
/// # Errors
/// Returns [`MathError::SingularMatrix`] when a column has no non-zero pivot.
pub fn invert_gauss(matrix: &Mat4) -> Result<Mat4, MathError> {
    let mut a = *matrix;
    let mut inv = Mat4::identity();

    for col in 0..4 {
        let mut pivot = col;
        for row in (col + 1)..4 {
            if a[(row, col)].abs() > a[(pivot, col)].abs() {
                pivot = row;
            }
        }
        if a[(pivot, col)].abs() < PIVOT_EPSILON {
            return Err(MathError::SingularMatrix(col));
        }
        if pivot != col {
            a.swap_rows(pivot, col);
            inv.swap_rows(pivot, col);
        }

        let scale = 1.0 / a[(col, col)];
        for j in 0..4 {
            a[(col, j)] *= scale;
            inv[(col, j)] *= scale;
        }

        for row in 0..4 {
            if row == col {
                continue;
            }
            let factor = a[(row, col)];
            if factor == 0.0 {
                continue;
            }
            for j in 0..4 {
                a[(row, j)] -= factor * a[(col, j)];
                inv[(row, j)] -= factor * inv[(col, j)];
            }
        }
    }

    Ok(inv)
}

/// Best-effort inverse: logs and returns the input unchanged when singular
#[must_use]
pub fn inverse_or_unchanged(matrix: &Mat4) -> Mat4 {
    match invert_gauss(matrix) {
        Ok(inv) => inv,
        Err(err) => {
            log::warn!("{err}; keeping the matrix uninverted");
            *matrix
        }
    }
}

/// Transform a point with perspective divide
#[must_use]
pub fn transform_point(matrix: &Mat4, point: &Vec3) -> Vec3 {
    let v = matrix * Vec4::new(point.x, point.y, point.z, 1.0);
    if v.w == 0.0 || (v.w - 1.0).abs() < f32::EPSILON {
        v.xyz()
    } else {
        v.xyz() / v.w
    }
}

/// Transform a direction (ignores translation)
#[must_use]
pub fn transform_vector(matrix: &Mat4, vector: &Vec3) -> Vec3 {
    matrix.fixed_view::<3, 3>(0, 0) * vector
}

/// Off-center perspective projection
///
/// # Arguments
/// * `left`, `right`, `bottom`, `top` - Extents of the near-plane window
/// * `near`, `far` - Positive clip distances along `-Z`
#[must_use]
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let w = right - left;
    let h = top - bottom;
    let d = near - far;
    Mat4::new(
        2.0 * near / w, 0.0, (right + left) / w, 0.0,
        0.0, 2.0 * near / h, (top + bottom) / h, 0.0,
        0.0, 0.0, far / d, near * far / d,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// Orthographic projection
#[must_use]
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
    let w = right - left;
    let h = top - bottom;
    let d = near - far;
    Mat4::new(
        2.0 / w, 0.0, 0.0, -(right + left) / w,
        0.0, 2.0 / h, 0.0, -(top + bottom) / h,
        0.0, 0.0, 1.0 / d, near / d,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// View matrix from an eye position and a viewing direction
///
/// The rows of the rotation part are `side`, the re-orthogonalised `up` and
/// `-forward`; the eye is then moved to the origin.
#[must_use]
pub fn look_at_dir(eye: &Vec3, forward: &Vec3, up: &Vec3) -> Mat4 {
    let f = forward.normalize();
    let s = f.cross(up).normalize();
    let u = s.cross(&f);
    Mat4::new(
        s.x, s.y, s.z, -s.dot(eye),
        u.x, u.y, u.z, -u.dot(eye),
        -f.x, -f.y, -f.z, f.dot(eye),
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Rotation about `axis` by an angle in degrees
///
/// A zero-length axis yields the identity.
#[must_use]
pub fn rotation_deg(axis: &Vec3, degrees: f32) -> Mat4 {
    Unit::try_new(*axis, f32::EPSILON).map_or_else(Mat4::identity, |axis| {
        Mat4::from_axis_angle(&axis, utils::deg_to_rad(degrees))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gauss_inverse_matches_nalgebra() {
        let m = Mat4::new_translation(&Vec3::new(1.0, -2.0, 3.0))
            * rotation_deg(&Vec3::new(1.0, 1.0, 0.0), 35.0)
            * Mat4::new_nonuniform_scaling(&Vec3::new(2.0, 0.5, 4.0));
        let inv = invert_gauss(&m).unwrap();
        assert_relative_eq!(inv * m, Mat4::identity(), epsilon = 1e-5);
    }

    #[test]
    fn gauss_inverse_needs_pivoting() {
        // Leading zero forces a row swap
        let m = Mat4::new(
            0.0, 1.0, 0.0, 0.0,
            1.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 2.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        let inv = invert_gauss(&m).unwrap();
        assert_relative_eq!(m * inv, Mat4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn singular_matrix_is_reported_and_left_unchanged() {
        let m = Mat4::new_nonuniform_scaling(&Vec3::new(1.0, 0.0, 1.0));
        assert!(matches!(invert_gauss(&m), Err(MathError::SingularMatrix(1))));
        assert_eq!(inverse_or_unchanged(&m), m);
    }

    #[test]
    fn frustum_maps_near_and_far_to_unit_depth() {
        let p = frustum(-1.0, 1.0, -1.0, 1.0, 2.0, 10.0);
        assert_relative_eq!(transform_point(&p, &Vec3::new(0.0, 0.0, -2.0)).z, 0.0, epsilon = 1e-6);
        assert_relative_eq!(transform_point(&p, &Vec3::new(0.0, 0.0, -10.0)).z, 1.0, epsilon = 1e-6);
        let corner = transform_point(&p, &Vec3::new(1.0, 1.0, -2.0));
        assert_relative_eq!(corner.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(corner.y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn ortho_maps_box_to_clip_volume() {
        let p = ortho(-2.0, 2.0, -1.0, 1.0, 1.0, 5.0);
        let v = transform_point(&p, &Vec3::new(2.0, -1.0, -5.0));
        assert_relative_eq!(v, Vec3::new(1.0, -1.0, 1.0), epsilon = 1e-6);
        assert_relative_eq!(transform_point(&p, &Vec3::new(0.0, 0.0, -1.0)).z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn look_at_moves_eye_to_origin_looking_down_negative_z() {
        let eye = Vec3::new(0.0, 0.0, 5.0);
        let view = look_at_dir(&eye, &Vec3::new(0.0, 0.0, -1.0), &Vec3::y());
        assert_relative_eq!(transform_point(&view, &eye), Vec3::zeros(), epsilon = 1e-6);
        assert_relative_eq!(transform_point(&view, &Vec3::zeros()), Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn rotation_about_zero_axis_is_identity() {
        assert_eq!(rotation_deg(&Vec3::zeros(), 45.0), Mat4::identity());
        let r = rotation_deg(&Vec3::y(), 90.0);
        assert_relative_eq!(transform_vector(&r, &Vec3::x()), Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-6);
    }
}

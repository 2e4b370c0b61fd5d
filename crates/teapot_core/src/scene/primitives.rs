//! Procedural shapes
//!
//! Small builders for hosts and tests that need geometry without a file
//! loader, plus the axis gizmo drawn as a viewport overlay.

use std::sync::Arc;

use crate::foundation::math::Vec3;

use super::{Geometry, GroupNode, Material, PrimitiveType, SceneNode, ShapeNode, Vertex, VertexBuffer};

/// Axis-aligned cube with edge length `size`, as an indexed triangle list
#[must_use]
pub fn cube(center: Vec3, size: f32, material: Arc<Material>) -> SceneNode {
    let h = size * 0.5;
    // (normal, tangent u, tangent v) per face
    let faces = [
        (Vec3::x(), Vec3::y(), Vec3::z()),
        (-Vec3::x(), Vec3::z(), Vec3::y()),
        (Vec3::y(), Vec3::z(), Vec3::x()),
        (-Vec3::y(), Vec3::x(), Vec3::z()),
        (Vec3::z(), Vec3::x(), Vec3::y()),
        (-Vec3::z(), Vec3::y(), Vec3::x()),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = u32::try_from(vertices.len()).unwrap_or(u32::MAX);
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = center + (normal + u * su + v * sv) * h;
            vertices.push(Vertex::new(
                [p.x, p.y, p.z],
                [normal.x, normal.y, normal.z],
                [(su + 1.0) * 0.5, (sv + 1.0) * 0.5],
            ));
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let geometry = Geometry::new(
        PrimitiveType::Triangles,
        Arc::new(VertexBuffer::new(vertices)),
        Some(indices),
    );
    ShapeNode::new().with_geometry(material, geometry).into()
}

/// Single triangle
#[must_use]
pub fn triangle(a: Vec3, b: Vec3, c: Vec3, material: Arc<Material>) -> SceneNode {
    let geometry = Geometry::from_positions(PrimitiveType::Triangles, &[a, b, c]);
    ShapeNode::new().with_geometry(material, geometry).into()
}

/// Parallelogram spanned by `u` and `v` from `corner`, as a triangle strip
#[must_use]
pub fn quad(corner: Vec3, u: Vec3, v: Vec3, material: Arc<Material>) -> SceneNode {
    let geometry = Geometry::from_positions(
        PrimitiveType::TriangleStrip,
        &[corner, corner + u, corner + v, corner + u + v],
    );
    ShapeNode::new().with_geometry(material, geometry).into()
}

/// Polyline through `points`
#[must_use]
pub fn polyline(points: &[Vec3], material: Arc<Material>) -> SceneNode {
    let geometry = Geometry::from_positions(PrimitiveType::LineStrip, points);
    ShapeNode::new().with_geometry(material, geometry).into()
}

/// Three unit axes in red (x), green (y) and blue (z)
#[must_use]
pub fn axis_gizmo() -> SceneNode {
    let axes = [
        (Vec3::x(), Material::red()),
        (Vec3::y(), Material::green()),
        (Vec3::z(), Material::blue()),
    ];
    let mut shape = ShapeNode::new();
    for (axis, material) in axes {
        let mut material = (*material).clone();
        material.replaceable = false;
        shape.add_geometry(
            Arc::new(material),
            Geometry::from_positions(PrimitiveType::Lines, &[Vec3::zeros(), axis]),
        );
    }
    GroupNode::new().with_children([shape.into()]).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cube_is_centered_with_outward_faces() {
        let node = cube(Vec3::new(1.0, 2.0, 3.0), 2.0, Material::white());
        let bounds = node.bounds();
        assert_relative_eq!(bounds.min, Vec3::new(0.0, 1.0, 2.0));
        assert_relative_eq!(bounds.max, Vec3::new(2.0, 3.0, 4.0));

        let shape = node.as_shape().unwrap();
        let tris = shape.batches()[0].geometry.triangles();
        assert_eq!(tris.len(), 12);
        // Winding agrees with the stored face normal
        for t in &tris {
            let n = (t[1] - t[0]).cross(&(t[2] - t[0]));
            let outward = (t[0] + t[1] + t[2]) / 3.0 - Vec3::new(1.0, 2.0, 3.0);
            assert!(n.dot(&outward) > 0.0);
        }
    }

    #[test]
    fn gizmo_has_three_axes() {
        let gizmo = axis_gizmo();
        let group = gizmo.as_group().unwrap();
        let shape = group.child(0).unwrap().as_shape().unwrap();
        assert_eq!(shape.len(), 3);
        assert_relative_eq!(gizmo.bounds().max, Vec3::repeat(1.0));
    }

    #[test]
    fn quad_is_two_triangles() {
        let q = quad(Vec3::zeros(), Vec3::x(), Vec3::y(), Material::white());
        let shape = q.as_shape().unwrap();
        assert_eq!(shape.batches()[0].geometry.triangles().len(), 2);
    }
}

//! Vertex data and primitive batches

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use crate::foundation::math::Vec3;
use crate::spatial::Aabb;

/// How consecutive elements of a [`Geometry`] are assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// One point per element
    Points,
    /// Independent segments from element pairs
    Lines,
    /// Connected segments
    LineStrip,
    /// Independent triangles from element triples
    Triangles,
    /// Each element after the second closes a triangle with the previous two
    TriangleStrip,
    /// Triangles sharing the first element
    TriangleFan,
}

impl PrimitiveType {
    /// True for the three triangle layouts
    #[must_use]
    pub const fn is_surface(self) -> bool {
        matches!(self, Self::Triangles | Self::TriangleStrip | Self::TriangleFan)
    }
}

/// Vertex layout shared with the drivers
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Position in object space
    pub position: [f32; 3],

    /// Normal vector
    pub normal: [f32; 3],

    /// Texture coordinates
    pub tex_coord: [f32; 2],
}

impl Vertex {
    /// Create a new vertex
    #[must_use]
    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coord: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coord,
        }
    }

    /// Vertex with only a position
    #[must_use]
    pub fn at(position: Vec3) -> Self {
        Self::new([position.x, position.y, position.z], [0.0, 0.0, 0.0], [0.0, 0.0])
    }

    /// Position as a vector
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::from(self.position)
    }
}

/// Vertex array shared between geometry batches
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexBuffer {
    vertices: Vec<Vertex>,
}

impl VertexBuffer {
    /// Wrap a vertex list
    #[must_use]
    pub fn new(vertices: Vec<Vertex>) -> Self {
        Self { vertices }
    }

    /// Buffer built from bare positions
    #[must_use]
    pub fn from_positions(positions: &[Vec3]) -> Self {
        Self::new(positions.iter().map(|p| Vertex::at(*p)).collect())
    }

    /// Vertices in storage order
    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Raw bytes for upload
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    /// Number of vertices
    #[must_use]
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// True if the buffer holds no vertices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// One drawable batch: a primitive layout over a shared vertex buffer
///
/// The bounding box covers the referenced vertices only and is computed once
/// at construction.
#[derive(Debug, Clone)]
pub struct Geometry {
    primitive: PrimitiveType,
    vertices: Arc<VertexBuffer>,
    indices: Option<Vec<u32>>,
    bounds: Aabb,
}

impl Geometry {
    /// Create a batch
    ///
    /// Out-of-range indices stay in the index list but contribute nothing to
    /// the bounds, and primitives using them are skipped on assembly.
    #[must_use]
    pub fn new(primitive: PrimitiveType, vertices: Arc<VertexBuffer>, indices: Option<Vec<u32>>) -> Self {
        let mut geometry = Self {
            primitive,
            vertices,
            indices,
            bounds: Aabb::empty(),
        };
        let positions: Vec<Vec3> = geometry.positions().collect();
        geometry.bounds = Aabb::from_points(positions.iter());
        geometry
    }

    /// Non-indexed batch over fresh positions
    #[must_use]
    pub fn from_positions(primitive: PrimitiveType, positions: &[Vec3]) -> Self {
        Self::new(primitive, Arc::new(VertexBuffer::from_positions(positions)), None)
    }

    /// Primitive layout
    #[must_use]
    pub const fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    /// Shared vertex buffer
    #[must_use]
    pub const fn vertex_buffer(&self) -> &Arc<VertexBuffer> {
        &self.vertices
    }

    /// Optional index list
    #[must_use]
    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Cached object-space bounds
    #[must_use]
    pub const fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    /// Number of elements the primitive layout consumes
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.indices.as_ref().map_or_else(|| self.vertices.len(), Vec::len)
    }

    /// Element positions in draw order, skipping out-of-range indices
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        let vertices = self.vertices.vertices();
        let indexed = self.indices.as_ref().map(|indices| {
            indices
                .iter()
                .filter_map(|i| vertices.get(*i as usize))
                .map(Vertex::position)
        });
        let plain = if indexed.is_none() {
            Some(vertices.iter().map(Vertex::position))
        } else {
            None
        };
        indexed.into_iter().flatten().chain(plain.into_iter().flatten())
    }

    /// Element positions in draw order, `None` where an index is out of range
    fn elements(&self) -> Vec<Option<Vec3>> {
        let vertices = self.vertices.vertices();
        match &self.indices {
            Some(indices) => indices
                .iter()
                .map(|i| vertices.get(*i as usize).map(Vertex::position))
                .collect(),
            None => vertices.iter().map(|v| Some(v.position())).collect(),
        }
    }

    /// Assembled triangles; empty for point and line layouts
    ///
    /// Triangles touching an out-of-range index are skipped.
    #[must_use]
    pub fn triangles(&self) -> Vec<[Vec3; 3]> {
        let e = self.elements();
        match self.primitive {
            PrimitiveType::Triangles => e.chunks_exact(3).filter_map(|t| complete([t[0], t[1], t[2]])).collect(),
            PrimitiveType::TriangleStrip => e
                .windows(3)
                .enumerate()
                .filter_map(|(i, w)| complete(if i % 2 == 0 { [w[0], w[1], w[2]] } else { [w[1], w[0], w[2]] }))
                .collect(),
            PrimitiveType::TriangleFan => match e.split_first() {
                Some((first, rest)) => rest.windows(2).filter_map(|w| complete([*first, w[0], w[1]])).collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }

    /// Assembled segments; empty for point and triangle layouts
    ///
    /// Segments touching an out-of-range index are skipped.
    #[must_use]
    pub fn segments(&self) -> Vec<[Vec3; 2]> {
        let e = self.elements();
        match self.primitive {
            PrimitiveType::Lines => e.chunks_exact(2).filter_map(|s| complete([s[0], s[1]])).collect(),
            PrimitiveType::LineStrip => e.windows(2).filter_map(|s| complete([s[0], s[1]])).collect(),
            _ => Vec::new(),
        }
    }
}

/// All corners of a primitive, or `None` if any is missing
fn complete<const N: usize>(corners: [Option<Vec3>; N]) -> Option<[Vec3; N]> {
    let mut out = [Vec3::zeros(); N];
    for (slot, corner) in out.iter_mut().zip(corners) {
        *slot = corner?;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad_positions() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ]
    }

    #[test]
    fn bounds_cover_referenced_vertices_only() {
        let mut positions = quad_positions();
        positions.push(Vec3::new(50.0, 50.0, 50.0));
        let buffer = Arc::new(VertexBuffer::from_positions(&positions));
        let g = Geometry::new(PrimitiveType::Triangles, buffer, Some(vec![0, 1, 2, 99]));
        assert_eq!(g.bounds().max, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(g.element_count(), 4);
        assert_eq!(g.triangles().len(), 1);
    }

    #[test]
    fn bad_index_drops_only_its_primitive() {
        let buffer = Arc::new(VertexBuffer::from_positions(&quad_positions()));
        let p = quad_positions();

        let tris = Geometry::new(PrimitiveType::Triangles, Arc::clone(&buffer), Some(vec![0, 1, 2, 99, 3, 1, 1, 3, 2]));
        assert_eq!(tris.triangles(), vec![[p[0], p[1], p[2]], [p[1], p[3], p[2]]]);

        let lines = Geometry::new(PrimitiveType::Lines, buffer, Some(vec![0, 1, 7, 2, 2, 3]));
        assert_eq!(lines.segments(), vec![[p[0], p[1]], [p[2], p[3]]]);
    }

    #[test]
    fn strip_and_fan_assembly() {
        let strip = Geometry::from_positions(PrimitiveType::TriangleStrip, &quad_positions());
        assert_eq!(strip.triangles().len(), 2);
        let fan = Geometry::from_positions(PrimitiveType::TriangleFan, &quad_positions());
        let tris = fan.triangles();
        assert_eq!(tris.len(), 2);
        assert!(tris.iter().all(|t| t[0] == Vec3::zeros()));
        assert!(fan.segments().is_empty());
    }

    #[test]
    fn line_assembly() {
        let lines = Geometry::from_positions(PrimitiveType::Lines, &quad_positions());
        assert_eq!(lines.segments().len(), 2);
        let strip = Geometry::from_positions(PrimitiveType::LineStrip, &quad_positions());
        assert_eq!(strip.segments().len(), 3);
        assert!(strip.triangles().is_empty());
    }

    #[test]
    fn vertex_bytes_match_layout() {
        let buffer = VertexBuffer::from_positions(&quad_positions());
        assert_eq!(buffer.as_bytes().len(), 4 * std::mem::size_of::<Vertex>());
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
    }
}

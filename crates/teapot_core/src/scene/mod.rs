//! Scene module
//!
//! Scene graph nodes, the shared geometry/material payloads they reference,
//! cameras, the [`Scene`] container with its AABB tree, and ray picking.

mod camera;
mod container;
mod geometry;
mod material;
mod node;
mod registry;

pub mod picking;
pub mod primitives;

pub use camera::Camera;
pub use container::Scene;
pub use geometry::{Geometry, PrimitiveType, Vertex, VertexBuffer};
pub use material::{Color, Material, Texture, TextureSlot};
pub use node::{Batch, GroupNode, NodeFlags, NodeId, NodeKind, NodePath, SceneNode, SceneVisitor, ShapeNode};
pub use picking::{pick, PickHit, PickingVisitor};
pub use registry::ResourceRegistry;

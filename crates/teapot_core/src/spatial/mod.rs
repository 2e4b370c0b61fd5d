//! Spatial primitives and partitioning
//!
//! Bounding boxes, planes, rays and view frusta, plus the AABB tree that
//! indexes top-level scene nodes for culling.

mod aabb;
mod aabb_tree;
mod frustum;
mod plane;
mod ray;

pub use aabb::{Aabb, Containment};
pub use aabb_tree::{AabbTree, AabbTreeConfig, TreeNode, TreeNodeId};
pub use frustum::Frustum;
pub use plane::Plane;
pub use ray::Ray;

//! # Teapot Core
//!
//! Visibility, spatial indexing and rendering traversal for an interactive 3D
//! model viewer.
//!
//! ## Features
//!
//! - **Scene graph**: transformable groups with looping animation and shapes
//!   holding per-material geometry batches
//! - **AABB tree**: incremental insert/delete/update with a reverse lookup map
//! - **Culling traversal**: hierarchical frustum culling, translucency sorting
//!   and a planar shadow re-pass against an abstract [`render::RenderDriver`]
//! - **Picking**: screen rays resolved to the nearest hit shape
//! - **Orbit control**: mouse/keyboard driven camera controller
//!
//! ## Quick Start
//!
//! ```rust
//! use teapot_core::prelude::*;
//!
//! let mut scene = Scene::new();
//! scene.insert_node(primitives::cube(Vec3::zeros(), 1.0, Material::white()));
//!
//! let mut viewport = Viewport::new(RecordingDriver::new(640, 480), ViewerConfig::default());
//! viewport.set_scene(scene, None);
//! viewport.draw_scene().unwrap();
//! assert!(viewport.driver().draw_count() > 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod control;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod spatial;
pub mod viewport;

/// Common imports for viewer hosts
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError, ViewerConfig},
        control::{Controller, Key, MouseButtons, ViewFrame},
        foundation::math::{Mat4, Point3, Vec3, Vec4},
        render::{DriverCommand, FrameStats, RecordingDriver, RenderDriver, RenderError, RenderingVisitor},
        scene::{
            primitives, Camera, Color, Geometry, GroupNode, Material, NodeFlags, NodeId,
            NodePath, PickHit, PrimitiveType, Scene, SceneNode, ShapeNode, Vertex,
        },
        spatial::{Aabb, AabbTree, AabbTreeConfig, Containment, Frustum, Plane, Ray},
        viewport::{ViewMode, Viewport},
    };
}

//! Ray picking over the scene graph
//!
//! Picking walks the hierarchy directly rather than the AABB tree: per-node
//! world boxes already reject most of the scene, and the walk has to build
//! the child-index path of the hit anyway.

use std::convert::Infallible;

use crate::foundation::math::{transform_point, Mat4, Vec3};
use crate::spatial::{Aabb, Ray};

use super::{GroupNode, NodeId, NodePath, Scene, SceneNode, SceneVisitor, ShapeNode};

/// Default cone half-angle (as a slope) within which points and lines count as hit
pub const DEFAULT_PICK_TOLERANCE: f32 = 0.005;

/// Nearest hit reported by [`pick`]
#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    /// Node that was hit
    pub path: NodePath,
    /// Ray parameter of the hit
    pub t: f32,
    /// World-space hit point
    pub point: Vec3,
}

/// Find the nearest visible node hit by `ray` at animation tick `tick`
#[must_use]
pub fn pick(scene: &Scene, ray: &Ray, tick: usize) -> Option<PickHit> {
    let mut visitor = PickingVisitor::new(*ray, tick);
    visitor.visit_scene(scene);
    visitor.into_hit()
}

/// Scene visitor collecting the nearest ray hit
#[derive(Debug)]
pub struct PickingVisitor {
    ray: Ray,
    tick: usize,
    tolerance: f32,
    stack: Vec<Mat4>,
    root: Option<NodeId>,
    path: Vec<usize>,
    best: Option<PickHit>,
}

impl PickingVisitor {
    /// Create a visitor for one ray
    #[must_use]
    pub fn new(ray: Ray, tick: usize) -> Self {
        Self {
            ray,
            tick,
            tolerance: DEFAULT_PICK_TOLERANCE,
            stack: vec![Mat4::identity()],
            root: None,
            path: Vec::new(),
            best: None,
        }
    }

    /// Builder: cone slope for point and line hits
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Test every visible top-level node
    pub fn visit_scene(&mut self, scene: &Scene) {
        for (id, node) in scene.nodes() {
            self.root = Some(id);
            self.path.clear();
            self.visit_node(node);
        }
        self.root = None;
    }

    /// Consume the visitor, returning the nearest hit
    #[must_use]
    pub fn into_hit(self) -> Option<PickHit> {
        self.best
    }

    fn top(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or_else(Mat4::identity)
    }

    fn best_t(&self) -> f32 {
        self.best.as_ref().map_or(f32::INFINITY, |hit| hit.t)
    }

    fn visit_node(&mut self, node: &SceneNode) {
        if !node.is_visible() {
            return;
        }
        let bounds = node.bounds();
        if bounds.is_valid() && !self.ray_reaches(&bounds.transformed(&self.top())) {
            return;
        }
        // Infallible
        let _ = node.accept(self);
    }

    /// Box test widened by the point/line tolerance at the box's distance
    fn ray_reaches(&self, world_box: &Aabb) -> bool {
        if world_box.is_empty() {
            return false;
        }
        let reach = (world_box.center() - self.ray.origin).norm() + world_box.extents().norm();
        let slack = Vec3::repeat(self.tolerance * reach);
        let widened = Aabb::new(world_box.min - slack, world_box.max + slack);
        self.ray.intersect_aabb(&widened, 0.0, self.best_t()).is_some()
    }

    fn record(&mut self, t: f32) {
        if t >= self.best_t() {
            return;
        }
        let Some(root) = self.root else {
            return;
        };
        self.best = Some(PickHit {
            path: NodePath { root, indices: self.path.clone() },
            t,
            point: self.ray.at(t),
        });
    }

    fn within_cone(&self, t: f32, distance_sq: f32) -> bool {
        let allowed = self.tolerance * t * self.ray.direction.norm();
        distance_sq <= allowed * allowed
    }
}

impl SceneVisitor for PickingVisitor {
    type Error = Infallible;

    fn visit_group(&mut self, group: &GroupNode) -> Result<(), Self::Error> {
        let world = self.top() * group.transform(self.tick);
        self.stack.push(world);
        for (index, child) in group.children().iter().enumerate() {
            self.path.push(index);
            self.visit_node(child);
            self.path.pop();
        }
        self.stack.pop();
        Ok(())
    }

    fn visit_shape(&mut self, shape: &ShapeNode) -> Result<(), Self::Error> {
        let world = self.top();
        for batch in shape.batches() {
            let geometry = &batch.geometry;
            if !self.ray_reaches(&geometry.bounds().transformed(&world)) {
                continue;
            }
            let to_world = |p: &Vec3| transform_point(&world, p);

            for tri in geometry.triangles() {
                let [a, b, c] = tri.map(|p| to_world(&p));
                if let Some(t) = self.ray.intersect_triangle(&a, &b, &c) {
                    self.record(t);
                }
            }
            for seg in geometry.segments() {
                let (t, d2) = self.ray.closest_to_segment(&to_world(&seg[0]), &to_world(&seg[1]));
                if self.within_cone(t, d2) {
                    self.record(t);
                }
            }
            if geometry.primitive() == super::PrimitiveType::Points {
                for p in geometry.positions() {
                    let (t, d2) = self.ray.closest_to_point(&to_world(&p));
                    if self.within_cone(t, d2) {
                        self.record(t);
                    }
                }
            }
        }
        Ok(())
    }
}

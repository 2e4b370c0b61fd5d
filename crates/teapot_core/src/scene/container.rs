//! Scene container
//!
//! Owns the top-level nodes, the camera list and the AABB tree over the
//! top-level boxes. Every top-level node sits in exactly one tree node's local
//! list; whenever a node's box no longer fits the tree's root box the whole
//! tree is rebuilt. The tree's root box covers hidden nodes too, so they stay
//! indexed while [`Scene::bounds`] only frames what is visible.

use slotmap::SlotMap;

use crate::foundation::math::Vec3;
use crate::spatial::{Aabb, AabbTree, AabbTreeConfig};

use super::{Camera, NodeFlags, NodeId, NodePath, SceneNode};

/// Enlargement applied to the scene box when framing an orbital camera
const ORBIT_MARGIN: f32 = 1.1;

/// Top-level scene: nodes, cameras and spatial index
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, SceneNode>,
    order: Vec<NodeId>,
    cameras: Vec<Camera>,
    tree: Option<AabbTree<NodeId>>,
    tree_config: AabbTreeConfig,
}

impl Scene {
    /// Create an empty scene
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty scene with custom tree settings
    #[must_use]
    pub fn with_config(tree_config: AabbTreeConfig) -> Self {
        Self { tree_config, ..Self::default() }
    }

    /// Add a top-level node and index it
    pub fn insert_node(&mut self, node: impl Into<SceneNode>) -> NodeId {
        let node = node.into();
        let bounds = *node.bounds();
        let id = self.nodes.insert(node);
        self.order.push(id);

        let inserted = self.tree.as_mut().is_some_and(|tree| tree.insert(id, bounds));
        if !inserted {
            self.reorganize();
        }
        id
    }

    /// Remove a top-level node and hand it back
    pub fn delete_node(&mut self, id: NodeId) -> Option<SceneNode> {
        let node = self.nodes.remove(id)?;
        self.order.retain(|n| *n != id);
        if let Some(tree) = self.tree.as_mut() {
            if tree.contains(&id) {
                tree.remove(&id);
            }
        }
        Some(node)
    }

    /// Re-index a node after its bounds changed
    ///
    /// Returns `false` if the handle is unknown.
    pub fn update_node(&mut self, id: NodeId) -> bool {
        let Some(bounds) = self.nodes.get(id).map(|n| *n.bounds()) else {
            return false;
        };
        let moved = self.tree.as_mut().is_some_and(|tree| tree.update(id, bounds));
        if !moved {
            self.reorganize();
        }
        true
    }

    /// Mutate a node and re-index it
    pub fn modify_node<R>(&mut self, id: NodeId, f: impl FnOnce(&mut SceneNode) -> R) -> Option<R> {
        let result = f(self.nodes.get_mut(id)?);
        self.update_node(id);
        Some(result)
    }

    /// Rebuild the tree over every valid top-level box
    pub fn reorganize(&mut self) {
        let bounds = self.index_bounds();
        let items = self.order.iter().map(|id| (*id, *self.nodes[*id].bounds()));
        let tree = AabbTree::build(bounds, items, self.tree_config);
        log::debug!(
            "Reorganized scene: {} nodes, bounds {:?} - {:?}",
            self.order.len(),
            bounds.min,
            bounds.max
        );
        self.tree = Some(tree);
    }

    /// Top-level node
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    /// Top-level nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &SceneNode)> {
        self.order.iter().map(|id| (*id, &self.nodes[*id]))
    }

    /// Top-level handles in insertion order
    #[must_use]
    pub fn node_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Number of top-level nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if the scene has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Spatial index, once built
    #[must_use]
    pub const fn tree(&self) -> Option<&AabbTree<NodeId>> {
        self.tree.as_ref()
    }

    /// Drop all nodes, cameras and the index
    pub fn clear(&mut self) {
        let tree_config = self.tree_config;
        *self = Self::with_config(tree_config);
    }

    /// Union of visible top-level boxes; invalid boxes are skipped
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        self.nodes()
            .filter(|(_, n)| n.is_visible() && n.bounds().is_valid())
            .fold(Aabb::empty(), |acc, (_, n)| acc.union(n.bounds()))
    }

    /// Union of the valid top-level boxes, hidden nodes included
    fn index_bounds(&self) -> Aabb {
        self.nodes
            .values()
            .map(SceneNode::bounds)
            .filter(|b| b.is_valid())
            .fold(Aabb::empty(), |acc, b| acc.union(b))
    }

    /// Center of [`Scene::bounds`], or the origin for an empty scene
    #[must_use]
    pub fn center(&self) -> Vec3 {
        let bounds = self.bounds();
        if bounds.is_empty() {
            Vec3::zeros()
        } else {
            bounds.center()
        }
    }

    /// True if any group in the hierarchy loops through several transforms
    #[must_use]
    pub fn is_animated(&self) -> bool {
        self.nodes().any(|(_, n)| n.is_animated())
    }

    /// Cameras shipped with the scene
    #[must_use]
    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    /// Add a camera and return its index
    pub fn add_camera(&mut self, camera: Camera) -> usize {
        self.cameras.push(camera);
        self.cameras.len() - 1
    }

    /// Default camera looking down `-Z` at the whole scene
    #[must_use]
    pub fn create_orbital_camera(&self) -> Camera {
        let bounds = self.bounds();
        let longest = if bounds.is_valid() { bounds.size().max() } else { 1.0 };
        let half = longest * 0.5 * ORBIT_MARGIN;
        let size = Vec3::repeat(2.0 * half);

        let near = size.norm();
        let far = near * 3.0;
        let position = self.center() + Vec3::new(0.0, 0.0, far * 0.5);

        Camera::new(
            "Orbit",
            size.x,
            size.y,
            near,
            far,
            position,
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::y(),
        )
    }

    /// Node at `path`
    #[must_use]
    pub fn node_at(&self, path: &NodePath) -> Option<&SceneNode> {
        self.nodes.get(path.root)?.descendant(&path.indices)
    }

    /// Toggle flags on the node at `path`; `false` if the path is dangling
    pub fn toggle_flags(&mut self, path: &NodePath, flags: NodeFlags) -> bool {
        let Some(current) = self.flags_at(path) else {
            return false;
        };
        current.toggle(flags);
        true
    }

    /// Set or clear flags on the node at `path`; `false` if the path is dangling
    pub fn set_flags(&mut self, path: &NodePath, flags: NodeFlags, on: bool) -> bool {
        let Some(current) = self.flags_at(path) else {
            return false;
        };
        current.set(flags, on);
        true
    }

    fn flags_at(&mut self, path: &NodePath) -> Option<&mut NodeFlags> {
        self.nodes.get_mut(path.root)?.descendant_flags_mut(&path.indices)
    }

    /// Clear `SELECTED` everywhere
    pub fn clear_selection(&mut self) {
        for node in self.nodes.values_mut() {
            node.for_each_flags_mut(&mut |f| f.remove(NodeFlags::SELECTED));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4;
    use crate::scene::{primitives, GroupNode, Material};
    use approx::assert_relative_eq;

    fn cube_at(x: f32, y: f32, z: f32) -> SceneNode {
        primitives::cube(Vec3::new(x, y, z), 1.0, Material::white())
    }

    #[test]
    fn first_insert_builds_tree() {
        let mut scene = Scene::new();
        assert!(scene.tree().is_none());
        let id = scene.insert_node(cube_at(0.0, 0.0, 0.0));
        let tree = scene.tree().unwrap();
        assert!(tree.contains(&id));
        assert!(tree.is_consistent());
    }

    #[test]
    fn insert_outside_root_reorganizes() {
        let mut scene = Scene::new();
        scene.insert_node(cube_at(0.0, 0.0, 0.0));
        scene.insert_node(cube_at(10.0, 0.0, 0.0));
        let far = scene.insert_node(cube_at(100.0, 0.0, 0.0));
        let tree = scene.tree().unwrap();
        assert!(tree.contains(&far));
        assert!(tree.bounds().contains(&scene.bounds()));
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn delete_and_update() {
        let mut scene = Scene::new();
        let a = scene.insert_node(cube_at(0.0, 0.0, 0.0));
        let b = scene.insert_node(cube_at(5.0, 5.0, 5.0));
        assert!(scene.delete_node(a).is_some());
        assert!(scene.delete_node(a).is_none());
        assert!(!scene.tree().unwrap().contains(&a));
        assert_eq!(scene.len(), 1);

        scene.modify_node(b, |n| {
            *n = GroupNode::with_transform(Mat4::new_translation(&Vec3::new(50.0, 0.0, 0.0)))
                .with_children([cube_at(0.0, 0.0, 0.0)])
                .into();
        });
        let tree = scene.tree().unwrap();
        assert!(tree.bounds().contains(scene.node(b).unwrap().bounds()));
        assert!(tree.is_consistent());
        assert!(!scene.update_node(a));
    }

    #[test]
    fn bounds_skip_hidden_and_degenerate_nodes() {
        let mut scene = Scene::new();
        assert!(scene.bounds().is_empty());
        assert_eq!(scene.center(), Vec3::zeros());

        scene.insert_node(cube_at(0.0, 0.0, 0.0));
        scene.insert_node(cube_at(100.0, 0.0, 0.0).with_flags(NodeFlags::INVISIBLE));
        scene.insert_node(GroupNode::new());
        let b = scene.bounds();
        assert_relative_eq!(b.max.x, 0.5);
        assert_eq!(scene.tree().unwrap().len(), 3);
    }

    #[test]
    fn hidden_nodes_outside_visible_bounds_stay_indexed() {
        let mut scene = Scene::new();
        scene.insert_node(cube_at(0.0, 0.0, 0.0));
        let hidden = scene.insert_node(cube_at(100.0, 0.0, 0.0).with_flags(NodeFlags::INVISIBLE));
        scene.reorganize();

        let tree = scene.tree().unwrap();
        assert!(tree.is_consistent());
        assert!(tree.bounds().contains(scene.node(hidden).unwrap().bounds()));
        assert_relative_eq!(scene.bounds().max.x, 0.5);

        scene.modify_node(hidden, |n| n.flags_mut().remove(NodeFlags::INVISIBLE));
        assert!(scene.tree().unwrap().is_consistent());
        assert_relative_eq!(scene.bounds().max.x, 100.5);
    }

    #[test]
    fn animation_detection_is_recursive() {
        let mut scene = Scene::new();
        scene.insert_node(cube_at(0.0, 0.0, 0.0));
        assert!(!scene.is_animated());
        let inner = GroupNode::with_animation(vec![Mat4::identity(), Mat4::new_scaling(2.0)])
            .with_children([cube_at(0.0, 0.0, 0.0)]);
        scene.insert_node(GroupNode::new().with_children([inner.into()]));
        assert!(scene.is_animated());
    }

    #[test]
    fn orbital_camera_frames_scene() {
        let mut scene = Scene::new();
        scene.insert_node(primitives::cube(Vec3::zeros(), 2.0, Material::white()));
        let cam = scene.create_orbital_camera();
        let d = 1.1_f32;
        assert_relative_eq!(cam.width(), 2.0 * d, epsilon = 1e-5);
        assert_relative_eq!(cam.near(), (2.0 * d) * 3.0_f32.sqrt(), epsilon = 1e-5);
        assert_relative_eq!(cam.far(), cam.near() * 3.0, epsilon = 1e-5);
        assert_relative_eq!(cam.position().z, cam.far() / 2.0, epsilon = 1e-5);
    }

    #[test]
    fn flags_by_path() {
        let mut scene = Scene::new();
        let id = scene.insert_node(GroupNode::new().with_children([cube_at(0.0, 0.0, 0.0)]));
        let path = NodePath { root: id, indices: vec![0] };
        assert!(scene.toggle_flags(&path, NodeFlags::SELECTED));
        assert!(scene.node_at(&path).unwrap().flags().contains(NodeFlags::SELECTED));
        scene.clear_selection();
        assert!(scene.node_at(&path).unwrap().flags().is_empty());
        assert!(!scene.set_flags(&NodePath { root: id, indices: vec![3] }, NodeFlags::HIGHLIGHTED, true));
    }
}

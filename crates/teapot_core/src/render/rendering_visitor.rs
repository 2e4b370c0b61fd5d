//! Culling traversal
//!
//! Walks the AABB tree depth-first, dispatching every surviving top-level
//! node into the scene graph. A tree box fully inside the frustum switches
//! culling off for everything below it. Opaque batches are drawn on the spot;
//! translucent ones are deferred and drawn back to front once the walk ends.

use std::mem;
use std::sync::Arc;

use crate::config::RenderSettings;
use crate::foundation::math::{inverse_or_unchanged, transform_point, Mat4, Vec3};
use crate::scene::{Color, Geometry, GroupNode, Material, NodeFlags, NodeId, Scene, SceneNode, SceneVisitor, ShapeNode};
use crate::spatial::{Aabb, AabbTree, Containment, Frustum, Plane, TreeNodeId};

use super::{DriverResult, FrameStats, RenderDriver, RenderError};

/// Distance of the shadow plane below the scene, relative to the scene size
const GROUND_OFFSET: f32 = 0.001;

/// Shadow projection for a scene occupying `bounds`
///
/// Casts from a point light above and beside the scene onto a horizontal
/// plane just under the box. Returns `None` for scenes without extent.
#[must_use]
pub fn planar_shadow(bounds: &Aabb) -> Option<Mat4> {
    if !bounds.is_valid() {
        return None;
    }
    let reach = bounds.size().max();
    let ground = Plane::from_point_normal(&Vec3::new(0.0, bounds.min.y - reach * GROUND_OFFSET, 0.0), &Vec3::y());
    let light = bounds.center() + Vec3::new(0.5, 2.0, 0.5) * reach;
    Some(ground.shadow_matrix(&light))
}

/// Per-pass switches for the traversal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassOptions {
    /// Lighting for regular draws
    pub lighting: bool,
    /// Wireframe for regular draws
    pub wireframe: bool,
    /// Defer and sort translucent batches; when off they draw in place
    pub translucency: bool,
    /// Depth range shrink per translucent layer
    pub depth_bias_step: f32,
    /// Flat shadow color
    pub shadow_color: Color,
    /// Outline color of selected nodes
    pub selection_color: Color,
}

impl From<&RenderSettings> for PassOptions {
    fn from(settings: &RenderSettings) -> Self {
        Self {
            lighting: settings.lighting,
            wireframe: settings.wireframe,
            translucency: settings.translucency,
            depth_bias_step: settings.depth_bias_step,
            shadow_color: settings.shadow_color,
            selection_color: settings.selection_color,
        }
    }
}

impl Default for PassOptions {
    fn default() -> Self {
        Self::from(&RenderSettings::default())
    }
}

#[derive(Debug)]
struct Deferred {
    material: Arc<Material>,
    geometry: Arc<Geometry>,
    world: Mat4,
    distance: f32,
    outline: bool,
}

/// Frustum-culling scene traversal feeding a [`RenderDriver`]
pub struct RenderingVisitor<'d, D: RenderDriver + ?Sized> {
    driver: &'d mut D,
    options: PassOptions,
    shadow_material: Material,
    selection_material: Material,
    shadow: Option<Mat4>,

    stack: Vec<Mat4>,
    frustum: Frustum,
    eye: Vec3,
    tick: usize,
    cull: bool,
    outline: bool,
    deferred: Vec<Deferred>,
    stats: FrameStats,
}

impl<'d, D: RenderDriver + ?Sized> RenderingVisitor<'d, D> {
    /// Create a visitor drawing through `driver`
    pub fn new(driver: &'d mut D, options: PassOptions) -> Self {
        let mut selection_material = Material::new(options.selection_color);
        selection_material.replaceable = false;

        Self {
            driver,
            options,
            shadow_material: Material::shadow(options.shadow_color),
            selection_material,
            shadow: None,
            stack: vec![Mat4::identity()],
            frustum: Frustum::from_matrix(&Mat4::identity()),
            eye: Vec3::zeros(),
            tick: 0,
            cull: true,
            outline: false,
            deferred: Vec::new(),
            stats: FrameStats::default(),
        }
    }

    /// Prepare a traversal: load the matrices and derive the frustum
    ///
    /// # Arguments
    /// * `view` - World to camera transform
    /// * `projection` - Camera to clip transform
    /// * `tick` - Animation frame counter
    pub fn begin(&mut self, view: &Mat4, projection: &Mat4, tick: usize) {
        self.driver.set_view_matrix(view);
        self.driver.set_projection_matrix(projection);
        self.frustum = Frustum::from_matrix(&(projection * view));
        self.eye = transform_point(&inverse_or_unchanged(view), &Vec3::zeros());
        self.tick = tick;
        self.stack.clear();
        self.stack.push(Mat4::identity());
        self.cull = true;
        self.outline = false;
        self.deferred.clear();
        self.stats = FrameStats::default();
    }

    /// Enable or disable the planar shadow re-pass
    pub fn set_shadow(&mut self, shadow: Option<Mat4>) {
        if let Some(matrix) = &shadow {
            self.driver.set_shadow_matrix(matrix);
        }
        self.shadow = shadow;
    }

    /// Counters of the current traversal
    #[must_use]
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Draw everything in the scene's tree that survives culling
    ///
    /// # Errors
    /// The first driver error aborts the traversal.
    pub fn draw_scene(&mut self, scene: &Scene) -> DriverResult<FrameStats> {
        if let Some(tree) = scene.tree() {
            self.visit_tree_node(scene, tree, tree.root(), true)?;
        }
        self.flush()?;
        log::trace!(
            "Frame: {} draws ({} shadow, {} outline), {} translucent, culled {} tree nodes / {} nodes / {} batches",
            self.stats.draw_calls,
            self.stats.shadow_draws,
            self.stats.outline_draws,
            self.stats.translucent,
            self.stats.culled_tree_nodes,
            self.stats.culled_nodes,
            self.stats.culled_batches
        );
        Ok(self.stats)
    }

    /// Draw free-standing nodes, such as overlays, culled one by one
    ///
    /// # Errors
    /// The first driver error aborts the traversal.
    pub fn draw_nodes<'n>(&mut self, nodes: impl IntoIterator<Item = &'n SceneNode>) -> DriverResult<()> {
        for node in nodes {
            self.cull = true;
            self.visit_node(node)?;
        }
        self.flush()
    }

    fn top(&self) -> Mat4 {
        self.stack.last().copied().unwrap_or_else(Mat4::identity)
    }

    fn visit_tree_node(
        &mut self,
        scene: &Scene,
        tree: &AabbTree<NodeId>,
        id: TreeNodeId,
        cull: bool,
    ) -> DriverResult<()> {
        let Some(node) = tree.node(id) else {
            return Ok(());
        };

        let mut cull = cull;
        if cull {
            match self.frustum.classify(node.bounds()) {
                Containment::Outside => {
                    self.stats.culled_tree_nodes += 1;
                    return Ok(());
                }
                Containment::Inside => cull = false,
                Containment::Intersects => {}
            }
        }

        for child in node.children() {
            self.visit_tree_node(scene, tree, child, cull)?;
        }

        for (key, _) in node.items() {
            let Some(scene_node) = scene.node(*key) else {
                continue;
            };
            self.cull = cull;
            self.visit_node(scene_node)?;
        }
        Ok(())
    }

    fn visit_node(&mut self, node: &SceneNode) -> DriverResult<()> {
        if !node.is_visible() {
            return Ok(());
        }

        let saved = (self.cull, self.outline);
        // Degenerate boxes (points, empty groups) leave culling to the batches
        if self.cull && node.bounds().is_valid() {
            match self.frustum.classify(&node.bounds().transformed(&self.top())) {
                Containment::Outside => {
                    self.stats.culled_nodes += 1;
                    return Ok(());
                }
                Containment::Inside => self.cull = false,
                Containment::Intersects => {}
            }
        }
        self.outline |= node.flags().intersects(NodeFlags::SELECTED | NodeFlags::HIGHLIGHTED);

        let result = node.accept(self);
        (self.cull, self.outline) = saved;
        result
    }

    fn draw_batch(&mut self, material: &Material, geometry: &Geometry, world: &Mat4, outline: bool) -> DriverResult<()> {
        self.driver.set_world_matrix(world);
        self.driver.set_material(material)?;
        self.driver.draw_primitive(geometry)?;
        self.stats.draw_calls += 1;

        if let Some(shadow) = self.shadow {
            self.driver.enable_lighting(false);
            self.driver.enable_shadow(true);
            self.driver.set_world_matrix(&(shadow * world));
            let drawn = self
                .driver
                .set_material(&self.shadow_material)
                .and_then(|()| self.driver.draw_primitive(geometry));
            self.driver.enable_shadow(false);
            self.driver.enable_lighting(self.options.lighting);
            drawn?;
            self.stats.shadow_draws += 1;
        }

        if outline {
            self.driver.enable_wireframe(true);
            self.driver.enable_lighting(false);
            self.driver.set_world_matrix(world);
            let drawn = self
                .driver
                .set_material(&self.selection_material)
                .and_then(|()| self.driver.draw_primitive(geometry));
            self.driver.enable_wireframe(self.options.wireframe);
            self.driver.enable_lighting(self.options.lighting);
            drawn?;
            self.stats.outline_draws += 1;
        }
        Ok(())
    }

    /// Draw deferred translucent batches, farthest first
    fn flush(&mut self) -> DriverResult<()> {
        if self.deferred.is_empty() {
            return Ok(());
        }
        let mut entries = mem::take(&mut self.deferred);
        entries.sort_by(|a, b| b.distance.total_cmp(&a.distance));

        self.driver.enable_blending(true);
        self.driver.enable_depth_write(false);
        let step = self.options.depth_bias_step;

        let mut result = Ok(());
        for (layer, entry) in entries.iter().enumerate() {
            self.driver.set_depth_bias(u32::try_from(layer).unwrap_or(u32::MAX), step);
            result = self.draw_batch(&entry.material, &entry.geometry, &entry.world, entry.outline);
            if result.is_err() {
                break;
            }
        }

        self.driver.set_depth_bias(0, step);
        self.driver.enable_depth_write(true);
        self.driver.enable_blending(false);
        result
    }
}

impl<D: RenderDriver + ?Sized> SceneVisitor for RenderingVisitor<'_, D> {
    type Error = RenderError;

    fn visit_group(&mut self, group: &GroupNode) -> Result<(), Self::Error> {
        let world = self.top() * group.transform(self.tick);
        self.stack.push(world);
        let result = group.children().iter().try_for_each(|child| self.visit_node(child));
        self.stack.pop();
        result
    }

    fn visit_shape(&mut self, shape: &ShapeNode) -> Result<(), Self::Error> {
        let world = self.top();
        for batch in shape.batches() {
            let world_box = batch.geometry.bounds().transformed(&world);
            if self.cull && self.frustum.classify(&world_box) == Containment::Outside {
                self.stats.culled_batches += 1;
                continue;
            }

            if self.options.translucency && batch.material.is_translucent() {
                self.deferred.push(Deferred {
                    material: Arc::clone(&batch.material),
                    geometry: Arc::clone(&batch.geometry),
                    world,
                    distance: (world_box.center() - self.eye).norm(),
                    outline: self.outline,
                });
                self.stats.translucent += 1;
            } else {
                self.draw_batch(&batch.material, &batch.geometry, &world, self.outline)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{frustum, look_at_dir};
    use crate::render::RecordingDriver;
    use crate::scene::{primitives, NodePath, PrimitiveType};
    use approx::assert_relative_eq;

    /// Camera at z = 10 looking down -Z with a 90 degree field of view
    fn camera() -> (Mat4, Mat4) {
        let view = look_at_dir(&Vec3::new(0.0, 0.0, 10.0), &Vec3::new(0.0, 0.0, -1.0), &Vec3::y());
        let projection = frustum(-1.0, 1.0, -1.0, 1.0, 1.0, 100.0);
        (view, projection)
    }

    fn render(scene: &Scene, options: PassOptions, shadow: Option<Mat4>) -> (RecordingDriver, FrameStats) {
        let mut driver = RecordingDriver::new(100, 100);
        driver.begin_frame(None).unwrap();
        let stats = {
            let (view, projection) = camera();
            let mut visitor = RenderingVisitor::new(&mut driver, options);
            visitor.begin(&view, &projection, 0);
            visitor.set_shadow(shadow);
            visitor.draw_scene(scene).unwrap()
        };
        driver.end_frame().unwrap();
        (driver, stats)
    }

    fn translucent(alpha: f32) -> Arc<Material> {
        Material::solid(Color::new(1.0, 1.0, 1.0, alpha))
    }

    #[test]
    fn offscreen_nodes_are_not_drawn() {
        let mut scene = Scene::new();
        scene.insert_node(primitives::cube(Vec3::zeros(), 1.0, Material::white()));
        scene.insert_node(primitives::cube(Vec3::new(500.0, 0.0, 0.0), 1.0, Material::white()));
        scene.insert_node(primitives::cube(Vec3::new(0.0, 0.0, 50.0), 1.0, Material::white()));

        let (driver, stats) = render(&scene, PassOptions::default(), None);
        assert_eq!(driver.draw_count(), 1);
        assert_eq!(stats.draw_calls, 1);
        let draw = driver.draws().next().unwrap();
        assert!(draw.bounds.contains_point(&Vec3::zeros()));
    }

    #[test]
    fn grouped_point_is_drawn_when_the_root_only_intersects() {
        let mut scene = Scene::new();
        scene.insert_node(primitives::cube(Vec3::new(-50.0, 0.0, 0.0), 1.0, Material::white()));
        scene.insert_node(primitives::cube(Vec3::new(50.0, 0.0, 0.0), 1.0, Material::white()));
        let point = ShapeNode::new()
            .with_geometry(Material::red(), Geometry::from_positions(PrimitiveType::Points, &[Vec3::zeros()]));
        let group = scene.insert_node(GroupNode::new().with_children([SceneNode::shape(point)]));
        assert!(!scene.node(group).unwrap().bounds().is_valid());

        let (driver, stats) = render(&scene, PassOptions::default(), None);
        assert_eq!(stats.draw_calls, 1);
        let draw = driver.draws().next().unwrap();
        assert_eq!(draw.primitive, PrimitiveType::Points);
        assert!(draw.bounds.contains_point(&Vec3::zeros()));
    }

    #[test]
    fn hidden_nodes_are_skipped() {
        let mut scene = Scene::new();
        let id = scene.insert_node(primitives::cube(Vec3::zeros(), 1.0, Material::white()));
        scene.set_flags(&NodePath::top(id), NodeFlags::INVISIBLE, true);
        let (driver, _) = render(&scene, PassOptions::default(), None);
        assert_eq!(driver.draw_count(), 0);
    }

    #[test]
    fn translucent_batches_follow_opaque_back_to_front() {
        let mut scene = Scene::new();
        scene.insert_node(primitives::cube(Vec3::new(0.0, 0.0, -5.0), 1.0, translucent(0.5)));
        scene.insert_node(primitives::cube(Vec3::new(1.0, 0.0, 2.0), 1.0, translucent(0.4)));
        scene.insert_node(primitives::cube(Vec3::new(-1.0, 0.0, 0.0), 1.0, Material::white()));
        scene.insert_node(primitives::cube(Vec3::new(0.0, 1.0, -2.0), 1.0, translucent(0.3)));

        let (driver, stats) = render(&scene, PassOptions::default(), None);
        assert_eq!(stats.translucent, 3);
        let draws: Vec<_> = driver.draws().collect();
        assert_eq!(draws.len(), 4);

        assert!(!draws[0].blending);
        assert_relative_eq!(draws[0].diffuse.a, 1.0);

        let eye = Vec3::new(0.0, 0.0, 10.0);
        let distances: Vec<f32> = draws[1..].iter().map(|d| (d.bounds.center() - eye).norm()).collect();
        assert!(distances.windows(2).all(|w| w[0] >= w[1]));
        for (layer, draw) in draws[1..].iter().enumerate() {
            assert!(draw.blending);
            assert!(!draw.depth_write);
            assert_eq!(draw.depth_layer as usize, layer);
        }
    }

    #[test]
    fn translucency_off_draws_in_place() {
        let mut scene = Scene::new();
        scene.insert_node(primitives::cube(Vec3::zeros(), 1.0, translucent(0.5)));
        let options = PassOptions { translucency: false, ..PassOptions::default() };
        let (driver, stats) = render(&scene, options, None);
        assert_eq!(stats.translucent, 0);
        assert!(!driver.draws().next().unwrap().blending);
    }

    #[test]
    fn shadow_pass_redraws_every_primitive() {
        let mut scene = Scene::new();
        scene.insert_node(primitives::cube(Vec3::zeros(), 1.0, Material::white()));
        scene.insert_node(primitives::cube(Vec3::new(2.0, 0.0, 0.0), 1.0, Material::white()));
        let shadow = planar_shadow(&scene.bounds());
        assert!(shadow.is_some());

        let (driver, stats) = render(&scene, PassOptions::default(), shadow);
        assert_eq!(stats.draw_calls, 2);
        assert_eq!(stats.shadow_draws, 2);
        let draws: Vec<_> = driver.draws().collect();
        assert!(draws[1].shadow && !draws[1].lighting);
        assert!(!draws[2].shadow && draws[2].lighting);
        // Flattened just below the scene
        assert!(draws[1].bounds.size().y < 1e-3);
        assert!(draws[1].bounds.max.y <= -0.5);
    }

    #[test]
    fn selected_subtree_gets_outline() {
        let mut scene = Scene::new();
        let id = scene.insert_node(GroupNode::new().with_children([
            primitives::cube(Vec3::zeros(), 1.0, Material::white()),
            primitives::cube(Vec3::new(2.0, 0.0, 0.0), 1.0, Material::white()),
        ]));
        scene.insert_node(primitives::cube(Vec3::new(-2.0, 0.0, 0.0), 1.0, Material::white()));
        scene.set_flags(&NodePath::top(id), NodeFlags::SELECTED, true);

        let (driver, stats) = render(&scene, PassOptions::default(), None);
        assert_eq!(stats.outline_draws, 2);
        assert_eq!(driver.draws().filter(|d| d.wireframe).count(), 2);
    }

    #[test]
    fn driver_errors_abort_traversal() {
        let mut scene = Scene::new();
        scene.insert_node(primitives::cube(Vec3::zeros(), 1.0, Material::white()));
        let mut driver = RecordingDriver::new(100, 100);
        let (view, projection) = camera();
        let mut visitor = RenderingVisitor::new(&mut driver, PassOptions::default());
        visitor.begin(&view, &projection, 0);
        assert_eq!(visitor.draw_scene(&scene), Err(RenderError::FrameNotStarted));
    }

    #[test]
    fn empty_scene_has_no_shadow() {
        assert!(planar_shadow(&Scene::new().bounds()).is_none());
    }
}

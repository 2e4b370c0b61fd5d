//! # Viewport
//!
//! Host-facing glue: owns the driver, the scene, the active camera and the
//! controller, translates window events into controller calls and runs the
//! rendering traversal once per frame.

use bitflags::bitflags;

use crate::config::{RenderSettings, ViewerConfig};
use crate::control::{Controller, Key, MouseButtons, ViewFrame};
use crate::foundation::math::{inverse_or_unchanged, ortho, transform_point, Mat4, Vec2, Vec3};
use crate::render::{planar_shadow, DriverResult, FrameStats, PassOptions, RenderDriver, RenderingVisitor};
use crate::scene::{primitives, Camera, GroupNode, PickHit, Scene, SceneNode};
use crate::spatial::Ray;

/// On-screen length of the axis overlay, in pixels
const AXIS_LENGTH: f32 = 40.0;

/// Offset of the axis overlay from the bottom-left corner, in pixels
const AXIS_OFFSET: f32 = 50.0;

/// Depth range of the overlay projection
const AXIS_DEPTH: f32 = 500.0;

bitflags! {
    /// Display modes of a viewport
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ViewMode: u32 {
        /// Wireframe rasterization
        const WIREFRAME = 0x0001;
        /// Orthographic projection
        const ORTHO = 0x0002;
        /// Lighting
        const LIGHTING = 0x0004;
        /// Planar shadows
        const SHADOW = 0x0008;
        /// Clear to the background color
        const BACKGROUND = 0x0010;
        /// Sorted, blended translucency
        const TRANSLUCENCY = 0x0400;
        /// Axis overlay
        const AXIS = 0x1000;
    }
}

impl ViewMode {
    /// Modes enabled by the render settings
    #[must_use]
    pub fn from_settings(settings: &RenderSettings) -> Self {
        let mut mode = Self::empty();
        mode.set(Self::WIREFRAME, settings.wireframe);
        mode.set(Self::ORTHO, settings.orthographic);
        mode.set(Self::LIGHTING, settings.lighting);
        mode.set(Self::SHADOW, settings.shadows);
        mode.set(Self::BACKGROUND, settings.background);
        mode.set(Self::TRANSLUCENCY, settings.translucency);
        mode.set(Self::AXIS, settings.axis_overlay);
        mode
    }
}

/// Matrices and switches of one frame
struct FramePlan<'a> {
    view: Mat4,
    projection: Mat4,
    tick: usize,
    options: PassOptions,
    shadow: Option<Mat4>,
    overlay: Option<(&'a SceneNode, Mat4, Mat4)>,
}

/// Interactive view onto a scene
pub struct Viewport<D: RenderDriver> {
    driver: D,
    config: ViewerConfig,
    scene: Scene,
    camera: Camera,
    mode: ViewMode,
    controller: Controller,
    axis: SceneNode,
    tick: usize,
    valid: bool,
    last_stats: FrameStats,
}

impl<D: RenderDriver> Viewport<D> {
    /// Create a viewport showing an empty scene
    pub fn new(driver: D, config: ViewerConfig) -> Self {
        let scene = Scene::with_config(config.spatial);
        let camera = scene.create_orbital_camera();
        let mut controller = Controller::new(config.controller);
        controller.reset(&camera, &scene.center());

        let axis = GroupNode::with_transform(Mat4::new_scaling(AXIS_LENGTH))
            .with_children([primitives::axis_gizmo()])
            .into();

        Self {
            driver,
            mode: ViewMode::from_settings(&config.render),
            config,
            scene,
            camera,
            controller,
            axis,
            tick: 0,
            valid: false,
            last_stats: FrameStats::default(),
        }
    }

    /// Show a scene
    ///
    /// Without an explicit camera the scene's first camera is used, or a
    /// generated orbital camera if it has none.
    pub fn set_scene(&mut self, scene: Scene, camera: Option<Camera>) {
        self.camera = camera
            .or_else(|| scene.cameras().first().cloned())
            .unwrap_or_else(|| scene.create_orbital_camera());
        self.scene = scene;
        log::info!(
            "Showing scene with {} nodes through camera '{}'",
            self.scene.len(),
            self.camera.name()
        );
        self.reset_view();
    }

    /// Return the controller to the active camera's view
    pub fn reset_view(&mut self) {
        self.controller.reset(&self.camera, &self.scene.center());
        self.invalidate();
    }

    /// Render one frame
    ///
    /// The frame is always closed, even when a draw fails; the first error is
    /// returned.
    ///
    /// # Errors
    /// Any driver error raised while drawing.
    pub fn draw_scene(&mut self) -> DriverResult<FrameStats> {
        let settings = &self.config.render;
        let clear = self.mode.contains(ViewMode::BACKGROUND).then_some(settings.background_color);

        let options = PassOptions {
            lighting: self.mode.contains(ViewMode::LIGHTING),
            wireframe: self.mode.contains(ViewMode::WIREFRAME),
            translucency: self.mode.contains(ViewMode::TRANSLUCENCY),
            ..PassOptions::from(settings)
        };
        let shadow = if self.mode.contains(ViewMode::SHADOW) {
            planar_shadow(&self.scene.bounds())
        } else {
            None
        };
        let (w, h) = self.display();
        let overlay = self.mode.contains(ViewMode::AXIS).then(|| {
            let view = Mat4::new_translation(&Vec3::new(AXIS_OFFSET, AXIS_OFFSET, AXIS_OFFSET)) * self.controller.orbit();
            let projection = ortho(0.0, w, 0.0, h, -AXIS_DEPTH, AXIS_DEPTH);
            (&self.axis, view, projection)
        });
        let plan = FramePlan {
            view: self.view_matrix(),
            projection: self.projection_matrix(),
            tick: self.tick,
            options,
            shadow,
            overlay,
        };

        self.driver.begin_frame(clear)?;
        self.driver.enable_depth_test(true);
        self.driver.enable_lighting(options.lighting);
        self.driver.enable_wireframe(options.wireframe);

        let drawn = render_passes(&mut self.driver, &self.scene, &plan);
        let ended = self.driver.end_frame();
        let stats = drawn?;
        ended?;

        self.last_stats = stats;
        self.valid = true;
        Ok(stats)
    }

    /// Pointer press; toggles selection on the node under the pointer
    pub fn on_mouse_down(&mut self, buttons: MouseButtons, x: f32, y: f32) -> Option<PickHit> {
        let ray = self.screen_ray(x, y);
        let hit = self
            .controller
            .on_mouse_down(buttons, Vec2::new(x, y), &mut self.scene, &ray, self.tick);
        if hit.is_some() {
            self.invalidate();
        }
        hit
    }

    /// Pointer motion
    pub fn on_mouse_move(&mut self, buttons: MouseButtons, x: f32, y: f32) {
        let frame = self.view_frame();
        self.controller.on_mouse_move(buttons, Vec2::new(x, y), &frame);
        if !buttons.is_empty() {
            self.invalidate();
        }
    }

    /// Pointer release
    pub fn on_mouse_up(&mut self, _buttons: MouseButtons, x: f32, y: f32) {
        self.controller.on_mouse_up(Vec2::new(x, y));
    }

    /// Mouse wheel
    pub fn on_wheel(&mut self, delta: i32) {
        self.controller.on_wheel(delta);
        self.invalidate();
    }

    /// Navigation key
    pub fn on_key(&mut self, key: Key) {
        let center = self.scene.center();
        self.controller.on_key(key, &center);
        self.invalidate();
    }

    /// Advance the animation by one frame
    pub fn animate(&mut self) {
        self.tick = self.tick.wrapping_add(1);
        self.invalidate();
    }

    /// Resize the display
    pub fn resize(&mut self, width: u32, height: u32) {
        self.driver.set_display_size(width, height);
        self.invalidate();
    }

    /// Picking ray through a pixel, origin at the top-left corner
    #[must_use]
    pub fn screen_ray(&self, x: f32, y: f32) -> Ray {
        self.view_frame().ray(Vec2::new(x, y))
    }

    /// Pixel position of a world point; `z` is the depth in `[0, 1]`
    #[must_use]
    pub fn world_to_screen(&self, point: &Vec3) -> Vec3 {
        let (w, h) = self.display();
        let ndc = transform_point(&(self.projection_matrix() * self.view_matrix()), point);
        Vec3::new((ndc.x + 1.0) * 0.5 * w, h - (ndc.y + 1.0) * 0.5 * h, ndc.z)
    }

    /// Current view matrix
    #[must_use]
    pub fn view_matrix(&self) -> Mat4 {
        self.controller.view_matrix(&self.scene.center())
    }

    /// Current projection matrix
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        let (w, h) = self.display();
        self.controller.projection_matrix(
            &self.camera,
            &self.scene.center(),
            Vec2::new(w, h),
            self.mode.contains(ViewMode::ORTHO),
        )
    }

    fn view_frame(&self) -> ViewFrame {
        let (w, h) = self.display();
        ViewFrame {
            center: self.scene.center(),
            display: Vec2::new(w, h),
            inverse_view_projection: inverse_or_unchanged(&(self.projection_matrix() * self.view_matrix())),
        }
    }

    fn display(&self) -> (f32, f32) {
        let (w, h) = self.driver.display_size();
        (w.max(1) as f32, h.max(1) as f32)
    }

    /// Active display modes
    #[must_use]
    pub const fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Switch display modes on or off
    pub fn set_mode(&mut self, mode: ViewMode, on: bool) {
        self.mode.set(mode, on);
        self.invalidate();
    }

    /// True once a frame was drawn since the last change
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.valid
    }

    /// Request a redraw
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Animation frame counter
    #[must_use]
    pub const fn tick(&self) -> usize {
        self.tick
    }

    /// Counters of the last completed frame
    #[must_use]
    pub const fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Render driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Render driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Displayed scene
    #[must_use]
    pub const fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Displayed scene, mutably; the view is invalidated
    pub fn scene_mut(&mut self) -> &mut Scene {
        self.valid = false;
        &mut self.scene
    }

    /// Active camera
    #[must_use]
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Camera controller
    #[must_use]
    pub const fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Viewer configuration
    #[must_use]
    pub const fn config(&self) -> &ViewerConfig {
        &self.config
    }
}

/// Scene pass followed by the optional overlay pass
fn render_passes<D: RenderDriver>(driver: &mut D, scene: &Scene, plan: &FramePlan<'_>) -> DriverResult<FrameStats> {
    let mut visitor = RenderingVisitor::new(driver, plan.options);
    visitor.begin(&plan.view, &plan.projection, plan.tick);
    visitor.set_shadow(plan.shadow);
    let stats = visitor.draw_scene(scene)?;

    if let Some((axis, view, projection)) = &plan.overlay {
        visitor.set_shadow(None);
        visitor.begin(view, projection, plan.tick);
        visitor.draw_nodes([*axis])?;
    }
    Ok(stats)
}

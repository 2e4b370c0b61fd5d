//! Orbit camera controller
//!
//! The controller stores its state relative to the scene center: `orbit`
//! maps world directions into orbit space, `translation` is the eye position
//! in orbit space (re-centered on the scene center) and `secondary` turns the
//! view direction independently of the orbit.

use crate::config::ControllerConfig;
use crate::foundation::math::{frustum, look_at_dir, ortho, rotation_deg, transform_vector, Mat4, Vec2, Vec3};
use crate::scene::{pick, Camera, NodeFlags, PickHit, Scene};
use crate::spatial::{Plane, Ray};

use super::{Key, MouseButtons};

/// What the controller needs to know about the current view for panning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFrame {
    /// Scene center in world space
    pub center: Vec3,
    /// Display size in pixels
    pub display: Vec2,
    /// Inverse of `projection * view`
    pub inverse_view_projection: Mat4,
}

impl ViewFrame {
    /// Picking ray through a pixel
    #[must_use]
    pub fn ray(&self, pos: Vec2) -> Ray {
        Ray::from_screen(pos, self.display, &self.inverse_view_projection)
    }
}

/// Mouse and keyboard driven orbit camera
#[derive(Debug, Clone, PartialEq)]
pub struct Controller {
    config: ControllerConfig,
    zoom: f32,
    orbit: Mat4,
    secondary: Mat4,
    translation: Vec3,
    anchor: Vec2,
    last: Vec2,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(ControllerConfig::default())
    }
}

impl Controller {
    /// Create a controller with identity orientation
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            zoom: 1.0,
            orbit: Mat4::identity(),
            secondary: Mat4::identity(),
            translation: Vec3::zeros(),
            anchor: Vec2::zeros(),
            last: Vec2::zeros(),
        }
    }

    /// Current zoom factor; larger values widen the view
    #[must_use]
    pub const fn zoom_factor(&self) -> f32 {
        self.zoom
    }

    /// Orbit rotation
    #[must_use]
    pub const fn orbit(&self) -> &Mat4 {
        &self.orbit
    }

    /// View direction rotation applied on top of the orbit
    #[must_use]
    pub const fn secondary(&self) -> &Mat4 {
        &self.secondary
    }

    /// Eye position in orbit space
    #[must_use]
    pub const fn translation(&self) -> &Vec3 {
        &self.translation
    }

    /// Pointer position of the last button press
    #[must_use]
    pub const fn anchor(&self) -> Vec2 {
        self.anchor
    }

    /// Return to the camera's own view of a scene centered at `center`
    pub fn reset(&mut self, camera: &Camera, center: &Vec3) {
        self.zoom = 1.0;
        self.orbit = camera.rotation();
        self.secondary = Mat4::identity();
        self.translation = transform_vector(&self.orbit, &(camera.position() - center)) + center;
        log::debug!("Controller reset to camera '{}'", camera.name());
    }

    /// Orbit is a pure rotation
    fn inverse_orbit(&self) -> Mat4 {
        self.orbit.transpose()
    }

    /// Eye position in world space
    #[must_use]
    pub fn eye(&self, center: &Vec3) -> Vec3 {
        transform_vector(&self.inverse_orbit(), &(self.translation - center)) + center
    }

    /// World to camera transform
    #[must_use]
    pub fn view_matrix(&self, center: &Vec3) -> Mat4 {
        let turn = self.inverse_orbit() * self.secondary;
        let forward = transform_vector(&turn, &Vec3::new(0.0, 0.0, -1.0));
        let up = transform_vector(&turn, &Vec3::y());
        look_at_dir(&self.eye(center), &forward, &up)
    }

    /// Camera to clip transform
    ///
    /// The camera's extents are scaled by the zoom factor and then widened in
    /// one dimension to match the display aspect, so nothing is stretched.
    ///
    /// # Arguments
    /// * `camera` - Supplies extents and clip distances
    /// * `center` - Scene center
    /// * `display` - Display size in pixels
    /// * `orthographic` - Parallel instead of perspective projection
    #[must_use]
    pub fn projection_matrix(&self, camera: &Camera, center: &Vec3, display: Vec2, orthographic: bool) -> Mat4 {
        let (near, far) = (camera.near(), camera.far());
        let (mut w, mut h) = (camera.width(), camera.height());

        if orthographic {
            // Parallel extents match the perspective window at the scene center
            let distance = (self.eye(center) - center).norm();
            if near > 0.0 && distance > 0.0 {
                w *= distance / near;
                h *= distance / near;
            }
        }

        w *= self.zoom;
        h *= self.zoom;

        if h > 0.0 && display.y > 0.0 {
            let window_aspect = w / h;
            let display_aspect = display.x / display.y;
            if display_aspect < window_aspect {
                h = w / display_aspect;
            } else {
                w = h * display_aspect;
            }
        }

        let (w, h) = (w * 0.5, h * 0.5);
        if orthographic {
            ortho(-w, w, -h, h, near, far)
        } else {
            frustum(-w, w, -h, h, near, far)
        }
    }

    /// Button press: remember the pointer and toggle selection on the hit node
    ///
    /// # Arguments
    /// * `pos` - Pointer position in pixels
    /// * `scene` - Scene to pick in; the hit node's `SELECTED` flag is toggled
    /// * `ray` - Picking ray through `pos`
    /// * `tick` - Animation frame the scene is shown at
    pub fn on_mouse_down(
        &mut self,
        _buttons: MouseButtons,
        pos: Vec2,
        scene: &mut Scene,
        ray: &Ray,
        tick: usize,
    ) -> Option<PickHit> {
        self.anchor = pos;
        self.last = pos;

        let hit = pick(scene, ray, tick)?;
        scene.toggle_flags(&hit.path, NodeFlags::SELECTED);
        log::debug!("Picked node {:?} at t = {}", hit.path, hit.t);
        Some(hit)
    }

    /// Pointer motion: orbit, turn or pan depending on the held buttons
    pub fn on_mouse_move(&mut self, buttons: MouseButtons, pos: Vec2, frame: &ViewFrame) {
        if buttons == MouseButtons::LEFT {
            self.orbit = self.drag_rotation(pos) * self.orbit;
        } else if buttons == MouseButtons::LEFT | MouseButtons::RIGHT {
            self.secondary = self.drag_rotation(pos) * self.secondary;
        } else if buttons == MouseButtons::RIGHT {
            self.pan(pos, frame);
        }
        self.last = pos;
    }

    /// Button release
    pub fn on_mouse_up(&mut self, pos: Vec2) {
        self.last = pos;
    }

    /// Wheel: negative deltas zoom in, positive ones out
    pub fn on_wheel(&mut self, delta: i32) {
        match delta.signum() {
            -1 => self.zoom(self.config.zoom_in_factor),
            1 => self.zoom(self.config.zoom_out_factor),
            _ => {}
        }
    }

    /// Nudge the eye along the turned view axes
    ///
    /// The step is a fixed fraction of the current eye to center distance.
    pub fn on_key(&mut self, key: Key, center: &Vec3) {
        let step = (self.eye(center) - center).norm() * self.config.key_step_fraction;
        let direction = match key {
            Key::Forward => Vec3::new(0.0, 0.0, -1.0),
            Key::Back => Vec3::new(0.0, 0.0, 1.0),
            Key::Left => Vec3::new(-1.0, 0.0, 0.0),
            Key::Right => Vec3::x(),
            Key::Up => Vec3::y(),
            Key::Down => Vec3::new(0.0, -1.0, 0.0),
        };
        self.translation += transform_vector(&self.secondary, &direction) * step;
    }

    /// Multiply the zoom; non-positive factors are ignored
    pub fn zoom(&mut self, factor: f32) {
        if factor <= 0.0 {
            return;
        }
        self.zoom *= factor;
    }

    /// Rotation for a drag from the last pointer position to `pos`
    ///
    /// Horizontal motion turns about the screen's vertical axis and vertical
    /// motion about its horizontal axis, one degree per `drag_divisor` pixels.
    fn drag_rotation(&self, pos: Vec2) -> Mat4 {
        let delta = pos - self.last;
        let divisor = self.config.drag_divisor;
        let r = Vec3::new(-delta.x / divisor, delta.y / divisor, 0.0).cross(&Vec3::z());
        rotation_deg(&r, r.norm())
    }

    /// Move the eye so the point under the pointer follows it
    fn pan(&mut self, pos: Vec2, frame: &ViewFrame) {
        let normal = transform_vector(&self.inverse_orbit(), &Vec3::new(0.0, 0.0, -1.0));
        let plane = Plane::from_point_normal(&frame.center, &normal);

        let previous = frame.ray(self.last);
        let current = frame.ray(pos);
        let (Some(ta), Some(tb)) = (
            plane.intersect_line(&previous.origin, &previous.direction),
            plane.intersect_line(&current.origin, &current.direction),
        ) else {
            return;
        };

        let delta = previous.at(ta) - current.at(tb);
        self.translation += transform_vector(&self.orbit, &delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::inverse_or_unchanged;
    use crate::scene::{primitives, Material, NodePath};
    use approx::assert_relative_eq;

    fn front_camera() -> Camera {
        Camera::new(
            "front",
            2.0,
            2.0,
            1.0,
            100.0,
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, -1.0),
            Vec3::y(),
        )
    }

    fn controller() -> Controller {
        let mut c = Controller::default();
        c.reset(&front_camera(), &Vec3::zeros());
        c
    }

    fn frame(c: &Controller) -> ViewFrame {
        let center = Vec3::zeros();
        let display = Vec2::new(200.0, 200.0);
        let vp = c.projection_matrix(&front_camera(), &center, display, false) * c.view_matrix(&center);
        ViewFrame {
            center,
            display,
            inverse_view_projection: inverse_or_unchanged(&vp),
        }
    }

    #[test]
    fn reset_reproduces_camera_view() {
        let camera = Camera::new(
            "side",
            2.0,
            1.5,
            1.0,
            50.0,
            Vec3::new(3.0, 4.0, 5.0),
            Vec3::new(-1.0, -0.5, -1.0),
            Vec3::y(),
        );
        let center = Vec3::new(0.5, 1.0, -0.5);
        let mut c = Controller::default();
        c.reset(&camera, &center);
        assert_relative_eq!(c.view_matrix(&center), camera.view_matrix(), epsilon = 1e-5);
        assert_relative_eq!(c.eye(&center), *camera.position(), epsilon = 1e-5);
    }

    #[test]
    fn horizontal_drag_orbits_about_y() {
        let mut c = controller();
        let f = frame(&c);
        c.on_mouse_move(MouseButtons::LEFT, Vec2::new(30.0, 0.0), &f);
        assert_relative_eq!(*c.orbit(), rotation_deg(&Vec3::y(), 10.0), epsilon = 1e-6);
        // Orbiting keeps the distance to the center
        assert_relative_eq!(c.eye(&Vec3::zeros()).norm(), 10.0, epsilon = 1e-4);
        assert_relative_eq!(*c.secondary(), Mat4::identity());
    }

    #[test]
    fn both_buttons_turn_secondary() {
        let mut c = controller();
        let f = frame(&c);
        c.on_mouse_move(MouseButtons::LEFT | MouseButtons::RIGHT, Vec2::new(0.0, 9.0), &f);
        assert_relative_eq!(*c.secondary(), rotation_deg(&Vec3::x(), 3.0), epsilon = 1e-6);
        assert_relative_eq!(*c.orbit(), Mat4::identity());
        assert_relative_eq!(c.eye(&Vec3::zeros()), Vec3::new(0.0, 0.0, 10.0), epsilon = 1e-5);
    }

    #[test]
    fn right_drag_pans_with_the_pointer() {
        let mut c = controller();
        c.on_mouse_up(Vec2::new(100.0, 100.0));
        let f = frame(&c);
        c.on_mouse_move(MouseButtons::RIGHT, Vec2::new(120.0, 100.0), &f);
        let eye = c.eye(&Vec3::zeros());
        // 20 px of a 200 px window spanning 20 units at the center plane
        assert_relative_eq!(eye.x, -2.0, epsilon = 1e-3);
        assert_relative_eq!(eye.y, 0.0, epsilon = 1e-4);
        assert_relative_eq!(eye.z, 10.0, epsilon = 1e-4);
    }

    #[test]
    fn wheel_zoom() {
        let mut c = controller();
        c.on_wheel(-120);
        assert_relative_eq!(c.zoom_factor(), 1.2);
        c.on_wheel(120);
        assert_relative_eq!(c.zoom_factor(), 0.96, epsilon = 1e-6);
        c.on_wheel(0);
        c.zoom(-1.0);
        assert_relative_eq!(c.zoom_factor(), 0.96, epsilon = 1e-6);
    }

    #[test]
    fn keys_step_one_percent() {
        let mut c = controller();
        c.on_key(Key::Forward, &Vec3::zeros());
        assert_relative_eq!(c.eye(&Vec3::zeros()), Vec3::new(0.0, 0.0, 9.9), epsilon = 1e-5);
        c.on_key(Key::Right, &Vec3::zeros());
        assert_relative_eq!(c.eye(&Vec3::zeros()).x, 0.099, epsilon = 1e-5);
    }

    #[test]
    fn projection_matches_display_aspect() {
        let c = controller();
        let p = c.projection_matrix(&front_camera(), &Vec3::zeros(), Vec2::new(200.0, 100.0), false);
        assert_relative_eq!(p, frustum(-2.0, 2.0, -1.0, 1.0, 1.0, 100.0), epsilon = 1e-6);

        let tall = c.projection_matrix(&front_camera(), &Vec3::zeros(), Vec2::new(100.0, 200.0), false);
        assert_relative_eq!(tall, frustum(-1.0, 1.0, -2.0, 2.0, 1.0, 100.0), epsilon = 1e-6);
    }

    #[test]
    fn orthographic_extents_cover_center_plane() {
        let c = controller();
        let p = c.projection_matrix(&front_camera(), &Vec3::zeros(), Vec2::new(100.0, 100.0), true);
        assert_relative_eq!(p, ortho(-10.0, 10.0, -10.0, 10.0, 1.0, 100.0), epsilon = 1e-5);
    }

    #[test]
    fn click_toggles_selection() {
        let mut scene = Scene::new();
        let id = scene.insert_node(primitives::cube(Vec3::zeros(), 1.0, Material::white()));
        let mut c = controller();
        let f = frame(&c);
        let ray = f.ray(Vec2::new(100.0, 100.0));

        let hit = c.on_mouse_down(MouseButtons::LEFT, Vec2::new(100.0, 100.0), &mut scene, &ray, 0);
        assert_eq!(hit.map(|h| h.path), Some(NodePath::top(id)));
        assert!(scene.node(id).unwrap().flags().contains(NodeFlags::SELECTED));

        c.on_mouse_down(MouseButtons::LEFT, Vec2::new(100.0, 100.0), &mut scene, &ray, 0);
        assert!(!scene.node(id).unwrap().flags().contains(NodeFlags::SELECTED));

        let miss = f.ray(Vec2::new(5.0, 5.0));
        assert!(c.on_mouse_down(MouseButtons::LEFT, Vec2::new(5.0, 5.0), &mut scene, &miss, 0).is_none());
        assert_eq!(c.anchor(), Vec2::new(5.0, 5.0));
    }
}

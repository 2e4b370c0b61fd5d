//! In-memory render backend
//!
//! Records every command it receives together with the state each draw ran
//! under, so traversal order and culling can be checked without a GPU.

use crate::foundation::math::Mat4;
use crate::scene::{Color, Geometry, Material, PrimitiveType};
use crate::spatial::Aabb;

use super::{DriverResult, RenderDriver, RenderError};

/// Toggleable pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderState {
    /// Wireframe rasterization
    Wireframe,
    /// Lighting
    Lighting,
    /// Shadow pass state
    Shadow,
    /// Depth testing
    DepthTest,
    /// Back-face culling
    Culling,
    /// Alpha blending
    Blending,
    /// Depth writes
    DepthWrite,
}

/// One draw together with the state it ran under
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// World matrix at draw time
    pub world: Mat4,
    /// Diffuse color of the bound material
    pub diffuse: Color,
    /// Primitive topology
    pub primitive: PrimitiveType,
    /// Geometry bounds moved into world space
    pub bounds: Aabb,
    /// Lighting enabled
    pub lighting: bool,
    /// Wireframe enabled
    pub wireframe: bool,
    /// Shadow state enabled
    pub shadow: bool,
    /// Blending enabled
    pub blending: bool,
    /// Depth writes enabled
    pub depth_write: bool,
    /// Depth bias layer
    pub depth_layer: u32,
}

/// Recorded driver call
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCommand {
    /// Frame started
    BeginFrame(Option<Color>),
    /// Frame finished
    EndFrame,
    /// Projection matrix set
    Projection(Mat4),
    /// View matrix set
    View(Mat4),
    /// World matrix set
    World(Mat4),
    /// Shadow matrix set
    Shadow(Mat4),
    /// Material bound, by diffuse color
    Material(Color),
    /// State toggled
    Toggle(RenderState, bool),
    /// Depth bias changed
    DepthBias(u32, f32),
    /// Geometry drawn
    Draw(DrawRecord),
}

/// Render driver that stores commands instead of executing them
#[derive(Debug, Clone)]
pub struct RecordingDriver {
    width: u32,
    height: u32,
    in_frame: bool,
    frames: usize,
    failure: Option<String>,
    commands: Vec<DriverCommand>,

    world: Mat4,
    diffuse: Color,
    lighting: bool,
    wireframe: bool,
    shadow: bool,
    blending: bool,
    depth_write: bool,
    depth_layer: u32,
}

impl RecordingDriver {
    /// Create a driver for a display of the given size
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            in_frame: false,
            frames: 0,
            failure: None,
            commands: Vec::new(),
            world: Mat4::identity(),
            diffuse: Color::WHITE,
            lighting: true,
            wireframe: false,
            shadow: false,
            blending: false,
            depth_write: true,
            depth_layer: 0,
        }
    }

    /// All commands since creation or the last [`RecordingDriver::clear`]
    #[must_use]
    pub fn commands(&self) -> &[DriverCommand] {
        &self.commands
    }

    /// Draws in submission order
    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> {
        self.commands.iter().filter_map(|c| match c {
            DriverCommand::Draw(record) => Some(record),
            _ => None,
        })
    }

    /// Number of recorded draws
    #[must_use]
    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    /// Number of completed frames
    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    /// Make every following draw fail with `message`, or stop failing
    pub fn set_failure(&mut self, message: Option<String>) {
        self.failure = message;
    }

    /// Forget recorded commands; state is kept
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    fn toggle(&mut self, state: RenderState, on: bool) {
        self.commands.push(DriverCommand::Toggle(state, on));
    }
}

impl RenderDriver for RecordingDriver {
    fn begin_frame(&mut self, clear: Option<Color>) -> DriverResult<()> {
        if self.in_frame {
            return Err(RenderError::Backend("frame already in progress".into()));
        }
        self.in_frame = true;
        self.commands.push(DriverCommand::BeginFrame(clear));
        Ok(())
    }

    fn end_frame(&mut self) -> DriverResult<()> {
        if !self.in_frame {
            return Err(RenderError::FrameNotStarted);
        }
        self.in_frame = false;
        self.frames += 1;
        self.commands.push(DriverCommand::EndFrame);
        Ok(())
    }

    fn set_projection_matrix(&mut self, projection: &Mat4) {
        self.commands.push(DriverCommand::Projection(*projection));
    }

    fn set_view_matrix(&mut self, view: &Mat4) {
        self.commands.push(DriverCommand::View(*view));
    }

    fn set_world_matrix(&mut self, world: &Mat4) {
        self.world = *world;
        self.commands.push(DriverCommand::World(*world));
    }

    fn set_shadow_matrix(&mut self, shadow: &Mat4) {
        self.commands.push(DriverCommand::Shadow(*shadow));
    }

    fn set_material(&mut self, material: &Material) -> DriverResult<()> {
        if !self.in_frame {
            return Err(RenderError::FrameNotStarted);
        }
        self.diffuse = material.diffuse;
        self.commands.push(DriverCommand::Material(material.diffuse));
        Ok(())
    }

    fn draw_primitive(&mut self, geometry: &Geometry) -> DriverResult<()> {
        if !self.in_frame {
            return Err(RenderError::FrameNotStarted);
        }
        if let Some(message) = &self.failure {
            return Err(RenderError::DrawFailed(message.clone()));
        }
        self.commands.push(DriverCommand::Draw(DrawRecord {
            world: self.world,
            diffuse: self.diffuse,
            primitive: geometry.primitive(),
            bounds: geometry.bounds().transformed(&self.world),
            lighting: self.lighting,
            wireframe: self.wireframe,
            shadow: self.shadow,
            blending: self.blending,
            depth_write: self.depth_write,
            depth_layer: self.depth_layer,
        }));
        Ok(())
    }

    fn enable_wireframe(&mut self, on: bool) {
        self.wireframe = on;
        self.toggle(RenderState::Wireframe, on);
    }

    fn enable_lighting(&mut self, on: bool) {
        self.lighting = on;
        self.toggle(RenderState::Lighting, on);
    }

    fn enable_shadow(&mut self, on: bool) {
        self.shadow = on;
        self.toggle(RenderState::Shadow, on);
    }

    fn enable_depth_test(&mut self, on: bool) {
        self.toggle(RenderState::DepthTest, on);
    }

    fn enable_culling(&mut self, on: bool) {
        self.toggle(RenderState::Culling, on);
    }

    fn enable_blending(&mut self, on: bool) {
        self.blending = on;
        self.toggle(RenderState::Blending, on);
    }

    fn enable_depth_write(&mut self, on: bool) {
        self.depth_write = on;
        self.toggle(RenderState::DepthWrite, on);
    }

    fn set_depth_bias(&mut self, layer: u32, step: f32) {
        self.depth_layer = layer;
        self.commands.push(DriverCommand::DepthBias(layer, step));
    }

    fn display_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_display_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;

    fn line() -> Geometry {
        Geometry::from_positions(PrimitiveType::Lines, &[Vec3::zeros(), Vec3::x()])
    }

    #[test]
    fn draw_outside_frame_is_rejected() {
        let mut driver = RecordingDriver::new(10, 10);
        assert_eq!(driver.draw_primitive(&line()), Err(RenderError::FrameNotStarted));
        assert_eq!(driver.end_frame(), Err(RenderError::FrameNotStarted));
        assert_eq!(driver.draw_count(), 0);
    }

    #[test]
    fn draw_captures_state() {
        let mut driver = RecordingDriver::new(10, 10);
        driver.begin_frame(None).unwrap();
        driver.set_world_matrix(&Mat4::new_translation(&Vec3::new(2.0, 0.0, 0.0)));
        driver.set_material(&Material::new(Color::rgb(1.0, 0.0, 0.0))).unwrap();
        driver.enable_lighting(false);
        driver.set_depth_bias(3, 0.001);
        driver.draw_primitive(&line()).unwrap();
        driver.end_frame().unwrap();

        let draw = driver.draws().next().unwrap();
        assert_eq!(draw.primitive, PrimitiveType::Lines);
        assert_eq!(draw.diffuse, Color::rgb(1.0, 0.0, 0.0));
        assert!(!draw.lighting);
        assert_eq!(draw.depth_layer, 3);
        assert!((draw.bounds.min.x - 2.0).abs() < 1e-6);
        assert_eq!(driver.frames(), 1);
    }

    #[test]
    fn injected_failure() {
        let mut driver = RecordingDriver::new(10, 10);
        driver.begin_frame(None).unwrap();
        driver.set_failure(Some("lost device".into()));
        assert!(matches!(driver.draw_primitive(&line()), Err(RenderError::DrawFailed(_))));
        driver.set_failure(None);
        assert!(driver.draw_primitive(&line()).is_ok());
        assert!(driver.begin_frame(None).is_err());
    }
}

//! Backend abstraction for the rendering traversal

use crate::foundation::math::Mat4;
use crate::scene::{Color, Geometry, Material};

use super::DriverResult;

/// Graphics backend driven by the viewer
///
/// State calls are cheap setters; only frame boundaries, material binding and
/// draws may fail. Implementations keep whatever state they were last given
/// until told otherwise.
pub trait RenderDriver {
    /// Start a frame, clearing to `clear` when given
    ///
    /// # Errors
    /// Backend failure, or a frame already in progress.
    fn begin_frame(&mut self, clear: Option<Color>) -> DriverResult<()>;

    /// Finish and present the current frame
    ///
    /// # Errors
    /// [`super::RenderError::FrameNotStarted`] without a matching `begin_frame`.
    fn end_frame(&mut self) -> DriverResult<()>;

    /// Set the projection matrix
    fn set_projection_matrix(&mut self, projection: &Mat4);

    /// Set the view matrix
    fn set_view_matrix(&mut self, view: &Mat4);

    /// Set the world matrix of the next draws
    fn set_world_matrix(&mut self, world: &Mat4);

    /// Set the planar shadow projection for backends that apply it themselves
    fn set_shadow_matrix(&mut self, shadow: &Mat4);

    /// Bind a material
    ///
    /// # Errors
    /// Backend failure while binding textures or constants.
    fn set_material(&mut self, material: &Material) -> DriverResult<()>;

    /// Draw a geometry with the current state
    ///
    /// # Errors
    /// [`super::RenderError::FrameNotStarted`] outside a frame, or a backend
    /// draw failure.
    fn draw_primitive(&mut self, geometry: &Geometry) -> DriverResult<()>;

    /// Toggle wireframe rasterization
    fn enable_wireframe(&mut self, on: bool);

    /// Toggle lighting
    fn enable_lighting(&mut self, on: bool);

    /// Toggle shadow rendering state
    fn enable_shadow(&mut self, on: bool);

    /// Toggle depth testing
    fn enable_depth_test(&mut self, on: bool);

    /// Toggle back-face culling
    fn enable_culling(&mut self, on: bool);

    /// Toggle alpha blending
    fn enable_blending(&mut self, on: bool);

    /// Toggle depth writes
    fn enable_depth_write(&mut self, on: bool);

    /// Pull the depth range towards the viewer by `layer * step`
    ///
    /// Layer `0` restores the full range.
    fn set_depth_bias(&mut self, layer: u32, step: f32);

    /// Display size in pixels
    fn display_size(&self) -> (u32, u32);

    /// Resize the display
    fn set_display_size(&mut self, width: u32, height: u32);
}

//! Headless render driver that reports each frame through the log

use teapot_core::foundation::math::Mat4;
use teapot_core::render::{DriverResult, RenderDriver, RenderError};
use teapot_core::scene::{Color, Geometry, Material};

/// Counts draws per frame and logs a summary line when the frame ends
pub struct ConsoleDriver {
    width: u32,
    height: u32,
    in_frame: bool,
    frame: u64,
    draws: usize,
    primitives: usize,
    translucent_layers: u32,
}

impl ConsoleDriver {
    /// Create a driver for a display of the given size
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            in_frame: false,
            frame: 0,
            draws: 0,
            primitives: 0,
            translucent_layers: 0,
        }
    }

    /// Completed frames
    pub const fn frames(&self) -> u64 {
        self.frame
    }
}

impl RenderDriver for ConsoleDriver {
    fn begin_frame(&mut self, clear: Option<Color>) -> DriverResult<()> {
        if self.in_frame {
            return Err(RenderError::Backend("frame already in progress".into()));
        }
        self.in_frame = true;
        self.draws = 0;
        self.primitives = 0;
        self.translucent_layers = 0;
        if let Some(color) = clear {
            log::trace!("Clear to {:?}", color.to_array());
        }
        Ok(())
    }

    fn end_frame(&mut self) -> DriverResult<()> {
        if !self.in_frame {
            return Err(RenderError::FrameNotStarted);
        }
        self.in_frame = false;
        self.frame += 1;
        log::info!(
            "Frame {}: {} draws, {} elements, {} translucent layers",
            self.frame,
            self.draws,
            self.primitives,
            self.translucent_layers
        );
        Ok(())
    }

    fn set_projection_matrix(&mut self, _projection: &Mat4) {}

    fn set_view_matrix(&mut self, view: &Mat4) {
        log::trace!("View {view:?}");
    }

    fn set_world_matrix(&mut self, _world: &Mat4) {}

    fn set_shadow_matrix(&mut self, _shadow: &Mat4) {}

    fn set_material(&mut self, _material: &Material) -> DriverResult<()> {
        if self.in_frame {
            Ok(())
        } else {
            Err(RenderError::FrameNotStarted)
        }
    }

    fn draw_primitive(&mut self, geometry: &Geometry) -> DriverResult<()> {
        if !self.in_frame {
            return Err(RenderError::FrameNotStarted);
        }
        self.draws += 1;
        self.primitives += geometry.element_count();
        Ok(())
    }

    fn enable_wireframe(&mut self, _on: bool) {}

    fn enable_lighting(&mut self, _on: bool) {}

    fn enable_shadow(&mut self, _on: bool) {}

    fn enable_depth_test(&mut self, _on: bool) {}

    fn enable_culling(&mut self, _on: bool) {}

    fn enable_blending(&mut self, _on: bool) {}

    fn enable_depth_write(&mut self, _on: bool) {}

    fn set_depth_bias(&mut self, layer: u32, _step: f32) {
        self.translucent_layers = self.translucent_layers.max(layer.saturating_add(1));
    }

    fn display_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn set_display_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }
}

//! # Rendering Traversal
//!
//! The viewer never talks to a graphics API directly. Everything drawable goes
//! through the [`RenderDriver`] trait, fed by the [`RenderingVisitor`] which
//! walks the scene's AABB tree, culls against the view frustum, sorts
//! translucent batches and issues the planar shadow re-pass.
//!
//! [`RecordingDriver`] is an in-memory backend that records every command. It
//! backs the tests and headless hosts.

mod driver;
mod recording;
mod rendering_visitor;

pub use driver::RenderDriver;
pub use recording::{DrawRecord, DriverCommand, RecordingDriver, RenderState};
pub use rendering_visitor::{planar_shadow, PassOptions, RenderingVisitor};

use thiserror::Error;

/// Rendering error types
///
/// Backends map their own failures onto these so the traversal can stay
/// backend-agnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// A draw or state call arrived outside `begin_frame`/`end_frame`
    #[error("No frame in progress")]
    FrameNotStarted,

    /// A single draw call was rejected
    #[error("Draw failed: {0}")]
    DrawFailed(String),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, RenderError>;

/// Counters collected over one traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Primary draw calls, opaque and translucent
    pub draw_calls: usize,
    /// Shadow re-draws
    pub shadow_draws: usize,
    /// Selection outline re-draws
    pub outline_draws: usize,
    /// Tree nodes rejected with their whole subtree
    pub culled_tree_nodes: usize,
    /// Scene nodes rejected by their world box
    pub culled_nodes: usize,
    /// Batches rejected by their world box
    pub culled_batches: usize,
    /// Batches deferred to the translucent pass
    pub translucent: usize,
}

impl FrameStats {
    /// Every call sent to the driver's draw entry point
    #[must_use]
    pub const fn total_draws(&self) -> usize {
        self.draw_calls + self.shadow_draws + self.outline_draws
    }
}

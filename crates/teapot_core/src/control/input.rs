//! Input event types

use bitflags::bitflags;

bitflags! {
    /// Mouse buttons held during an event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MouseButtons: u32 {
        /// Left button
        const LEFT = 0x0001;
        /// Right button
        const RIGHT = 0x0002;
        /// Middle button
        const MIDDLE = 0x0010;
    }
}

/// Navigation keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Move along the view direction
    Forward,
    /// Move against the view direction
    Back,
    /// Strafe left
    Left,
    /// Strafe right
    Right,
    /// Move up
    Up,
    /// Move down
    Down,
}

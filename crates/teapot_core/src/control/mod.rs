//! Camera control
//!
//! Turns pointer and keyboard events into the orbit camera's view and
//! projection matrices, and toggles selection on clicked nodes.

mod controller;
mod input;

pub use controller::{Controller, ViewFrame};
pub use input::{Key, MouseButtons};

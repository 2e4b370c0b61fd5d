//! Foundation module - Core utilities and types
//!
//! - Math types, projection builders and matrix inversion
//! - Logging setup

pub mod logging;
pub mod math;
